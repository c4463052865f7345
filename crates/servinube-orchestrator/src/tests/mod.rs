//! Test suites for the orchestration engine.

pub(crate) mod support;
