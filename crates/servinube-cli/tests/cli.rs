//! End-to-end tests for the `servinube` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use rstest::rstest;

fn servinube() -> Command {
    let mut command = Command::cargo_bin("servinube").expect("binary should build");
    command.env("SERVINUBE_LOG_FILTER", "off");
    command
}

#[rstest]
fn help_lists_every_subcommand() {
    servinube()
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("up")
                .and(predicate::str::contains("panel"))
                .and(predicate::str::contains("status")),
        );
}

#[rstest]
fn bare_invocation_is_a_usage_error() {
    servinube()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[rstest]
fn zero_readiness_interval_is_rejected() {
    servinube()
        .args(["--readiness-interval-ms", "0", "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "readiness_interval_ms must be greater than zero",
        ));
}

#[cfg(unix)]
#[rstest]
fn status_reports_an_unreachable_runtime() {
    servinube()
        .args(["--container-cli", "false", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("runtime unreachable via false"));
}

#[cfg(unix)]
#[rstest]
fn panel_starts_and_stops_every_service() {
    let workdir = tempfile::tempdir().expect("temporary directory");
    let path = workdir.path().to_str().expect("utf-8 temporary path");

    servinube()
        .args([
            "--container-cli",
            "true",
            "--package-manager",
            "true",
            "--frontend-project-path",
            path,
            "--backend-project-path",
            path,
            "panel",
        ])
        .write_stdin("help\nbogus\nstart all\nquit\n")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("commands:")
                .and(predicate::str::contains("unknown command 'bogus'"))
                .and(predicate::str::contains("[container] running"))
                .and(predicate::str::contains("[frontend] running"))
                .and(predicate::str::contains("[backend] running"))
                .and(predicate::str::contains("[backend] stopping"))
                .and(predicate::str::contains("container stopped")),
        );
}

#[cfg(unix)]
fn process_alive(pid: &str) -> bool {
    std::process::Command::new("kill")
        .args(["-0", pid])
        .stderr(std::process::Stdio::null())
        .status()
        .is_ok_and(|status| status.success())
}

#[cfg(unix)]
fn poll(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(10);
    while std::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(std::time::Duration::from_millis(20));
    }
    false
}

#[cfg(unix)]
#[rstest]
fn terminated_panel_stops_the_servers_it_started() {
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;
    use std::process::Stdio;

    let workdir = tempfile::tempdir().expect("temporary directory");
    let path = workdir.path().to_str().expect("utf-8 temporary path");
    let pid_file = workdir.path().join("server.pid");
    let script = workdir.path().join("fake-pm.sh");
    std::fs::write(
        &script,
        "#!/bin/sh\necho $$ > server.pid\nexec sleep 30 >/dev/null 2>&1\n",
    )
    .expect("write package manager script");
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755))
        .expect("make script executable");

    let mut panel = std::process::Command::new(assert_cmd::cargo::cargo_bin("servinube"))
        .env("SERVINUBE_LOG_FILTER", "off")
        .args([
            "--container-cli",
            "true",
            "--package-manager",
            script.to_str().expect("utf-8 script path"),
            "--frontend-project-path",
            path,
            "--backend-project-path",
            path,
            "panel",
        ])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("spawn panel");
    let mut stdin = panel.stdin.take().expect("panel stdin");
    stdin
        .write_all(b"start backend\n")
        .expect("send start request");

    assert!(poll(|| {
        std::fs::read_to_string(&pid_file).is_ok_and(|text| !text.trim().is_empty())
    }));
    let recorded = std::fs::read_to_string(&pid_file).expect("server pid");
    let server_pid = recorded.trim();
    assert!(process_alive(server_pid));

    let status = std::process::Command::new("kill")
        .args(["-TERM", &panel.id().to_string()])
        .status()
        .expect("run kill");
    assert!(status.success());

    let output = panel.wait_with_output().expect("panel exits");
    drop(stdin);
    let printed = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "got {printed}");
    assert!(printed.contains("[backend] stopping"), "got {printed}");
    assert!(printed.contains("backend   stopped"), "got {printed}");
    assert!(poll(|| !process_alive(server_pid)), "server {server_pid} outlived the panel");
}
