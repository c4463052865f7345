use std::fmt;
use std::io::{BufRead, BufReader, Read};

use tracing::warn;

use super::PROCESS_TARGET;

/// Lazily reads newline-terminated lines from a child's output.
///
/// The stream ends at end-of-file or at the first read error. Bytes that are
/// not valid UTF-8 are replaced rather than ending the stream. Trailing `\n`
/// and `\r\n` are stripped.
pub struct LineStream {
    reader: Box<dyn BufRead + Send>,
    finished: bool,
}

impl LineStream {
    /// Wraps an unbuffered reader.
    pub fn new<R>(reader: R) -> Self
    where
        R: Read + Send + 'static,
    {
        Self::from_buf_read(BufReader::new(reader))
    }

    /// Wraps an already buffered reader.
    pub fn from_buf_read<R>(reader: R) -> Self
    where
        R: BufRead + Send + 'static,
    {
        Self {
            reader: Box::new(reader),
            finished: false,
        }
    }
}

impl fmt::Debug for LineStream {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("LineStream")
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl Iterator for LineStream {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let mut buffer = Vec::new();
        match self.reader.read_until(b'\n', &mut buffer) {
            Ok(0) => {
                self.finished = true;
                None
            }
            Ok(_) => {
                if buffer.last() == Some(&b'\n') {
                    buffer.pop();
                }
                if buffer.last() == Some(&b'\r') {
                    buffer.pop();
                }
                Some(String::from_utf8_lossy(&buffer).into_owned())
            }
            Err(error) => {
                warn!(
                    target: PROCESS_TARGET,
                    error = %error,
                    "output stream read failed; closing line reader"
                );
                self.finished = true;
                None
            }
        }
    }
}
