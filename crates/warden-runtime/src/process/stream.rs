//! Async stream log readers (non-UTF8-safe).
//!
//! llama-server (and other C/C++ tooling) can emit non-UTF8 bytes on stdout/stderr.
//! `BufReader::lines()` would end the reader task on invalid UTF-8, so lines
//! are read as bytes and decoded lossily.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;
use tracing::debug;
use warden_core::ports::OutputStream;

use super::logs::ServerLogBuffer;

/// Spawn a task copying `stream` into `sink` line by line until EOF.
pub fn spawn_stream_reader(
    stream: impl AsyncRead + Unpin + Send + 'static,
    process_id: u64,
    kind: OutputStream,
    sink: Arc<ServerLogBuffer>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut buf: Vec<u8> = Vec::with_capacity(1024);

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break, // EOF
                Ok(_) => {
                    if buf.last() == Some(&b'\n') {
                        buf.pop();
                        if buf.last() == Some(&b'\r') {
                            buf.pop();
                        }
                    }

                    let line = String::from_utf8_lossy(&buf).into_owned();
                    debug!(process_id, stream = ?kind, "{line}");
                    sink.push(kind, line);
                }
                Err(e) => {
                    debug!(process_id, stream = ?kind, error = %e, "log stream reader exiting due to read error");
                    break;
                }
            }
        }

        debug!(process_id, stream = ?kind, "log stream reader task exiting");
    })
}
