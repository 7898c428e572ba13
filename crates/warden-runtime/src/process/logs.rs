//! Bounded capture of server output.
//!
//! A noisy server running for days must not grow memory without limit, so
//! output is kept in a fixed-size ring buffer. Subscribers get live lines
//! through a broadcast channel.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::broadcast;
use warden_core::ports::{OutputStream, ServerLogLine};

/// Capacity of the live log broadcast channel.
const BROADCAST_CAPACITY: usize = 1000;

/// Ring buffer plus live feed of server output lines.
#[derive(Debug)]
pub struct ServerLogBuffer {
    capacity: usize,
    lines: Mutex<VecDeque<ServerLogLine>>,
    broadcast_tx: broadcast::Sender<ServerLogLine>,
}

impl ServerLogBuffer {
    /// Create a buffer retaining at most `capacity` lines.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (broadcast_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            capacity,
            lines: Mutex::new(VecDeque::with_capacity(capacity.min(4096))),
            broadcast_tx,
        }
    }

    /// Append a line, evicting the oldest when full.
    pub fn push(&self, stream: OutputStream, line: String) {
        let entry = ServerLogLine {
            timestamp: now_ms(),
            stream,
            line,
        };

        {
            let mut lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
            if lines.len() >= self.capacity {
                lines.pop_front();
            }
            lines.push_back(entry.clone());
        }

        // No receivers is fine
        let _ = self.broadcast_tx.send(entry);
    }

    /// All retained lines, oldest first.
    pub fn snapshot(&self) -> Vec<ServerLogLine> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Drop retained lines, e.g. when a new process starts.
    pub fn clear(&self) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Live feed of new lines.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerLogLine> {
        self.broadcast_tx.subscribe()
    }
}

#[allow(clippy::cast_possible_truncation)]
fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as u64)
}
