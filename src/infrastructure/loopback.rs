use crate::core::channel::Channel;
use std::collections::VecDeque;
use std::io;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Default)]
struct Buffer {
    data: VecDeque<u8>,
    cancelled: bool,
    closed: bool,
}

/// In-memory channel (`loop://`): everything written is read back.
///
/// `cancel_read` wakes a parked reader, or makes the next read return
/// immediately if nobody is waiting yet.
#[derive(Debug)]
pub struct LoopbackChannel {
    buffer: Mutex<Buffer>,
    readable: Condvar,
    read_timeout: Option<Duration>,
}

impl LoopbackChannel {
    pub fn new() -> Self {
        Self {
            buffer: Mutex::new(Buffer::default()),
            readable: Condvar::new(),
            read_timeout: None,
        }
    }

    /// Reads give up and return empty after `timeout`
    pub fn with_read_timeout(timeout: Duration) -> Self {
        Self {
            read_timeout: Some(timeout),
            ..Self::new()
        }
    }

    fn buffer(&self) -> MutexGuard<'_, Buffer> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for LoopbackChannel {
    fn default() -> Self {
        Self::new()
    }
}

fn closed_error() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "loopback channel is closed")
}

impl Channel for LoopbackChannel {
    fn name(&self) -> &str {
        "loop://"
    }

    fn read(&self, max_bytes: usize) -> io::Result<Vec<u8>> {
        let deadline = self.read_timeout.map(|timeout| Instant::now() + timeout);
        let mut buffer = self.buffer();
        loop {
            if buffer.closed {
                return Err(closed_error());
            }
            if buffer.cancelled {
                buffer.cancelled = false;
                return Ok(Vec::new());
            }
            if !buffer.data.is_empty() {
                let n = max_bytes.max(1).min(buffer.data.len());
                return Ok(buffer.data.drain(..n).collect());
            }

            buffer = match deadline {
                None => self
                    .readable
                    .wait(buffer)
                    .unwrap_or_else(PoisonError::into_inner),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(Vec::new());
                    }
                    self.readable
                        .wait_timeout(buffer, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };
        }
    }

    fn write(&self, data: &[u8]) -> io::Result<()> {
        let mut buffer = self.buffer();
        if buffer.closed {
            return Err(closed_error());
        }
        buffer.data.extend(data);
        self.readable.notify_all();
        Ok(())
    }

    fn bytes_available(&self) -> Option<usize> {
        Some(self.buffer().data.len())
    }

    fn supports_cancel_read(&self) -> bool {
        true
    }

    fn cancel_read(&self) {
        self.buffer().cancelled = true;
        self.readable.notify_all();
    }

    fn close(&self) -> io::Result<()> {
        let mut buffer = self.buffer();
        buffer.closed = true;
        debug!("Loopback closed with {} unread bytes", buffer.data.len());
        buffer.data.clear();
        self.readable.notify_all();
        Ok(())
    }
}
