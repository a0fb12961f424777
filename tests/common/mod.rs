//! Test doubles shared by the integration tests
#![allow(dead_code)]

use linkterm::{Channel, Console, Keystroke, LinkTermResult};
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

/// How long tests wait for asynchronous effects before failing
pub const WAIT: Duration = Duration::from_secs(5);

#[derive(Default)]
struct ConsoleState {
    keys: VecDeque<Keystroke>,
    output: Vec<u8>,
    cancelled: bool,
    setups: usize,
    cleanups: usize,
}

/// Console fed from a key script. `getkey` blocks while the script is empty
/// until more keys are pushed or `cancel` is called.
#[derive(Default)]
pub struct ScriptedConsole {
    state: Mutex<ConsoleState>,
    changed: Condvar,
}

impl ScriptedConsole {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, key: Keystroke) {
        self.state.lock().unwrap().keys.push_back(key);
        self.changed.notify_all();
    }

    pub fn push_keys(&self, keys: &[&str]) {
        for key in keys {
            self.push(Keystroke::Text(key.to_string()));
        }
    }

    pub fn output_bytes(&self) -> Vec<u8> {
        self.state.lock().unwrap().output.clone()
    }

    pub fn output(&self) -> String {
        String::from_utf8_lossy(&self.output_bytes()).into_owned()
    }

    /// Wait until the console output contains `expected`
    pub fn wait_for_output(&self, expected: &str) -> bool {
        let deadline = Instant::now() + WAIT;
        let mut state = self.state.lock().unwrap();
        loop {
            if String::from_utf8_lossy(&state.output).contains(expected) {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            state = self.changed.wait_timeout(state, deadline - now).unwrap().0;
        }
    }

    pub fn setups(&self) -> usize {
        self.state.lock().unwrap().setups
    }

    pub fn cleanups(&self) -> usize {
        self.state.lock().unwrap().cleanups
    }
}

impl Console for ScriptedConsole {
    fn setup(&self) -> LinkTermResult<()> {
        self.state.lock().unwrap().setups += 1;
        Ok(())
    }

    fn cleanup(&self) -> LinkTermResult<()> {
        self.state.lock().unwrap().cleanups += 1;
        Ok(())
    }

    fn getkey(&self) -> LinkTermResult<Keystroke> {
        let mut state = self.state.lock().unwrap();
        loop {
            if let Some(key) = state.keys.pop_front() {
                return Ok(key);
            }
            if state.cancelled {
                state.cancelled = false;
                return Ok(Keystroke::Cancelled);
            }
            state = self.changed.wait(state).unwrap();
        }
    }

    fn write_bytes(&self, data: &[u8]) -> LinkTermResult<()> {
        self.state.lock().unwrap().output.extend_from_slice(data);
        self.changed.notify_all();
        Ok(())
    }

    fn cancel(&self) {
        self.state.lock().unwrap().cancelled = true;
        self.changed.notify_all();
    }
}

#[derive(Default)]
struct ChannelState {
    incoming: VecDeque<u8>,
    written: Vec<u8>,
    cancelled: bool,
    closed: bool,
    writes_after_close: usize,
    read_error: Option<io::ErrorKind>,
    write_error: Option<io::ErrorKind>,
}

/// Channel that records writes and serves reads from a feed buffer
pub struct RecordingChannel {
    state: Mutex<ChannelState>,
    changed: Condvar,
    cancellable: bool,
    read_timeout: Option<Duration>,
}

impl RecordingChannel {
    /// Reads block until data arrives or `cancel_read` is called
    pub fn cancellable() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(ChannelState::default()),
            changed: Condvar::new(),
            cancellable: true,
            read_timeout: None,
        })
    }

    /// No cancel support; reads return empty after `timeout`
    pub fn timeout_only(timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(ChannelState::default()),
            changed: Condvar::new(),
            cancellable: false,
            read_timeout: Some(timeout),
        })
    }

    /// Make bytes available to the reader
    pub fn feed(&self, data: &[u8]) {
        self.state.lock().unwrap().incoming.extend(data);
        self.changed.notify_all();
    }

    pub fn written(&self) -> Vec<u8> {
        self.state.lock().unwrap().written.clone()
    }

    /// Wait until at least `len` bytes were written
    pub fn wait_for_written(&self, len: usize) -> bool {
        let deadline = Instant::now() + WAIT;
        let mut state = self.state.lock().unwrap();
        loop {
            if state.written.len() >= len {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            state = self.changed.wait_timeout(state, deadline - now).unwrap().0;
        }
    }

    pub fn fail_reads(&self, kind: io::ErrorKind) {
        self.state.lock().unwrap().read_error = Some(kind);
        self.changed.notify_all();
    }

    pub fn fail_writes(&self, kind: io::ErrorKind) {
        self.state.lock().unwrap().write_error = Some(kind);
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }

    pub fn writes_after_close(&self) -> usize {
        self.state.lock().unwrap().writes_after_close
    }
}

impl Channel for RecordingChannel {
    fn name(&self) -> &str {
        "recording"
    }

    fn read(&self, max_bytes: usize) -> io::Result<Vec<u8>> {
        let deadline = self.read_timeout.map(|timeout| Instant::now() + timeout);
        let mut state = self.state.lock().unwrap();
        loop {
            if let Some(kind) = state.read_error {
                return Err(io::Error::new(kind, "injected read failure"));
            }
            if !state.incoming.is_empty() {
                let n = max_bytes.min(state.incoming.len());
                return Ok(state.incoming.drain(..n).collect());
            }
            if state.cancelled {
                state.cancelled = false;
                return Ok(Vec::new());
            }
            state = match deadline {
                None => self.changed.wait(state).unwrap(),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(Vec::new());
                    }
                    self.changed.wait_timeout(state, deadline - now).unwrap().0
                }
            };
        }
    }

    fn write(&self, data: &[u8]) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.closed {
            state.writes_after_close += 1;
            return Err(io::Error::new(io::ErrorKind::NotConnected, "closed"));
        }
        if let Some(kind) = state.write_error {
            return Err(io::Error::new(kind, "injected write failure"));
        }
        state.written.extend_from_slice(data);
        self.changed.notify_all();
        Ok(())
    }

    fn bytes_available(&self) -> Option<usize> {
        Some(self.state.lock().unwrap().incoming.len())
    }

    fn supports_cancel_read(&self) -> bool {
        self.cancellable
    }

    fn cancel_read(&self) {
        if self.cancellable {
            self.state.lock().unwrap().cancelled = true;
            self.changed.notify_all();
        }
    }

    fn close(&self) -> io::Result<()> {
        self.state.lock().unwrap().closed = true;
        self.changed.notify_all();
        Ok(())
    }
}
