use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    /// Created, loops not launched yet
    NotStarted = 0,
    /// Reader and writer loops running
    Running = 1,
    /// Stop requested, loops winding down
    Stopping = 2,
    /// Both loops joined
    Stopped = 3,
}

impl SessionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => SessionState::NotStarted,
            1 => SessionState::Running,
            2 => SessionState::Stopping,
            _ => SessionState::Stopped,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::NotStarted => write!(f, "NotStarted"),
            SessionState::Running => write!(f, "Running"),
            SessionState::Stopping => write!(f, "Stopping"),
            SessionState::Stopped => write!(f, "Stopped"),
        }
    }
}

/// Atomically updated session state
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(SessionState::NotStarted as u8))
    }

    pub(crate) fn get(&self) -> SessionState {
        SessionState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Move `from` -> `to`; returns false if the state was something else
    pub(crate) fn transition(&self, from: SessionState, to: SessionState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn set(&self, state: SessionState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

/// Byte counters for one session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStatistics {
    /// Total bytes received from the channel
    pub bytes_received: u64,
    /// Total bytes written to the channel
    pub bytes_sent: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    received: AtomicU64,
    sent: AtomicU64,
}

impl Counters {
    pub(crate) fn add_received(&self, n: usize) {
        self.received.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub(crate) fn add_sent(&self, n: usize) {
        self.sent.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> SessionStatistics {
        SessionStatistics {
            bytes_received: self.received.load(Ordering::Relaxed),
            bytes_sent: self.sent.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_transitions() {
        let state = StateCell::new();
        assert_eq!(state.get(), SessionState::NotStarted);

        assert!(state.transition(SessionState::NotStarted, SessionState::Running));
        assert!(!state.transition(SessionState::NotStarted, SessionState::Running));
        assert_eq!(state.get(), SessionState::Running);

        state.set(SessionState::Stopped);
        assert_eq!(state.get(), SessionState::Stopped);
        assert_eq!(state.get().to_string(), "Stopped");
    }

    #[test]
    fn test_counters() {
        let counters = Counters::default();
        counters.add_received(10);
        counters.add_sent(3);
        counters.add_received(2);
        assert_eq!(
            counters.snapshot(),
            SessionStatistics {
                bytes_received: 12,
                bytes_sent: 3
            }
        );
    }
}
