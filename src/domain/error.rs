use std::fmt;
use thiserror::Error;

/// Channel operation that was in flight when a transport fault occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOp {
    Read,
    Write,
}

impl fmt::Display for ChannelOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelOp::Read => write!(f, "read"),
            ChannelOp::Write => write!(f, "write"),
        }
    }
}

/// LinkTerm unified error type
#[derive(Error, Debug)]
pub enum LinkTermError {
    #[error("Transport fault during {op}: {source}")]
    Transport {
        op: ChannelOp,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not open '{target}': {message}")]
    Open { target: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Console error: {message}")]
    Console { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Unknown encoding: {0}")]
    UnknownEncoding(String),

    #[error("Session error: {message}")]
    Session { message: String },
}

impl LinkTermError {
    pub(crate) fn transport(op: ChannelOp, source: std::io::Error) -> Self {
        Self::Transport { op, source }
    }

    pub(crate) fn session(message: impl Into<String>) -> Self {
        Self::Session {
            message: message.into(),
        }
    }

    /// True for faults that end the session (transport and open faults)
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Open { .. })
    }
}

pub type LinkTermResult<T> = Result<T, LinkTermError>;
