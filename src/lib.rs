//! LinkTerm Library
//!
//! Interactive terminal that connects the keyboard and screen to a byte
//! channel (serial port, TCP socket or loopback). Text passes through
//! configurable encodings and transform pipelines in both directions.

pub mod cli;
pub mod core;
pub mod domain;
pub mod infrastructure;

pub use crate::core::channel::Channel;
pub use crate::core::console::{Console, Keystroke};
pub use crate::core::session::{MenuHandler, Session, SessionControl, SessionState};
pub use crate::core::transform::{Pipeline, Transform};
pub use domain::config::LinkTermConfig;
pub use domain::error::{LinkTermError, LinkTermResult};
