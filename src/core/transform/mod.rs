//! Text transformations applied between the console and the channel.
//!
//! Every transform has three hooks. `rx` rewrites text received from the
//! channel, `tx` rewrites text about to be sent, and `echo` rewrites the
//! user's own keystrokes when local echo is on. All three default to the
//! identity, so a variant only overrides what it changes.

pub mod eol;
pub mod filter;
pub mod pipeline;

pub use eol::{Cr, Crlf, Lf};
pub use filter::{Colorize, DebugIo, Direct, NoControls, NoTerminal, Printable};
pub use pipeline::Pipeline;

use crate::domain::config::{EolMode, FilterKind};

/// A text rewrite unit with inbound, outbound and echo hooks
pub trait Transform: Send + Sync {
    /// Text received from the channel
    fn rx(&self, text: String) -> String {
        text
    }

    /// Text to be sent to the channel
    fn tx(&self, text: String) -> String {
        text
    }

    /// Text to be sent, as displayed on the console
    fn echo(&self, text: String) -> String {
        text
    }
}

/// Instantiate the end-of-line transform for a mode
pub fn eol_transform(mode: EolMode) -> Box<dyn Transform> {
    match mode {
        EolMode::Crlf => Box::new(Crlf),
        EolMode::Cr => Box::new(Cr),
        EolMode::Lf => Box::new(Lf),
    }
}

/// Instantiate a filter by kind
pub fn filter_transform(kind: FilterKind) -> Box<dyn Transform> {
    match kind {
        FilterKind::Direct => Box::new(Direct),
        FilterKind::Default => Box::new(NoTerminal::new()),
        FilterKind::NoControl => Box::new(NoControls::new()),
        FilterKind::Printable => Box::new(Printable),
        FilterKind::Colorize => Box::new(Colorize::new()),
        FilterKind::Debug => Box::new(DebugIo::stderr()),
    }
}
