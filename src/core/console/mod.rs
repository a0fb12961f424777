//! Raw-mode console abstraction.
//!
//! A console delivers single keystrokes without line buffering or local echo,
//! writes output unbuffered, and can be told from another thread to give up
//! waiting for a key. The mode saved at construction is restored by
//! `cleanup`, by `Drop`, and by the binary's panic hook.

pub mod keymap;
pub mod portable;
#[cfg(unix)]
pub mod posix;

pub use portable::PortableConsole;
#[cfg(unix)]
pub use posix::PosixConsole;

use crate::domain::error::LinkTermResult;
use std::sync::Arc;

/// Result of waiting for a key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Keystroke {
    /// One character, or an ANSI escape sequence for a special key
    Text(String),
    /// The keyboard interrupt character (Ctrl+C); raw mode delivers it as a
    /// key instead of a signal
    Interrupt,
    /// `cancel` was called while waiting
    Cancelled,
    /// Standard input was closed
    EndOfInput,
}

/// Ctrl+C as read from a raw-mode keyboard
pub const KEYBOARD_INTERRUPT: &str = "\x03";

/// Keystroke for text read from the keyboard
pub fn keystroke_from_text(text: String) -> Keystroke {
    if text == KEYBOARD_INTERRUPT {
        Keystroke::Interrupt
    } else {
        Keystroke::Text(text)
    }
}

/// Platform terminal used by a session
pub trait Console: Send + Sync {
    /// Read single characters, no echo. Calling it again keeps the saved mode.
    fn setup(&self) -> LinkTermResult<()>;

    /// Restore the terminal mode saved at construction
    fn cleanup(&self) -> LinkTermResult<()>;

    /// Block until a keystroke is available
    fn getkey(&self) -> LinkTermResult<Keystroke>;

    /// Write bytes that are already encoded
    fn write_bytes(&self, data: &[u8]) -> LinkTermResult<()>;

    /// Write text
    fn write(&self, text: &str) -> LinkTermResult<()> {
        self.write_bytes(text.as_bytes())
    }

    /// Wake a thread blocked in `getkey`
    fn cancel(&self);
}

/// Switches the terminal to normal mode for its lifetime.
///
/// Raw mode is re-entered on drop, whether the guarded operation succeeded
/// or not.
pub struct CookedMode<'a> {
    console: &'a dyn Console,
}

impl<'a> CookedMode<'a> {
    pub fn enter(console: &'a dyn Console) -> LinkTermResult<Self> {
        console.cleanup()?;
        Ok(Self { console })
    }
}

impl Drop for CookedMode<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.console.setup() {
            tracing::warn!("Failed to re-enter raw mode: {}", e);
        }
    }
}

/// Run `f` with the terminal temporarily in normal line mode
pub fn with_cooked_mode<T, F>(console: &dyn Console, f: F) -> LinkTermResult<T>
where
    F: FnOnce() -> LinkTermResult<T>,
{
    let _guard = CookedMode::enter(console)?;
    f()
}

/// The console implementation for this platform
pub fn default_console() -> LinkTermResult<Arc<dyn Console>> {
    #[cfg(unix)]
    {
        Ok(Arc::new(PosixConsole::new()?))
    }
    #[cfg(not(unix))]
    {
        Ok(Arc::new(PortableConsole::new()))
    }
}

/// Readable description for a key, e.g. `Ctrl+]`
pub fn key_description(character: char) -> String {
    let code = character as u32;
    if code < 32 {
        format!("Ctrl+{}", char::from(b'@' + code as u8))
    } else {
        format!("{:?}", character)
    }
}
