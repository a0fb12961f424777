use super::{keymap, keystroke_from_text, Console, Keystroke};
use crate::domain::error::{LinkTermError, LinkTermResult};
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::terminal;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Console built on crossterm's event reader.
///
/// crossterm saves the host console mode the first time raw mode is
/// enabled and restores exactly that mode when it is disabled. Waiting for
/// a key is a bounded event poll, so `cancel` takes effect within one poll
/// interval.
pub struct PortableConsole {
    cancel_requested: AtomicBool,
}

impl PortableConsole {
    pub fn new() -> Self {
        Self {
            cancel_requested: AtomicBool::new(false),
        }
    }
}

impl Default for PortableConsole {
    fn default() -> Self {
        Self::new()
    }
}

fn console_error(e: io::Error) -> LinkTermError {
    LinkTermError::Console {
        message: e.to_string(),
    }
}

impl Console for PortableConsole {
    fn setup(&self) -> LinkTermResult<()> {
        terminal::enable_raw_mode().map_err(console_error)
    }

    fn cleanup(&self) -> LinkTermResult<()> {
        terminal::disable_raw_mode().map_err(console_error)
    }

    fn getkey(&self) -> LinkTermResult<Keystroke> {
        loop {
            if self.cancel_requested.swap(false, Ordering::AcqRel) {
                return Ok(Keystroke::Cancelled);
            }
            if !event::poll(POLL_INTERVAL).map_err(console_error)? {
                continue;
            }
            match event::read().map_err(console_error)? {
                Event::Key(key) if key.kind != KeyEventKind::Release => {
                    match keymap::translate(&key) {
                        Some(text) => return Ok(keystroke_from_text(text)),
                        None => debug!("Dropping key without translation: {:?}", key.code),
                    }
                }
                Event::Paste(text) => return Ok(Keystroke::Text(text)),
                _ => {}
            }
        }
    }

    fn write_bytes(&self, data: &[u8]) -> LinkTermResult<()> {
        let mut stdout = io::stdout().lock();
        stdout.write_all(data)?;
        stdout.flush()?;
        Ok(())
    }

    fn cancel(&self) {
        self.cancel_requested.store(true, Ordering::Release);
    }
}

impl Drop for PortableConsole {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}
