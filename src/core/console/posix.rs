use super::{keystroke_from_text, Console, Keystroke};
use crate::domain::error::{LinkTermError, LinkTermResult};
use std::io::{self, Write};
use std::mem::MaybeUninit;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::sync::Mutex;
use tracing::{debug, warn};

/// termios based console for POSIX hosts.
///
/// Raw mode clears ICANON, ECHO and ISIG but keeps output post-processing,
/// so a received `\n` still returns the carriage. `cancel` writes to a
/// self-pipe that `getkey` polls next to stdin, which makes it safe to call
/// from any thread while another one is waiting for a key.
pub struct PosixConsole {
    fd: RawFd,
    saved: Option<libc::termios>,
    cancel_rx: OwnedFd,
    cancel_tx: OwnedFd,
    // one reader at a time; a keystroke is assembled over several reads
    input: Mutex<()>,
}

fn last_error(what: &str) -> LinkTermError {
    LinkTermError::Console {
        message: format!("{}: {}", what, io::Error::last_os_error()),
    }
}

fn set_nonblocking_cloexec(fd: RawFd) -> LinkTermResult<()> {
    // SAFETY: fcntl on a descriptor we own, with integer arguments only
    unsafe {
        let flags = libc::fcntl(fd, libc::F_GETFL);
        if flags < 0 || libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) < 0 {
            return Err(last_error("fcntl(O_NONBLOCK)"));
        }
        if libc::fcntl(fd, libc::F_SETFD, libc::FD_CLOEXEC) < 0 {
            return Err(last_error("fcntl(FD_CLOEXEC)"));
        }
    }
    Ok(())
}

enum Readiness {
    Input,
    // descriptor closed or invalid
    Closed,
    Cancelled,
}

impl PosixConsole {
    /// Capture the current terminal attributes of stdin
    pub fn new() -> LinkTermResult<Self> {
        Self::for_fd(libc::STDIN_FILENO)
    }

    /// Console reading keys from `fd`; the descriptor stays owned by the caller
    fn for_fd(fd: RawFd) -> LinkTermResult<Self> {
        // SAFETY: isatty only inspects the descriptor
        let saved = if unsafe { libc::isatty(fd) } == 1 {
            let mut attrs = MaybeUninit::<libc::termios>::uninit();
            // SAFETY: tcgetattr fully initializes `attrs` when it returns 0
            if unsafe { libc::tcgetattr(fd, attrs.as_mut_ptr()) } != 0 {
                return Err(last_error("tcgetattr"));
            }
            Some(unsafe { attrs.assume_init() })
        } else {
            debug!("stdin is not a terminal; raw mode disabled");
            None
        };

        let mut fds: [RawFd; 2] = [-1; 2];
        // SAFETY: `fds` has room for the two descriptors pipe() writes
        if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
            return Err(last_error("pipe"));
        }
        // SAFETY: pipe() succeeded, so both descriptors are open and ours
        let (cancel_rx, cancel_tx) =
            unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) };
        set_nonblocking_cloexec(cancel_rx.as_raw_fd())?;
        set_nonblocking_cloexec(cancel_tx.as_raw_fd())?;

        Ok(Self {
            fd,
            saved,
            cancel_rx,
            cancel_tx,
            input: Mutex::new(()),
        })
    }

    pub fn is_terminal(&self) -> bool {
        self.saved.is_some()
    }

    fn drain_cancel(&self) {
        let mut buf = [0u8; 64];
        loop {
            // SAFETY: reading into a stack buffer of the given length
            let n = unsafe {
                libc::read(
                    self.cancel_rx.as_raw_fd(),
                    buf.as_mut_ptr().cast::<libc::c_void>(),
                    buf.len(),
                )
            };
            if n <= 0 {
                break;
            }
        }
    }

    /// Wait until stdin or the cancel pipe is readable
    fn wait_readable(&self) -> LinkTermResult<Readiness> {
        loop {
            let mut fds = [
                libc::pollfd {
                    fd: self.fd,
                    events: libc::POLLIN,
                    revents: 0,
                },
                libc::pollfd {
                    fd: self.cancel_rx.as_raw_fd(),
                    events: libc::POLLIN,
                    revents: 0,
                },
            ];
            // SAFETY: `fds` is a valid array of two pollfd structs
            let rc = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, -1) };
            if rc < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(LinkTermError::Console {
                    message: format!("poll: {}", err),
                });
            }
            if fds[1].revents & libc::POLLIN != 0 {
                self.drain_cancel();
                return Ok(Readiness::Cancelled);
            }
            if fds[0].revents & libc::POLLNVAL != 0 {
                return Ok(Readiness::Closed);
            }
            if fds[0].revents & (libc::POLLIN | libc::POLLHUP | libc::POLLERR) != 0 {
                return Ok(Readiness::Input);
            }
        }
    }

    fn read_byte(&self) -> LinkTermResult<Option<u8>> {
        let mut byte = 0u8;
        loop {
            // SAFETY: reading one byte into a local
            let n = unsafe { libc::read(self.fd, (&mut byte as *mut u8).cast::<libc::c_void>(), 1) };
            if n == 1 {
                return Ok(Some(byte));
            }
            if n == 0 {
                return Ok(None);
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(LinkTermError::Console {
                    message: format!("read: {}", err),
                });
            }
        }
    }
}

impl Console for PosixConsole {
    fn setup(&self) -> LinkTermResult<()> {
        if self.saved.is_none() {
            return Ok(());
        }
        let mut attrs = MaybeUninit::<libc::termios>::uninit();
        // SAFETY: tcgetattr initializes `attrs` on success
        if unsafe { libc::tcgetattr(self.fd, attrs.as_mut_ptr()) } != 0 {
            return Err(last_error("tcgetattr"));
        }
        let mut attrs = unsafe { attrs.assume_init() };
        attrs.c_lflag &= !(libc::ICANON | libc::ECHO | libc::ISIG);
        attrs.c_cc[libc::VMIN] = 1;
        attrs.c_cc[libc::VTIME] = 0;
        // SAFETY: `attrs` is a valid termios obtained above
        if unsafe { libc::tcsetattr(self.fd, libc::TCSANOW, &attrs) } != 0 {
            return Err(last_error("tcsetattr"));
        }
        Ok(())
    }

    fn cleanup(&self) -> LinkTermResult<()> {
        if let Some(saved) = &self.saved {
            // SAFETY: restoring attributes captured by tcgetattr
            if unsafe { libc::tcsetattr(self.fd, libc::TCSAFLUSH, saved) } != 0 {
                return Err(last_error("tcsetattr"));
            }
        }
        Ok(())
    }

    fn getkey(&self) -> LinkTermResult<Keystroke> {
        let _reader = self.input.lock().map_err(|_| LinkTermError::Console {
            message: "console input lock poisoned".to_string(),
        })?;

        let mut buf = [0u8; 4];
        let mut len = 0;
        loop {
            match self.wait_readable()? {
                Readiness::Input => {}
                Readiness::Closed => {
                    debug!("Console input descriptor {} is not open", self.fd);
                    return Ok(Keystroke::EndOfInput);
                }
                Readiness::Cancelled => return Ok(Keystroke::Cancelled),
            }
            let Some(byte) = self.read_byte()? else {
                return Ok(Keystroke::EndOfInput);
            };
            buf[len] = byte;
            len += 1;

            match std::str::from_utf8(&buf[..len]) {
                // the BS key yields DEL on most terminals
                Ok("\x7f") => return Ok(Keystroke::Text("\x08".to_string())),
                Ok(text) => return Ok(keystroke_from_text(text.to_string())),
                Err(e) if e.error_len().is_none() && len < buf.len() => continue,
                Err(_) => {
                    warn!("Invalid UTF-8 from keyboard: {:02x?}", &buf[..len]);
                    return Ok(Keystroke::Text(char::REPLACEMENT_CHARACTER.to_string()));
                }
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
        let wake = [0u8; 1];
        // SAFETY: write(2) is async-signal-safe; a full pipe already means a
        // wake-up is pending, so the result is not needed
        unsafe {
            libc::write(
                self.cancel_tx.as_raw_fd(),
                wake.as_ptr().cast::<libc::c_void>(),
                1,
            );
        }
    }
}

impl Drop for PosixConsole {
    fn drop(&mut self) {
        if let Err(e) = self.cleanup() {
            warn!("Failed to restore terminal: {}", e);
        }
    }
}
