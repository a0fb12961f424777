use crate::core::channel::Channel;
use crate::domain::config::ConnectionConfig;
use crate::domain::error::{LinkTermError, LinkTermResult};
use std::io::{self, BufReader, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

/// TCP client channel (`socket://host:port`).
///
/// A pending read is aborted by shutting down the read side of the socket.
/// End of stream that was not requested that way is reported as a fault.
pub struct TcpChannel {
    name: String,
    reader: Mutex<BufReader<TcpStream>>,
    writer: Mutex<TcpStream>,
    control: TcpStream,
    read_cancelled: AtomicBool,
    closed: AtomicBool,
}

impl TcpChannel {
    /// Connect to the configured host
    pub fn connect(config: &ConnectionConfig) -> LinkTermResult<Self> {
        let ConnectionConfig::Tcp {
            host,
            port,
            timeout_ms,
        } = config
        else {
            return Err(LinkTermError::Open {
                target: config.describe(),
                message: "not a TCP connection".to_string(),
            });
        };

        let target = format!("{}:{}", host, port);
        let open_error = |message: String| LinkTermError::Open {
            target: target.clone(),
            message,
        };

        let addresses = (host.as_str(), *port)
            .to_socket_addrs()
            .map_err(|e| open_error(format!("Failed to resolve host: {}", e)))?;

        let timeout = Duration::from_millis(*timeout_ms);
        let mut last_error = None;
        let mut stream = None;
        for address in addresses {
            match TcpStream::connect_timeout(&address, timeout) {
                Ok(connected) => {
                    stream = Some(connected);
                    break;
                }
                Err(e) => {
                    debug!("Connect to {} failed: {}", address, e);
                    last_error = Some(e);
                }
            }
        }
        let stream = stream.ok_or_else(|| {
            open_error(match last_error {
                Some(e) => e.to_string(),
                None => "no addresses resolved".to_string(),
            })
        })?;

        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to set TCP_NODELAY: {}", e);
        }

        let clone = |stream: &TcpStream| {
            stream
                .try_clone()
                .map_err(|e| open_error(format!("Failed to clone socket: {}", e)))
        };
        let writer = clone(&stream)?;
        let control = clone(&stream)?;

        info!("TCP connection established to {}", target);

        Ok(Self {
            name: format!("socket://{}", target),
            reader: Mutex::new(BufReader::new(stream)),
            writer: Mutex::new(writer),
            control,
            read_cancelled: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        })
    }

    fn reader(&self) -> MutexGuard<'_, BufReader<TcpStream>> {
        self.reader.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Channel for TcpChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self, max_bytes: usize) -> io::Result<Vec<u8>> {
        if self.closed.load(Ordering::Acquire) {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "socket is closed"));
        }

        let mut reader = self.reader();
        let mut buffer = vec![0u8; max_bytes.max(1)];
        match reader.read(&mut buffer) {
            Ok(0) if self.read_cancelled.load(Ordering::Acquire) => Ok(Vec::new()),
            Ok(0) => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed by remote host",
            )),
            Ok(n) => {
                buffer.truncate(n);
                Ok(buffer)
            }
            Err(_) if self.read_cancelled.load(Ordering::Acquire) => Ok(Vec::new()),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    fn write(&self, data: &[u8]) -> io::Result<()> {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.write_all(data)?;
        writer.flush()?;
        debug!("Sent {} bytes over TCP", data.len());
        Ok(())
    }

    /// Bytes already pulled into the local buffer
    fn bytes_available(&self) -> Option<usize> {
        self.reader.try_lock().ok().map(|reader| reader.buffer().len())
    }

    fn supports_cancel_read(&self) -> bool {
        true
    }

    fn cancel_read(&self) {
        self.read_cancelled.store(true, Ordering::Release);
        if let Err(e) = self.control.shutdown(Shutdown::Read) {
            debug!("Shutdown of read side failed: {}", e);
        }
    }

    fn close(&self) -> io::Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.read_cancelled.store(true, Ordering::Release);
        match self.control.shutdown(Shutdown::Both) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotConnected => {}
            Err(e) => return Err(e),
        }
        info!("TCP connection {} closed", self.name);
        Ok(())
    }
}
