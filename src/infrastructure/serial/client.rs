use crate::core::channel::Channel;
use crate::domain::config::{ConnectionConfig, FlowControlConfig, ParityConfig};
use crate::domain::error::{LinkTermError, LinkTermResult};
use serialport::SerialPort;
use std::io::{self, Read, Write};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info};

type PortHalf = Mutex<Option<Box<dyn SerialPort>>>;

/// Serial port channel.
///
/// The port is cloned into a read half and a write half so a read waiting in
/// the driver does not hold up writes. Reads return empty after the
/// configured read timeout; serial ports have no way to abort a read early.
pub struct SerialChannel {
    name: String,
    reader: PortHalf,
    writer: PortHalf,
}

impl SerialChannel {
    /// Open and configure a serial port
    pub fn open(config: &ConnectionConfig) -> LinkTermResult<Self> {
        let ConnectionConfig::Serial {
            port,
            baud_rate,
            data_bits,
            stop_bits,
            parity,
            flow_control,
            rts,
            dtr,
            read_timeout_ms,
        } = config
        else {
            return Err(LinkTermError::Open {
                target: config.describe(),
                message: "not a serial connection".to_string(),
            });
        };

        let open_error = |message: String| LinkTermError::Open {
            target: port.clone(),
            message,
        };

        let data_bits = match data_bits {
            5 => serialport::DataBits::Five,
            6 => serialport::DataBits::Six,
            7 => serialport::DataBits::Seven,
            8 => serialport::DataBits::Eight,
            _ => return Err(open_error(format!("Invalid data bits: {}", data_bits))),
        };

        let stop_bits = match stop_bits {
            1 => serialport::StopBits::One,
            2 => serialport::StopBits::Two,
            _ => return Err(open_error(format!("Invalid stop bits: {}", stop_bits))),
        };

        let parity = match parity {
            ParityConfig::None => serialport::Parity::None,
            ParityConfig::Even => serialport::Parity::Even,
            ParityConfig::Odd => serialport::Parity::Odd,
        };

        let flow_control = match flow_control {
            FlowControlConfig::None => serialport::FlowControl::None,
            FlowControlConfig::Software => serialport::FlowControl::Software,
            FlowControlConfig::Hardware => serialport::FlowControl::Hardware,
        };

        let mut reader = serialport::new(port, *baud_rate)
            .data_bits(data_bits)
            .stop_bits(stop_bits)
            .parity(parity)
            .flow_control(flow_control)
            .timeout(Duration::from_millis(*read_timeout_ms))
            .open()
            .map_err(|e| open_error(e.to_string()))?;

        // Control lines are applied after open; some drivers reset them on open
        reader
            .write_request_to_send(*rts)
            .map_err(|e| open_error(format!("Failed to set RTS: {}", e)))?;
        reader
            .write_data_terminal_ready(*dtr)
            .map_err(|e| open_error(format!("Failed to set DTR: {}", e)))?;

        let writer = reader
            .try_clone()
            .map_err(|e| open_error(format!("Failed to clone port handle: {}", e)))?;

        info!("Serial port {} opened at {} baud", port, baud_rate);

        Ok(Self {
            name: port.clone(),
            reader: Mutex::new(Some(reader)),
            writer: Mutex::new(Some(writer)),
        })
    }
}

fn half(port: &PortHalf) -> MutexGuard<'_, Option<Box<dyn SerialPort>>> {
    port.lock().unwrap_or_else(PoisonError::into_inner)
}

fn not_connected() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "serial port is closed")
}

impl Channel for SerialChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self, max_bytes: usize) -> io::Result<Vec<u8>> {
        let mut guard = half(&self.reader);
        let port = guard.as_mut().ok_or_else(not_connected)?;

        let mut buffer = vec![0u8; max_bytes.max(1)];
        match port.read(&mut buffer) {
            Ok(n) => {
                buffer.truncate(n);
                Ok(buffer)
            }
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(Vec::new()),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    fn write(&self, data: &[u8]) -> io::Result<()> {
        let mut guard = half(&self.writer);
        let port = guard.as_mut().ok_or_else(not_connected)?;
        port.write_all(data)?;
        port.flush()?;
        debug!("Sent {} bytes over serial", data.len());
        Ok(())
    }

    fn bytes_available(&self) -> Option<usize> {
        half(&self.reader)
            .as_ref()
            .and_then(|port| port.bytes_to_read().ok())
            .map(|n| n as usize)
    }

    fn close(&self) -> io::Result<()> {
        if let Some(mut port) = half(&self.writer).take() {
            port.flush()?;
        }
        half(&self.reader).take();
        info!("Serial port {} closed", self.name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_rejects_non_serial_config() {
        let result = SerialChannel::open(&ConnectionConfig::Loopback);
        assert!(matches!(result, Err(LinkTermError::Open { .. })));
    }

    #[test]
    fn test_open_rejects_invalid_framing() {
        let config = ConnectionConfig::Serial {
            port: "/dev/does-not-exist".to_string(),
            baud_rate: 9600,
            data_bits: 9,
            stop_bits: 1,
            parity: ParityConfig::None,
            flow_control: FlowControlConfig::None,
            rts: false,
            dtr: false,
            read_timeout_ms: 100,
        };
        match SerialChannel::open(&config) {
            Err(LinkTermError::Open { message, .. }) => assert!(message.contains("data bits")),
            _ => panic!("expected open error"),
        }
    }

    #[test]
    fn test_open_missing_port_fails() {
        let config = ConnectionConfig::from_url("/dev/linkterm-missing-port", 9600).unwrap();
        assert!(matches!(
            SerialChannel::open(&config),
            Err(LinkTermError::Open { .. })
        ));
    }
}
