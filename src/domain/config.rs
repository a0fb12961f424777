use crate::domain::error::LinkTermError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// LinkTerm configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkTermConfig {
    /// Global configuration
    #[serde(default)]
    pub global: GlobalConfig,
    /// Terminal session defaults
    #[serde(default)]
    pub terminal: TerminalConfig,
    /// Named channel definitions
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
}

/// Global configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Default log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log file; stderr is used when unset
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

/// Terminal session settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalConfig {
    #[serde(default)]
    pub eol: EolMode,
    #[serde(default = "default_filters")]
    pub filters: Vec<FilterKind>,
    /// Local echo of typed keys
    #[serde(default)]
    pub echo: bool,
    /// Bypass decoding and transforms on the receive path
    #[serde(default)]
    pub raw: bool,
    #[serde(default = "default_encoding")]
    pub rx_encoding: String,
    #[serde(default = "default_encoding")]
    pub tx_encoding: String,
    #[serde(default = "default_exit_char")]
    pub exit_char: char,
    #[serde(default = "default_menu_char")]
    pub menu_char: char,
}

/// Device configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Device name
    pub name: String,
    /// Device description
    #[serde(default)]
    pub description: String,
    /// Connection type
    pub connection: ConnectionConfig,
}

/// Connection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ConnectionConfig {
    #[serde(rename = "serial")]
    Serial {
        port: String,
        baud_rate: u32,
        #[serde(default = "default_data_bits")]
        data_bits: u8,
        #[serde(default = "default_stop_bits")]
        stop_bits: u8,
        #[serde(default)]
        parity: ParityConfig,
        #[serde(default)]
        flow_control: FlowControlConfig,
        #[serde(default)]
        rts: bool,
        #[serde(default)]
        dtr: bool,
        #[serde(default = "default_read_timeout")]
        read_timeout_ms: u64,
    },
    #[serde(rename = "tcp")]
    Tcp {
        host: String,
        port: u16,
        #[serde(default = "default_tcp_timeout")]
        timeout_ms: u64,
    },
    #[serde(rename = "loopback")]
    Loopback,
}

/// Parity configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParityConfig {
    #[default]
    None,
    Odd,
    Even,
}

/// Flow control configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowControlConfig {
    #[default]
    None,
    Hardware,
    Software,
}

/// What the Enter key sends, and how received line endings are shown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EolMode {
    #[default]
    Crlf,
    Cr,
    Lf,
}

/// Text filters selectable by name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    /// No transformation
    Direct,
    /// Replace terminal control codes with visible glyphs
    Default,
    /// Replace all control codes, including CR and LF
    NoControl,
    /// Show decimal codes for everything outside printable ASCII
    Printable,
    /// Different colors for received and echoed text
    Colorize,
    /// Print what is sent and received to stderr
    Debug,
}

impl FilterKind {
    pub const ALL: [FilterKind; 6] = [
        FilterKind::Direct,
        FilterKind::Default,
        FilterKind::NoControl,
        FilterKind::Printable,
        FilterKind::Colorize,
        FilterKind::Debug,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FilterKind::Direct => "direct",
            FilterKind::Default => "default",
            FilterKind::NoControl => "nocontrol",
            FilterKind::Printable => "printable",
            FilterKind::Colorize => "colorize",
            FilterKind::Debug => "debug",
        }
    }
}

impl EolMode {
    pub fn name(&self) -> &'static str {
        match self {
            EolMode::Crlf => "crlf",
            EolMode::Cr => "cr",
            EolMode::Lf => "lf",
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for EolMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FilterKind {
    type Err = LinkTermError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        FilterKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == wanted)
            .ok_or_else(|| LinkTermError::Config {
                message: format!(
                    "unknown filter '{}' (expected one of: {})",
                    s,
                    FilterKind::ALL.map(|k| k.name()).join(", ")
                ),
            })
    }
}

impl FromStr for EolMode {
    type Err = LinkTermError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "crlf" => Ok(EolMode::Crlf),
            "cr" => Ok(EolMode::Cr),
            "lf" => Ok(EolMode::Lf),
            _ => Err(LinkTermError::Config {
                message: format!("unknown end-of-line mode '{}' (expected crlf, cr or lf)", s),
            }),
        }
    }
}

impl LinkTermConfig {
    /// Look up a device by name
    pub fn device(&self, name: &str) -> Option<&DeviceConfig> {
        self.devices.iter().find(|device| device.name == name)
    }
}

impl ConnectionConfig {
    /// Interpret a port argument: `socket://host:port`, `loop://`, or a device path
    pub fn from_url(url: &str, baud_rate: u32) -> Result<Self, LinkTermError> {
        if let Some(rest) = url.strip_prefix("socket://") {
            let (host, port) = rest.rsplit_once(':').ok_or_else(|| LinkTermError::Config {
                message: format!("expected socket://<host>:<port>, got '{}'", url),
            })?;
            let port = port
                .trim_end_matches('/')
                .parse::<u16>()
                .map_err(|e| LinkTermError::Config {
                    message: format!("invalid TCP port in '{}': {}", url, e),
                })?;
            return Ok(ConnectionConfig::Tcp {
                host: host.to_string(),
                port,
                timeout_ms: default_tcp_timeout(),
            });
        }

        if url.starts_with("loop://") {
            return Ok(ConnectionConfig::Loopback);
        }

        if url.contains("://") {
            return Err(LinkTermError::Config {
                message: format!("unsupported URL scheme in '{}'", url),
            });
        }

        Ok(ConnectionConfig::Serial {
            port: url.to_string(),
            baud_rate,
            data_bits: default_data_bits(),
            stop_bits: default_stop_bits(),
            parity: ParityConfig::None,
            flow_control: FlowControlConfig::None,
            rts: false,
            dtr: false,
            read_timeout_ms: default_read_timeout(),
        })
    }

    /// Human readable target, used in banners and error messages
    pub fn describe(&self) -> String {
        match self {
            ConnectionConfig::Serial {
                port,
                baud_rate,
                data_bits,
                stop_bits,
                parity,
                ..
            } => {
                let parity = match parity {
                    ParityConfig::None => 'N',
                    ParityConfig::Odd => 'O',
                    ParityConfig::Even => 'E',
                };
                format!("{}  {},{},{},{}", port, baud_rate, data_bits, parity, stop_bits)
            }
            ConnectionConfig::Tcp { host, port, .. } => format!("socket://{}:{}", host, port),
            ConnectionConfig::Loopback => "loop://".to_string(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "warn".to_string()
}

fn default_filters() -> Vec<FilterKind> {
    vec![FilterKind::Default]
}

fn default_encoding() -> String {
    "UTF-8".to_string()
}

fn default_exit_char() -> char {
    '\x1d' // GS / Ctrl+]
}

fn default_menu_char() -> char {
    '\x14' // Ctrl+T
}

fn default_data_bits() -> u8 {
    8
}

fn default_stop_bits() -> u8 {
    1
}

fn default_read_timeout() -> u64 {
    1000
}

fn default_tcp_timeout() -> u64 {
    3000
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_file: None,
        }
    }
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            eol: EolMode::default(),
            filters: default_filters(),
            echo: false,
            raw: false,
            rx_encoding: default_encoding(),
            tx_encoding: default_encoding(),
            exit_char: default_exit_char(),
            menu_char: default_menu_char(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_serialization() {
        let config = LinkTermConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: LinkTermConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(deserialized.terminal, config.terminal);
    }

    #[test]
    fn test_terminal_defaults() {
        let terminal = TerminalConfig::default();
        assert_eq!(terminal.eol, EolMode::Crlf);
        assert_eq!(terminal.filters, vec![FilterKind::Default]);
        assert_eq!(terminal.exit_char, '\x1d');
        assert_eq!(terminal.menu_char, '\x14');
        assert_eq!(terminal.rx_encoding, "UTF-8");
        assert!(!terminal.echo);
        assert!(!terminal.raw);
    }

    #[test]
    fn test_partial_terminal_section() {
        let config: LinkTermConfig = toml::from_str(
            r#"
            [terminal]
            eol = "cr"
            filters = ["printable", "colorize"]
            exit_char = "\u0018"
            "#,
        )
        .unwrap();

        assert_eq!(config.terminal.eol, EolMode::Cr);
        assert_eq!(
            config.terminal.filters,
            vec![FilterKind::Printable, FilterKind::Colorize]
        );
        assert_eq!(config.terminal.exit_char, '\x18');
        assert_eq!(config.terminal.menu_char, '\x14');
    }

    #[test]
    fn test_device_config() {
        let config: LinkTermConfig = toml::from_str(
            r#"
            [[devices]]
            name = "board"
            [devices.connection]
            type = "serial"
            port = "/dev/ttyUSB0"
            baud_rate = 115200
            parity = "even"

            [[devices]]
            name = "bridge"
            [devices.connection]
            type = "tcp"
            host = "192.168.1.100"
            port = 7000
            "#,
        )
        .unwrap();

        assert_eq!(config.devices.len(), 2);
        match &config.devices[0].connection {
            ConnectionConfig::Serial {
                baud_rate,
                parity,
                read_timeout_ms,
                ..
            } => {
                assert_eq!(*baud_rate, 115200);
                assert_eq!(*parity, ParityConfig::Even);
                assert_eq!(*read_timeout_ms, 1000);
            }
            other => panic!("unexpected connection {:?}", other),
        }
        assert!(matches!(
            config.devices[1].connection,
            ConnectionConfig::Tcp { port: 7000, timeout_ms: 3000, .. }
        ));
    }

    #[test]
    fn test_connection_from_url() {
        assert!(matches!(
            ConnectionConfig::from_url("socket://localhost:7777", 9600).unwrap(),
            ConnectionConfig::Tcp { ref host, port: 7777, .. } if host == "localhost"
        ));
        assert_eq!(
            ConnectionConfig::from_url("loop://", 9600).unwrap(),
            ConnectionConfig::Loopback
        );
        assert!(matches!(
            ConnectionConfig::from_url("/dev/ttyACM0", 115200).unwrap(),
            ConnectionConfig::Serial { baud_rate: 115200, .. }
        ));
        assert!(ConnectionConfig::from_url("socket://nohost", 9600).is_err());
        assert!(ConnectionConfig::from_url("rfc2217://host:1", 9600).is_err());
    }

    #[test]
    fn test_filter_and_eol_parsing() {
        assert_eq!("nocontrol".parse::<FilterKind>().unwrap(), FilterKind::NoControl);
        assert_eq!("Debug".parse::<FilterKind>().unwrap(), FilterKind::Debug);
        assert!("bogus".parse::<FilterKind>().is_err());
        assert_eq!("CRLF".parse::<EolMode>().unwrap(), EolMode::Crlf);
        assert!("crcr".parse::<EolMode>().is_err());
    }

    #[test]
    fn test_describe() {
        let serial = ConnectionConfig::from_url("/dev/ttyUSB0", 9600).unwrap();
        assert_eq!(serial.describe(), "/dev/ttyUSB0  9600,8,N,1");
        assert_eq!(ConnectionConfig::Loopback.describe(), "loop://");
    }
}
