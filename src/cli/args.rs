use crate::domain::config::{EolMode, FilterKind, FlowControlConfig, ParityConfig};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Command line arguments for LinkTerm
#[derive(Parser, Debug)]
#[command(
    name = "linkterm",
    version = env!("CARGO_PKG_VERSION"),
    about = "Terminal for serial ports and TCP sockets",
    long_about = "Connects the keyboard and screen to a serial port, a TCP socket (socket://host:port) or a loopback channel (loop://). Press Ctrl+] to quit.",
    args_conflicts_with_subcommands = true
)]
pub struct Args {
    /// Serial port path, socket://<host>:<port> or loop://
    pub port: Option<String>,

    /// Baud rate
    #[arg(default_value = "9600")]
    pub baudrate: u32,

    /// Use a device defined in the configuration instead of PORT
    #[arg(short, long, conflicts_with = "port")]
    pub device: Option<String>,

    #[command(flatten)]
    pub serial: SerialOptions,

    #[command(flatten)]
    pub terminal: TerminalOptions,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banners
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Command to execute instead of opening a terminal
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Configuration management commands
    Config(ConfigArgs),
}

/// Port settings; override the device definition
#[derive(ClapArgs, Debug, Default)]
pub struct SerialOptions {
    /// Data bits (5-8)
    #[arg(long, value_parser = clap::value_parser!(u8).range(5..=8))]
    pub data_bits: Option<u8>,

    /// Stop bits (1 or 2)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=2))]
    pub stop_bits: Option<u8>,

    /// Parity
    #[arg(long, value_enum)]
    pub parity: Option<ParityArg>,

    /// Flow control
    #[arg(long, value_enum)]
    pub flow_control: Option<FlowControlArg>,

    /// Initial RTS line state (0 or 1)
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=1))]
    pub rts: Option<u8>,

    /// Initial DTR line state (0 or 1)
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=1))]
    pub dtr: Option<u8>,
}

/// Session settings; override the [terminal] section
#[derive(ClapArgs, Debug, Default)]
pub struct TerminalOptions {
    /// End of line mode: crlf, cr or lf
    #[arg(long)]
    pub eol: Option<EolMode>,

    /// Text filter, may be given more than once: direct, default, nocontrol, printable, colorize, debug
    #[arg(long = "filter")]
    pub filters: Vec<FilterKind>,

    /// Echo typed keys locally
    #[arg(long)]
    pub echo: bool,

    /// Write received bytes without decoding or filtering
    #[arg(long)]
    pub raw: bool,

    /// Encoding for both directions (any WHATWG label, or hexlify)
    #[arg(long)]
    pub encoding: Option<String>,

    /// Encoding for received data
    #[arg(long)]
    pub rx_encoding: Option<String>,

    /// Encoding for transmitted data
    #[arg(long)]
    pub tx_encoding: Option<String>,

    /// Exit key as a decimal character code (default 29, Ctrl+])
    #[arg(long)]
    pub exit_char: Option<u32>,

    /// Menu key as a decimal character code (default 20, Ctrl+T)
    #[arg(long)]
    pub menu_char: Option<u32>,
}

/// Configuration management arguments
#[derive(ClapArgs, Debug)]
pub struct ConfigArgs {
    /// Configuration subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Configuration subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,
    /// Validate a configuration file
    Validate {
        /// File to validate (default: the loaded configuration)
        file: Option<PathBuf>,
    },
    /// Create a configuration file
    Init {
        /// Directory for the project configuration
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Write the global configuration instead
        #[arg(short, long)]
        global: bool,
    },
    /// List configured devices
    Devices,
}

/// Parity configuration argument
#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum ParityArg {
    None,
    Even,
    Odd,
}

/// Flow control configuration argument
#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum FlowControlArg {
    None,
    Software,
    Hardware,
}

impl From<ParityArg> for ParityConfig {
    fn from(parity: ParityArg) -> Self {
        match parity {
            ParityArg::None => Self::None,
            ParityArg::Even => Self::Even,
            ParityArg::Odd => Self::Odd,
        }
    }
}

impl From<FlowControlArg> for FlowControlConfig {
    fn from(flow_control: FlowControlArg) -> Self {
        match flow_control {
            FlowControlArg::None => Self::None,
            FlowControlArg::Software => Self::Software,
            FlowControlArg::Hardware => Self::Hardware,
        }
    }
}
