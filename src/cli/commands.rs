use crate::cli::args::{Args, Command, ConfigArgs, ConfigCommand, SerialOptions, TerminalOptions};
use crate::core::console::{default_console, key_description, Console};
use crate::core::session::Session;
use crate::domain::config::{ConnectionConfig, LinkTermConfig, TerminalConfig};
use crate::domain::error::{LinkTermError, LinkTermResult};
use crate::infrastructure::config::ConfigManager;
use crate::infrastructure::logging::init_logging;
use crate::infrastructure::open_channel;
use anyhow::Context;
use std::panic;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Execute CLI command
pub fn execute_command(args: Args) -> anyhow::Result<()> {
    let config_manager = ConfigManager::new()?;
    let config = match &args.config {
        Some(path) => config_manager
            .load_config_from_path(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => config_manager.load_config()?,
    };

    match &args.command {
        Some(Command::Config(config_args)) => {
            execute_config_command(config_args, &config, &config_manager)
        }
        None => run_terminal(&args, &config),
    }
}

/// Connection from the command line, a named device, or both
pub fn resolve_connection(args: &Args, config: &LinkTermConfig) -> LinkTermResult<ConnectionConfig> {
    let connection = match (&args.device, &args.port) {
        (Some(name), _) => config
            .device(name)
            .map(|device| device.connection.clone())
            .ok_or_else(|| LinkTermError::Config {
                message: format!("no device named '{}' in the configuration", name),
            })?,
        (None, Some(port)) => ConnectionConfig::from_url(port, args.baudrate)?,
        (None, None) => {
            return Err(LinkTermError::Config {
                message: "no port given; pass PORT or --device".to_string(),
            })
        }
    };
    Ok(apply_serial_options(connection, &args.serial))
}

fn apply_serial_options(connection: ConnectionConfig, options: &SerialOptions) -> ConnectionConfig {
    match connection {
        ConnectionConfig::Serial {
            port,
            baud_rate,
            data_bits,
            stop_bits,
            parity,
            flow_control,
            rts,
            dtr,
            read_timeout_ms,
        } => ConnectionConfig::Serial {
            port,
            baud_rate,
            data_bits: options.data_bits.unwrap_or(data_bits),
            stop_bits: options.stop_bits.unwrap_or(stop_bits),
            parity: options.parity.map(Into::into).unwrap_or(parity),
            flow_control: options.flow_control.map(Into::into).unwrap_or(flow_control),
            rts: options.rts.map(|v| v == 1).unwrap_or(rts),
            dtr: options.dtr.map(|v| v == 1).unwrap_or(dtr),
            read_timeout_ms,
        },
        other => other,
    }
}

fn key_from_code(code: u32, what: &str) -> LinkTermResult<char> {
    char::from_u32(code).ok_or_else(|| LinkTermError::Config {
        message: format!("invalid {} character code {}", what, code),
    })
}

/// Terminal settings from the configuration, overridden by flags
pub fn resolve_terminal(
    options: &TerminalOptions,
    defaults: &TerminalConfig,
) -> LinkTermResult<TerminalConfig> {
    let mut terminal = defaults.clone();

    if let Some(eol) = options.eol {
        terminal.eol = eol;
    }
    if !options.filters.is_empty() {
        terminal.filters = options.filters.clone();
    }
    terminal.echo |= options.echo;
    terminal.raw |= options.raw;

    if let Some(encoding) = &options.encoding {
        terminal.rx_encoding = encoding.clone();
        terminal.tx_encoding = encoding.clone();
    }
    if let Some(encoding) = &options.rx_encoding {
        terminal.rx_encoding = encoding.clone();
    }
    if let Some(encoding) = &options.tx_encoding {
        terminal.tx_encoding = encoding.clone();
    }

    if let Some(code) = options.exit_char {
        terminal.exit_char = key_from_code(code, "exit")?;
    }
    if let Some(code) = options.menu_char {
        terminal.menu_char = key_from_code(code, "menu")?;
    }
    if terminal.exit_char == terminal.menu_char {
        return Err(LinkTermError::Config {
            message: "exit and menu keys must differ".to_string(),
        });
    }

    Ok(terminal)
}

/// Restore the terminal before the default hook prints the panic
fn install_panic_hook(console: Arc<dyn Console>) {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = console.cleanup();
        original_hook(panic_info);
    }));
}

fn run_terminal(args: &Args, config: &LinkTermConfig) -> anyhow::Result<()> {
    let level = if args.verbose {
        "debug"
    } else {
        config.global.log_level.as_str()
    };
    init_logging(level, config.global.log_file.as_deref())?;

    let connection = resolve_connection(args, config)?;
    let terminal = resolve_terminal(&args.terminal, &config.terminal)?;

    let channel = open_channel(&connection)
        .with_context(|| format!("could not open port {}", connection.describe()))?;
    let console = default_console().context("could not access the console")?;
    let session = Session::new(Arc::clone(&channel), Arc::clone(&console), &terminal)?;

    install_panic_hook(Arc::clone(&console));

    let control = session.control();
    let interrupted = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&interrupted);
    ctrlc::set_handler(move || {
        if handler_flag.swap(true, Ordering::SeqCst) {
            // Second Ctrl+C - force exit
            std::process::exit(130);
        }
        control.interrupt();
    })
    .context("failed to install Ctrl+C handler")?;

    if !args.quiet {
        eprintln!("--- linkterm on {} ---", connection.describe());
        eprintln!(
            "--- Quit: {} | Menu: {} ---",
            key_description(terminal.exit_char),
            key_description(terminal.menu_char)
        );
    }

    if let Err(e) = session.start() {
        if !interrupted.load(Ordering::SeqCst) {
            return Err(e).context("could not start session");
        }
        // Ctrl+C before the session was running
        session.close().context("could not close port")?;
        if !args.quiet {
            eprintln!("\n--- exit ---");
        }
        return Ok(());
    }
    info!(session = %session.id(), "Terminal running on {}", channel.name());

    let transmit = session.join(true);
    let result = session.join(false).and(transmit);

    if let Err(e) = console.cleanup() {
        warn!("Failed to restore terminal: {}", e);
    }
    session.close().context("could not close port")?;

    let statistics = session.statistics();
    info!(
        "Session finished: {} bytes received, {} bytes sent",
        statistics.bytes_received, statistics.bytes_sent
    );

    if !args.quiet {
        eprintln!("\n--- exit ---");
    }
    result.context("session ended with an error")
}

fn execute_config_command(
    args: &ConfigArgs,
    config: &LinkTermConfig,
    config_manager: &ConfigManager,
) -> anyhow::Result<()> {
    match &args.command {
        ConfigCommand::Show => {
            let text = toml::to_string_pretty(config).context("failed to serialize configuration")?;
            println!("{}", text);
        }
        ConfigCommand::Validate { file } => {
            match file {
                Some(path) => {
                    config_manager.load_config_from_path(path)?;
                    println!("Configuration file '{}' is valid", path.display());
                }
                None => {
                    config_manager.load_config()?;
                    println!("Current configuration is valid");
                }
            }
        }
        ConfigCommand::Init { output, global } => {
            if *global {
                let global_path = config_manager.get_global_config_path_ref();
                config_manager.save_config(&LinkTermConfig::default())?;
                println!("Global configuration initialized at '{}'", global_path.display());
            } else {
                let dir = match output {
                    Some(dir) => dir.clone(),
                    None => std::env::current_dir().context("failed to get current directory")?,
                };
                let path = config_manager.init_project_config(&dir)?;
                println!("Project configuration initialized at '{}'", path.display());
            }
        }
        ConfigCommand::Devices => {
            if config.devices.is_empty() {
                println!("No devices configured");
            }
            for device in &config.devices {
                println!("{:<20} {:<32} {}", device.name, device.connection.describe(), device.description);
            }
        }
    }
    Ok(())
}
