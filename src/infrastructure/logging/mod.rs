// Logging module - Logging infrastructure
use crate::domain::error::{LinkTermError, LinkTermResult};
use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when neither `RUST_LOG` nor the configuration sets one
pub const DEFAULT_FILTER: &str = "linkterm=warn";

/// Build the filter directive for a configured level name
pub fn filter_directive(level: &str) -> String {
    let level = level.trim();
    if level.is_empty() {
        DEFAULT_FILTER.to_string()
    } else if level.contains('=') || level.contains(',') {
        // already a full directive
        level.to_string()
    } else {
        format!("linkterm={}", level)
    }
}

/// Initialize logging system.
///
/// The terminal is in raw mode while a session runs, so records go to
/// `log_file` when one is given and to stderr otherwise. `RUST_LOG` takes
/// precedence over `level`.
pub fn init_logging(level: &str, log_file: Option<&Path>) -> LinkTermResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter_directive(level)))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let (writer, ansi) = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| LinkTermError::Config {
                    message: format!("Failed to open log file {}: {}", path.display(), e),
                })?;
            (BoxMakeWriter::new(Mutex::new(file)), false)
        }
        None => (BoxMakeWriter::new(io::stderr), true),
    };

    let result = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(ansi)
                .with_target(true)
                .with_level(true)
                .with_thread_names(true),
        )
        .try_init();

    if result.is_ok() {
        tracing::info!("LinkTerm logging system initialized");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_filter_directive() {
        assert_eq!(filter_directive("debug"), "linkterm=debug");
        assert_eq!(filter_directive(""), DEFAULT_FILTER);
        assert_eq!(filter_directive("linkterm=trace,warn"), "linkterm=trace,warn");
    }

    #[test]
    fn test_logging_init() {
        // Test that logging initialization doesn't panic, even when repeated
        assert!(init_logging("info", None).is_ok());
        assert!(init_logging("debug", None).is_ok());
    }

    #[test]
    fn test_log_file_is_created() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("linkterm.log");
        assert!(init_logging("info", Some(&path)).is_ok());
        assert!(path.exists());
    }

    #[test]
    fn test_unwritable_log_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing").join("linkterm.log");
        assert!(matches!(
            init_logging("info", Some(&path)),
            Err(LinkTermError::Config { .. })
        ));
    }
}
