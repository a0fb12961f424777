use crate::domain::config::{
    ConnectionConfig, DeviceConfig, FlowControlConfig, GlobalConfig, LinkTermConfig,
    ParityConfig, TerminalConfig,
};
use crate::domain::error::{LinkTermError, LinkTermResult};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const APP_DIR: &str = "linkterm";
const PROJECT_DIR: &str = ".linkterm";
const CONFIG_FILE: &str = "config.toml";

/// Configuration manager
pub struct ConfigManager {
    global_config_path: PathBuf,
    project_config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Create new configuration manager
    pub fn new() -> LinkTermResult<Self> {
        let global_config_path = Self::get_global_config_path()?;
        let project_config_path = Self::find_project_config_path();

        Ok(Self {
            global_config_path,
            project_config_path,
        })
    }

    /// Use explicit file locations
    pub fn with_paths(global_config_path: PathBuf, project_config_path: Option<PathBuf>) -> Self {
        Self {
            global_config_path,
            project_config_path,
        }
    }

    /// Load configuration from files
    pub fn load_config(&self) -> LinkTermResult<LinkTermConfig> {
        // Start with default configuration
        let mut config = LinkTermConfig::default();

        // Global file carries settings, terminal defaults and devices
        if self.global_config_path.exists() {
            debug!("Loading {}", self.global_config_path.display());
            config = self.load_config_from_path(&self.global_config_path)?;
        }

        // Project devices are appended to the global ones
        if let Some(project_path) = &self.project_config_path {
            if project_path.exists() {
                debug!("Loading {}", project_path.display());
                let project_config = self.load_config_from_path(project_path)?;
                config.devices.extend(project_config.devices);
            }
        }

        Ok(config)
    }

    /// Save global settings and terminal defaults to the global file
    pub fn save_config(&self, config: &LinkTermConfig) -> LinkTermResult<()> {
        if let Some(parent) = self.global_config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| LinkTermError::Config {
                message: format!("Failed to create config directory: {}", e),
            })?;
        }

        let global_config = LinkTermConfig {
            global: config.global.clone(),
            terminal: config.terminal.clone(),
            devices: Vec::new(),
        };
        self.save_config_to_path(&self.global_config_path, &global_config)
    }

    /// Get global configuration path
    fn get_global_config_path() -> LinkTermResult<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| LinkTermError::Config {
            message: "Could not determine home directory".to_string(),
        })?;

        Ok(home.join(".config").join(APP_DIR).join(CONFIG_FILE))
    }

    /// Find project configuration path by walking up directory tree
    fn find_project_config_path() -> Option<PathBuf> {
        let current_dir = std::env::current_dir().ok()?;
        let mut path = current_dir.as_path();

        loop {
            let config_path = path.join(PROJECT_DIR).join(CONFIG_FILE);
            if config_path.exists() {
                return Some(config_path);
            }

            path = path.parent()?;
        }
    }

    /// Load configuration from specific path
    pub fn load_config_from_path(&self, path: &Path) -> LinkTermResult<LinkTermConfig> {
        let content = fs::read_to_string(path).map_err(|e| LinkTermError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        toml::from_str(&content).map_err(|e| LinkTermError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })
    }

    /// Save configuration to specific path
    pub fn save_config_to_path(&self, path: &Path, config: &LinkTermConfig) -> LinkTermResult<()> {
        let content = toml::to_string_pretty(config).map_err(|e| LinkTermError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        fs::write(path, content).map_err(|e| LinkTermError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })
    }

    /// Create an example project configuration under `path`
    pub fn init_project_config(&self, path: &Path) -> LinkTermResult<PathBuf> {
        let config_dir = path.join(PROJECT_DIR);
        let config_file = config_dir.join(CONFIG_FILE);

        if config_file.exists() {
            return Err(LinkTermError::Config {
                message: "Project configuration already exists".to_string(),
            });
        }

        fs::create_dir_all(&config_dir).map_err(|e| LinkTermError::Config {
            message: format!("Failed to create {} directory: {}", PROJECT_DIR, e),
        })?;

        self.save_config_to_path(&config_file, &example_config())?;

        Ok(config_file)
    }

    /// Get the global config path
    pub fn get_global_config_path_ref(&self) -> &PathBuf {
        &self.global_config_path
    }
}

fn example_config() -> LinkTermConfig {
    LinkTermConfig {
        global: GlobalConfig::default(),
        terminal: TerminalConfig::default(),
        devices: vec![
            DeviceConfig {
                name: "example_serial".to_string(),
                description: "Example serial device".to_string(),
                connection: ConnectionConfig::Serial {
                    port: "/dev/ttyUSB0".to_string(),
                    baud_rate: 115200,
                    data_bits: 8,
                    stop_bits: 1,
                    parity: ParityConfig::None,
                    flow_control: FlowControlConfig::None,
                    rts: false,
                    dtr: false,
                    read_timeout_ms: 1000,
                },
            },
            DeviceConfig {
                name: "example_tcp".to_string(),
                description: "Example TCP device".to_string(),
                connection: ConnectionConfig::Tcp {
                    host: "192.168.1.100".to_string(),
                    port: 7777,
                    timeout_ms: 3000,
                },
            },
            DeviceConfig {
                name: "loop".to_string(),
                description: "Local loopback".to_string(),
                connection: ConnectionConfig::Loopback,
            },
        ],
    }
}
