// Infrastructure module - Channel adapters, logging and config files
pub mod config;
pub mod logging;
pub mod loopback;
pub mod serial;
pub mod tcp;

pub use loopback::LoopbackChannel;
pub use serial::SerialChannel;
pub use tcp::TcpChannel;

use crate::core::channel::Channel;
use crate::domain::config::ConnectionConfig;
use crate::domain::error::LinkTermResult;
use std::sync::Arc;

/// Open the channel described by `config`
pub fn open_channel(config: &ConnectionConfig) -> LinkTermResult<Arc<dyn Channel>> {
    let channel: Arc<dyn Channel> = match config {
        ConnectionConfig::Serial { .. } => Arc::new(SerialChannel::open(config)?),
        ConnectionConfig::Tcp { .. } => Arc::new(TcpChannel::connect(config)?),
        ConnectionConfig::Loopback => Arc::new(LoopbackChannel::new()),
    };
    Ok(channel)
}
