// TCP module - TCP client channel
pub mod client;

pub use client::TcpChannel;
