// Serial module - Serial port channel
pub mod client;

pub use client::SerialChannel;
