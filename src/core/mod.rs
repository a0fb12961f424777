// Core module - Session engine and the abstractions it runs on
pub mod channel;
pub mod codec;
pub mod console;
pub mod session;
pub mod transform;
