// Session module - Console/channel pump
pub mod session;
pub mod state;

pub use session::{IgnoreMenu, MenuHandler, Session, SessionControl, INTERRUPT_CHARACTER};
pub use state::{SessionState, SessionStatistics};
