pub mod controller;
pub mod state;

pub use controller::{SessionController, SessionEvent};
pub use state::{AdvanceOutcome, ExecutionSession, SessionStatus, TickOutcome};
