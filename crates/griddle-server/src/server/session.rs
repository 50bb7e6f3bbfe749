//! Kitchen sessions.
//!
//! A session is the lifetime of one connection: its own ledger, its own fryer
//! pool, and one outbound event stream. Nothing here is shared between
//! sessions.

mod coordinator;
mod outbound;
mod state;
pub mod transport;

pub use coordinator::{CloseReason, Session, SessionSummary};
pub use state::SessionState;
