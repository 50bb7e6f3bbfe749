//! Error types for a kitchen session.
//!
//! Every variant ends the session that raised it and nothing else. Sessions
//! never share state, so no session error is ever escalated to the process.
//!
//! ## Error Cases
//! - `Protocol`: an inbound frame failed to decode or interpret, or an
//!   outbound event failed to encode.
//! - `Transport`: reading from or writing to the connection failed.
//! - `ChannelClosed`: an internal queue closed while the session still needed
//!   it.
//! - `ServiceShutdown`: the session's shutdown signal fired while an operation
//!   was waiting.

use thiserror::Error;

pub type Result<T> = core::result::Result<T, SessionError>;

/// Unified error type for a kitchen session.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The wire payload could not be converted in either direction.
    #[error(transparent)]
    Protocol(#[from] griddle_core::Error),

    /// The connection failed to read or write.
    #[error("Transport error: {context}")]
    Transport { context: String },

    /// Internal channel send/receive failure.
    #[error("Channel error: {context}")]
    ChannelClosed { context: String },

    /// The session is shutting down.
    #[error("Session is shutting down")]
    ServiceShutdown,
}
