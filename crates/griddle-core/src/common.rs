//! Protocol, codec and ledger definitions shared across server and client.
//!
//! ## Modules
//! - [`types`]: the ingredient and status event values carried on the wire.
//! - [`codec`]: JSON decoding, interpretation and never-failing encoding.
//! - [`ledger`]: per-session ingredient stock and the portioning algorithm.
//! - [`error`]: the crate-wide [`Error`] type.

pub mod codec;
pub mod error;
pub mod ledger;
pub mod types;

pub use error::{Error, Result};
