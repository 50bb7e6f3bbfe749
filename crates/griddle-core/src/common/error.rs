//! Error types for the kitchen wire protocol.
//!
//! This module defines the central `Error` enum covering every way a message
//! can fail to cross the wire in either direction. None of these errors is
//! fatal to the process; the session layer decides what each one ends.
//!
//! ## Error Cases
//! - `Decode`: the bytes were not valid JSON.
//! - `NotAnObject`: valid JSON, but not a mapping.
//! - `UnknownIngredient`: the discriminator names none of the known kinds.
//! - `FieldConversion`: the discriminator matched but the quantity field has
//!   the wrong type or is out of range.
//! - `Encode`: an outbound value could not be serialized.

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the kitchen protocol.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The payload is not well-formed JSON.
    #[error("Decode error: {0}")]
    Decode(#[source] serde_json::Error),

    /// The payload is JSON but not an object.
    #[error("Decode error: expected an object, found {found}")]
    NotAnObject { found: &'static str },

    /// The `"ingredient"` discriminator is missing or unrecognised.
    #[error("Unknown ingredient: {found}")]
    UnknownIngredient { found: String },

    /// A known ingredient carried fields that do not convert.
    #[error("Invalid {ingredient} fields: {reason}")]
    FieldConversion {
        ingredient: &'static str,
        reason: String,
    },

    /// Serializing an outbound value failed.
    #[error("Encode error: {0}")]
    Encode(#[source] serde_json::Error),
}

impl Error {
    /// Returns `true` for errors raised before interpretation, i.e. the bytes
    /// themselves were unusable.
    pub const fn is_decode(&self) -> bool {
        matches!(self, Self::Decode(_) | Self::NotAnObject { .. })
    }
}
