//! # Error Types
//!
//! Defines error types used across crates.

use thiserror::Error;

/// Errors produced while turning bytes into a [`crate::Transaction`].
///
/// Always fatal to the single item being decoded, never to the batch it
/// arrived in.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Empty input.
    #[error("Empty transaction bytes")]
    Empty,

    /// Bytes do not parse as a transaction.
    #[error("Malformed transaction: {0}")]
    Malformed(String),

    /// A field parsed but holds an impossible value.
    #[error("Invalid field {field}: {reason}")]
    InvalidField {
        /// Field name.
        field: &'static str,
        /// Why the value is rejected.
        reason: String,
    },
}

/// Errors produced while encoding a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Encoding failed: {0}")]
pub struct EncodeError(pub String);
