//! Outbound ports (driven side - SPI)
//!
//! The ledger is consumed only through [`ExecutionContext`]. Branching is
//! `Clone`: every lane attempt, bid verification and per-transaction check
//! runs on a clone, and the clone replaces its parent only on success.

use shared_types::Transaction;
use thiserror::Error;

/// Phase a validation call is made from.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ExecMode {
    /// Admission of a new transaction
    CheckTx,
    /// Re-validation of resident transactions after a commit
    Recheck,
    /// Building a proposal
    Prepare,
    /// Verifying a received proposal
    Process,
    /// Building or verifying a vote extension
    VoteExtension,
}

/// Ante-style rejection reported by the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct ValidationFailure {
    /// Why the transaction was rejected
    pub reason: String,
}

impl ValidationFailure {
    /// Creates a failure with a reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Port: opaque ledger-validation capability.
pub trait ExecutionContext: Clone {
    /// Validates `tx` and applies its effects to this context.
    ///
    /// On error the context may be left partially modified; callers discard
    /// it.
    fn validate_tx(&mut self, tx: &Transaction, mode: ExecMode) -> Result<(), ValidationFailure>;
}
