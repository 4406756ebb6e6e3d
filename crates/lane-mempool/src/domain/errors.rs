//! Index error types.
//!
//! Defines every way an insert into a lane index can be refused. Removal
//! never fails: removing an absent entry is a no-op.

use shared_types::{Address, Hash};

/// Lane index error type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MempoolError {
    /// Transaction already exists in the index.
    DuplicateTransaction(Hash),

    /// Index has reached its configured maximum.
    CapacityExceeded { capacity: usize },

    /// Another transaction already occupies this sender sequence slot.
    SequenceConflict { sender: Address, sequence: u64 },

    /// Only bids may enter a bid book.
    NotABid(Hash),
}

impl std::fmt::Display for MempoolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateTransaction(hash) => {
                write!(f, "Duplicate transaction: {}", hex::encode(&hash[..4]))
            }
            Self::CapacityExceeded { capacity } => {
                write!(f, "Index full at {} transactions", capacity)
            }
            Self::SequenceConflict { sender, sequence } => {
                write!(
                    f,
                    "Sender {} already has a transaction at sequence {}",
                    hex::encode(&sender[..4]),
                    sequence
                )
            }
            Self::NotABid(hash) => {
                write!(f, "Transaction {} is not a bid", hex::encode(&hash[..4]))
            }
        }
    }
}

impl std::error::Error for MempoolError {}
