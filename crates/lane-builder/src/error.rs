//! Error types for the block builder

use lane_mempool::MempoolError;
use primitive_types::U256;
use shared_types::DecodeError;
use thiserror::Error;

/// Result type alias for block builder operations
pub type Result<T> = std::result::Result<T, BlockBuilderError>;

/// Errors that can occur while building or verifying a proposal
#[derive(Debug, Error)]
pub enum BlockBuilderError {
    /// Transaction bytes could not be decoded
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Ante-style rejection by the execution context
    #[error("Validation failed for {tx}: {reason}")]
    Validation {
        /// Short transaction hash
        tx: String,
        /// Rejection reason reported by the context
        reason: String,
    },

    /// Bid failed an auction rule
    #[error("Bid rejected: {0}")]
    BidRejected(#[from] BidRejection),

    /// A lane segment is larger than the lane's share of the block
    #[error("Lane {lane} budget exceeded: {requested} > {limit}")]
    LaneBudgetExceeded {
        /// Lane name
        lane: String,
        /// Segment size in bytes
        requested: u64,
        /// Lane limit in bytes
        limit: u64,
    },

    /// The proposal would exceed its maximum size
    #[error("Global budget exceeded: {total} > {max}")]
    GlobalBudgetExceeded {
        /// Total bytes after admission
        total: u64,
        /// Maximum bytes
        max: u64,
    },

    /// Structural rule broken
    #[error("Invariant violation: {0}")]
    Invariant(#[from] InvariantViolation),

    /// A panic was caught at a lane boundary
    #[error("Panic recovered in {scope}: {message}")]
    PanicRecovered {
        /// Lane name or handler that panicked
        scope: String,
        /// Panic payload rendered as text
        message: String,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Lane index refused an operation
    #[error("Mempool error: {0}")]
    Mempool(#[from] MempoolError),

    /// Record or config (de)serialization failure
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Auction rule a bid failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BidRejection {
    /// Transaction carries no bid payload
    #[error("transaction is not a bid")]
    NotABid,

    /// Bid timeout is below the current height
    #[error("bid expired: timeout {timeout} < height {height}")]
    Expired {
        /// Bid timeout height
        timeout: u64,
        /// Current height
        height: u64,
    },

    /// Bid amount below the reserve price
    #[error("bid {amount} below reserve {reserve}")]
    BelowReserve {
        /// Bid amount
        amount: U256,
        /// Reserve price
        reserve: U256,
    },

    /// Bid does not beat the current top bid by the minimum increment
    #[error("bid {amount} below required {required}")]
    BelowIncrement {
        /// Bid amount
        amount: U256,
        /// Current top plus increment
        required: U256,
    },

    /// Bundle holds more transactions than allowed
    #[error("bundle of {len} transactions exceeds maximum {max}")]
    BundleTooLarge {
        /// Bundle length
        len: usize,
        /// Configured maximum
        max: usize,
    },

    /// Bundled transaction failed to decode
    #[error("bundled transaction {index} failed to decode: {reason}")]
    BundleDecode {
        /// Position in the bundle
        index: usize,
        /// Decoder message
        reason: String,
    },

    /// Bundled transaction is itself a bid
    #[error("bundled transaction {index} is a bid")]
    NestedBid {
        /// Position in the bundle
        index: usize,
    },

    /// Same transaction appears twice in the bundle
    #[error("bundled transaction {index} repeats an earlier entry")]
    DuplicateBundleTx {
        /// Position of the repeat
        index: usize,
    },

    /// Bid bundles its own bytes
    #[error("bid bundles itself")]
    SelfBundled,
}

/// Structural violations. Always a hard reject during verification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    /// Bundle signer sets switch parties in a disallowed way
    #[error("front-running pattern in bundle at position {position}")]
    FrontRunning {
        /// First offending bundle position
        position: usize,
    },

    /// A transaction claimed by a lane appears after that lane's run
    #[error("lane {lane} interleaved: transaction at {position} belongs to it")]
    LaneInterleaving {
        /// Lane name
        lane: String,
        /// Offending position in the remainder
        position: usize,
    },

    /// Priority increases inside a lane without a sender-chain excuse
    #[error("lane {lane} priority order broken at {position}")]
    PriorityOrdering {
        /// Lane name
        lane: String,
        /// Offending position in the lane run
        position: usize,
    },

    /// A sender's sequence does not strictly increase inside a lane
    #[error("lane {lane} sequence order broken at {position}")]
    SequenceOrdering {
        /// Lane name
        lane: String,
        /// Offending position in the lane run
        position: usize,
    },

    /// Re-derived top-of-block differs from the proposal's claim
    #[error("top-of-block mismatch: {reason}")]
    TopOfBlockMismatch {
        /// What differed
        reason: String,
    },

    /// A transaction appears twice in one proposal
    #[error("duplicate transaction {0}")]
    DuplicateTransaction(String),

    /// Transactions left after every lane ran
    #[error("{count} transactions claimed by no lane")]
    UnclaimedTransactions {
        /// Number of leftover transactions
        count: usize,
    },

    /// Record commits to a different number of transactions
    #[error("record commits to {claimed} transactions, proposal carries {actual}")]
    TransactionCountMismatch {
        /// Count in the record
        claimed: u64,
        /// Transactions after the record
        actual: usize,
    },

    /// Proposal has no record in slot 0
    #[error("proposal is missing its record")]
    MissingRecord,

    /// Record advertises more bytes than this node allows
    #[error("record max bytes {max_bytes} above cap {cap}")]
    MaxBytesAboveCap {
        /// Advertised maximum
        max_bytes: u64,
        /// Local cap
        cap: u64,
    },
}

impl BlockBuilderError {
    /// Check if error only disqualifies one candidate or lane segment
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Decode(_)
                | Self::Validation { .. }
                | Self::BidRejected(_)
                | Self::LaneBudgetExceeded { .. }
                | Self::GlobalBudgetExceeded { .. }
                | Self::Mempool(_)
        )
    }

    /// Check if error is never tolerated during verification
    pub fn is_hard_reject(&self) -> bool {
        matches!(self, Self::Invariant(_) | Self::PanicRecovered { .. })
    }
}
