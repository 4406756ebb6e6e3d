//! # Proposal Accumulator
//!
//! Running state of one proposal: bytes used, the transactions admitted so
//! far (by content hash), and the senders seen, plus the slot-0 record.
//!
//! Lane and global budgets are checked independently on every admission.

use crate::config::SpaceRatio;
use crate::error::{BlockBuilderError, InvariantViolation, Result};
use bincode::Options;
use serde::{Deserialize, Serialize};
use shared_types::{short_hash, Address, Hash, Transaction};
use std::collections::HashSet;

/// Record carried in slot 0 of every proposal.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalInfo {
    /// Vote extensions of the previous height used to derive the top of block
    pub vote_extensions: Vec<Vec<u8>>,
    /// Number of top-of-block transactions following the record
    pub top_of_block_count: u64,
    /// Maximum proposal bytes in force
    pub max_bytes: u64,
    /// Number of transactions following the record
    pub tx_count: u64,
}

fn record_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .reject_trailing_bytes()
}

impl ProposalInfo {
    /// Encodes the record. The length never depends on the counts.
    pub fn encode(&self) -> Result<Vec<u8>> {
        record_options()
            .serialize(self)
            .map_err(|e| BlockBuilderError::Serialization(e.to_string()))
    }

    /// Decodes a record.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        record_options()
            .deserialize(bytes)
            .map_err(|e| BlockBuilderError::Serialization(e.to_string()))
    }

    /// Encoded length in bytes.
    pub fn encoded_len(&self) -> Result<u64> {
        record_options()
            .serialized_size(self)
            .map_err(|e| BlockBuilderError::Serialization(e.to_string()))
    }
}

/// Ordered transactions of one proposal under a byte budget.
#[derive(Debug)]
pub struct Proposal {
    max_bytes: u64,
    total_bytes: u64,
    record_bytes: u64,
    txs: Vec<Vec<u8>>,
    hashes: HashSet<Hash>,
    senders: HashSet<Address>,
}

impl Proposal {
    /// Empty proposal with a global budget.
    pub fn new(max_bytes: u64) -> Self {
        Self {
            max_bytes,
            total_bytes: 0,
            record_bytes: 0,
            txs: Vec::new(),
            hashes: HashSet::new(),
            senders: HashSet::new(),
        }
    }

    /// Global budget.
    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Bytes used, record included.
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Bytes left in the global budget.
    pub fn remaining(&self) -> u64 {
        self.max_bytes.saturating_sub(self.total_bytes)
    }

    /// Number of admitted transactions (record excluded).
    pub fn len(&self) -> usize {
        self.txs.len()
    }

    /// Returns true if no transaction was admitted.
    pub fn is_empty(&self) -> bool {
        self.txs.is_empty()
    }

    /// Checks membership by content hash.
    pub fn contains(&self, hash: &Hash) -> bool {
        self.hashes.contains(hash)
    }

    /// Returns true if `sender` signed an admitted transaction as primary.
    pub fn has_sender(&self, sender: &Address) -> bool {
        self.senders.contains(sender)
    }

    /// Reserves global budget for the slot-0 record.
    pub fn reserve_record(&mut self, len: u64) -> Result<()> {
        let total = (self.total_bytes - self.record_bytes).saturating_add(len);
        if total > self.max_bytes {
            return Err(BlockBuilderError::GlobalBudgetExceeded {
                total,
                max: self.max_bytes,
            });
        }
        self.total_bytes = total;
        self.record_bytes = len;
        Ok(())
    }

    /// Budget a lane with `ratio` may use in total.
    ///
    /// A zero ratio grants whatever the global budget has left.
    pub fn lane_budget(&self, ratio: SpaceRatio) -> u64 {
        if ratio.is_zero() {
            self.remaining()
        } else {
            ratio.apply(self.max_bytes)
        }
    }

    /// Largest segment a lane may still add: its own budget capped by what
    /// is left globally.
    pub fn lane_limit(&self, ratio: SpaceRatio) -> u64 {
        self.lane_budget(ratio).min(self.remaining())
    }

    /// Admits a lane segment.
    ///
    /// # Errors
    /// - `LaneBudgetExceeded` if the segment is larger than the lane budget
    /// - `GlobalBudgetExceeded` if the proposal would exceed `max_bytes`
    /// - `Invariant(DuplicateTransaction)` if any hash is already present
    pub fn admit(&mut self, lane: &str, ratio: SpaceRatio, segment: &[Transaction]) -> Result<()> {
        let size: u64 = segment.iter().map(Transaction::size).sum();

        let limit = self.lane_budget(ratio);
        if size > limit {
            return Err(BlockBuilderError::LaneBudgetExceeded {
                lane: lane.to_string(),
                requested: size,
                limit,
            });
        }

        let total = self.total_bytes.saturating_add(size);
        if total > self.max_bytes {
            return Err(BlockBuilderError::GlobalBudgetExceeded {
                total,
                max: self.max_bytes,
            });
        }

        let mut fresh = HashSet::with_capacity(segment.len());
        for tx in segment {
            if self.hashes.contains(&tx.hash) || !fresh.insert(tx.hash) {
                return Err(InvariantViolation::DuplicateTransaction(short_hash(&tx.hash)).into());
            }
        }

        self.total_bytes = total;
        self.hashes.extend(fresh);
        for tx in segment {
            self.senders.insert(tx.sender);
            self.txs.push(tx.bytes.clone());
        }
        Ok(())
    }

    /// Final transaction list with the record in slot 0.
    pub fn into_txs(self, record: Vec<u8>) -> Vec<Vec<u8>> {
        let mut out = Vec::with_capacity(self.txs.len() + 1);
        out.push(record);
        out.extend(self.txs);
        out
    }
}
