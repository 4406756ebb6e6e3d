//! Value objects for the lane indices.
//!
//! Immutable ordering keys and status snapshots.

use super::entities::{Address, Hash, U256};
use std::cmp::Ordering;

/// Ordering key for the bid book.
///
/// Implements `Ord` such that a higher amount sorts first. Equal amounts
/// are broken by hash, ascending, so every node iterates bids identically.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BidKey {
    /// Bid amount (higher = higher priority).
    pub amount: U256,
    /// Bid transaction hash.
    pub hash: Hash,
}

impl BidKey {
    /// Creates a new bid key.
    pub fn new(amount: U256, hash: Hash) -> Self {
        Self { amount, hash }
    }
}

impl Ord for BidKey {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .amount
            .cmp(&self.amount)
            .then_with(|| self.hash.cmp(&other.hash))
    }
}

impl PartialOrd for BidKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Heap entry used while selecting from a priority index.
///
/// `effective` is the transaction's priority clamped to the effective
/// priority of its sender predecessor, so a sender chain can never jump
/// ahead of where its first member was emitted.
///
/// `Ord` is arranged for a max-heap: greater effective priority first,
/// then smaller hash first.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SelectionKey {
    /// Clamped priority.
    pub effective: U256,
    /// Transaction hash.
    pub hash: Hash,
    /// Sender of the transaction.
    pub sender: Address,
    /// Sender sequence of the transaction.
    pub sequence: u64,
}

impl Ord for SelectionKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.effective
            .cmp(&other.effective)
            .then_with(|| other.hash.cmp(&self.hash))
    }
}

impl PartialOrd for SelectionKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Index status snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IndexStatus {
    /// Resident transactions.
    pub tx_count: usize,
    /// Distinct senders (bidders for a bid book).
    pub sender_count: usize,
    /// Sum of encoded sizes.
    pub total_bytes: u64,
}
