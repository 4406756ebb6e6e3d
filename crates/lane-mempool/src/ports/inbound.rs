//! # Inbound Port - TransactionIndex
//!
//! The contract every lane index offers to its callers: proposal
//! preparation, admission (CheckTx) and precommit eviction.
//!
//! | Method | Used by |
//! |--------|---------|
//! | `insert` | admission |
//! | `remove` | proposal preparation, eviction, commit cleanup |
//! | `contains` / `get` | proposal preparation, routing |
//!
//! Ordered iteration is exposed by each index directly (`select()`), since
//! the two indices iterate differently.

use crate::domain::{BidBook, Hash, MempoolError, PriorityIndex, Transaction};

/// Common membership contract of lane indices.
pub trait TransactionIndex {
    /// Adds a transaction.
    fn insert(&mut self, tx: Transaction) -> Result<(), MempoolError>;

    /// Removes a transaction; absent hashes are a no-op returning `None`.
    fn remove(&mut self, hash: &Hash) -> Option<Transaction>;

    /// Checks membership in O(1).
    fn contains(&self, hash: &Hash) -> bool;

    /// Gets a resident transaction.
    fn get(&self, hash: &Hash) -> Option<&Transaction>;

    /// Number of resident transactions.
    fn len(&self) -> usize;

    /// Returns true if nothing is resident.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TransactionIndex for PriorityIndex {
    fn insert(&mut self, tx: Transaction) -> Result<(), MempoolError> {
        PriorityIndex::insert(self, tx)
    }

    fn remove(&mut self, hash: &Hash) -> Option<Transaction> {
        PriorityIndex::remove(self, hash)
    }

    fn contains(&self, hash: &Hash) -> bool {
        PriorityIndex::contains(self, hash)
    }

    fn get(&self, hash: &Hash) -> Option<&Transaction> {
        PriorityIndex::get(self, hash)
    }

    fn len(&self) -> usize {
        PriorityIndex::len(self)
    }
}

impl TransactionIndex for BidBook {
    fn insert(&mut self, tx: Transaction) -> Result<(), MempoolError> {
        BidBook::insert(self, tx)
    }

    fn remove(&mut self, hash: &Hash) -> Option<Transaction> {
        BidBook::remove(self, hash)
    }

    fn contains(&self, hash: &Hash) -> bool {
        BidBook::contains(self, hash)
    }

    fn get(&self, hash: &Hash) -> Option<&Transaction> {
        BidBook::get(self, hash)
    }

    fn len(&self) -> usize {
        BidBook::len(self)
    }
}
