//! Index configuration and stored entries.

pub use shared_types::{Address, Hash, Transaction, U256};

/// Lane index configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IndexConfig {
    /// Maximum resident transactions; `None` means unbounded.
    ///
    /// When reached, new inserts are refused. Existing entries are never
    /// evicted to make room.
    pub max_txs: Option<usize>,
}

impl IndexConfig {
    /// Bounded configuration.
    pub fn with_capacity(max_txs: usize) -> Self {
        Self {
            max_txs: Some(max_txs),
        }
    }

    /// Returns true if `len` entries leave no room for another.
    pub fn is_full(&self, len: usize) -> bool {
        self.max_txs.is_some_and(|max| len >= max)
    }
}

/// A transaction resident in a priority index with its cached priority.
#[derive(Clone, Debug)]
pub struct IndexedTransaction {
    /// The decoded transaction.
    pub tx: Transaction,
    /// Priority computed once at insert time.
    pub priority: U256,
}
