//! # Bid Book
//!
//! Ordered store of auction bids. Unlike [`super::PriorityIndex`] there is
//! no sender sequencing: bids are ranked purely by amount, highest first,
//! ties broken by content hash ascending.

use super::entities::{Hash, IndexConfig, Transaction, U256};
use super::errors::MempoolError;
use super::value_objects::{BidKey, IndexStatus};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Bid transactions ordered by bid amount.
#[derive(Debug, Default)]
pub struct BidBook {
    /// Configuration.
    config: IndexConfig,

    /// All bids indexed by hash.
    by_hash: HashMap<Hash, Transaction>,

    /// Bids ordered by amount (highest first).
    by_amount: BTreeSet<BidKey>,
}

impl BidBook {
    /// Creates an empty bid book.
    pub fn new(config: IndexConfig) -> Self {
        Self {
            config,
            by_hash: HashMap::new(),
            by_amount: BTreeSet::new(),
        }
    }

    /// Returns the current configuration.
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Returns the number of bids.
    pub fn len(&self) -> usize {
        self.by_hash.len()
    }

    /// Returns true if there are no bids.
    pub fn is_empty(&self) -> bool {
        self.by_hash.is_empty()
    }

    /// Checks if a bid is resident.
    pub fn contains(&self, hash: &Hash) -> bool {
        self.by_hash.contains_key(hash)
    }

    /// Gets a bid by hash.
    pub fn get(&self, hash: &Hash) -> Option<&Transaction> {
        self.by_hash.get(hash)
    }

    /// Adds a bid.
    ///
    /// # Errors
    /// - `NotABid` if the transaction carries no bid payload
    /// - `DuplicateTransaction` if the hash is already resident
    /// - `CapacityExceeded` if the configured maximum is reached
    pub fn insert(&mut self, tx: Transaction) -> Result<(), MempoolError> {
        let Some(amount) = tx.bid().map(|bid| bid.amount) else {
            return Err(MempoolError::NotABid(tx.hash));
        };

        if self.by_hash.contains_key(&tx.hash) {
            return Err(MempoolError::DuplicateTransaction(tx.hash));
        }

        if self.config.is_full(self.by_hash.len()) {
            return Err(MempoolError::CapacityExceeded {
                capacity: self.config.max_txs.unwrap_or(self.by_hash.len()),
            });
        }

        self.by_amount.insert(BidKey::new(amount, tx.hash));
        self.by_hash.insert(tx.hash, tx);
        Ok(())
    }

    /// Removes a bid. Absent hashes are a no-op.
    pub fn remove(&mut self, hash: &Hash) -> Option<Transaction> {
        let tx = self.by_hash.remove(hash)?;
        if let Some(bid) = tx.bid() {
            self.by_amount.remove(&BidKey::new(bid.amount, tx.hash));
        }
        Some(tx)
    }

    /// Iterates bids from highest to lowest amount.
    pub fn select(&self) -> impl Iterator<Item = &Transaction> + '_ {
        self.by_amount
            .iter()
            .filter_map(|key| self.by_hash.get(&key.hash))
    }

    /// Returns the highest bid.
    pub fn top(&self) -> Option<&Transaction> {
        self.select().next()
    }

    /// Returns the highest bid amount.
    pub fn top_amount(&self) -> Option<U256> {
        self.by_amount.iter().next().map(|key| key.amount)
    }

    /// Gets the bid book status.
    pub fn status(&self) -> IndexStatus {
        let bidders: HashSet<_> = self.by_hash.values().map(|tx| tx.sender).collect();
        IndexStatus {
            tx_count: self.by_hash.len(),
            sender_count: bidders.len(),
            total_bytes: self.by_hash.values().map(Transaction::size).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{BidInfo, TxKind};

    fn create_bid(bidder: u8, amount: u64, salt: u8) -> Transaction {
        let info = BidInfo {
            bidder: [bidder; 20],
            amount: U256::from(amount),
            bundle: vec![vec![salt]],
        };
        Transaction::new(
            vec![bidder, salt, amount as u8],
            [bidder; 20],
            0,
            U256::zero(),
            TxKind::Bid(info),
        )
    }

    fn amounts(book: &BidBook) -> Vec<u64> {
        book.select()
            .filter_map(|tx| tx.bid())
            .map(|bid| bid.amount.as_u64())
            .collect()
    }

    #[test]
    fn test_highest_amount_first() {
        let mut book = BidBook::default();
        book.insert(create_bid(0xA1, 100, 1)).unwrap();
        book.insert(create_bid(0xA2, 500, 2)).unwrap();
        book.insert(create_bid(0xA3, 300, 3)).unwrap();

        assert_eq!(amounts(&book), vec![500, 300, 100]);
        assert_eq!(book.top_amount(), Some(U256::from(500)));
    }

    #[test]
    fn test_ties_broken_by_hash() {
        let mut book = BidBook::default();
        let a = create_bid(0xA1, 100, 1);
        let b = create_bid(0xA2, 100, 2);
        let mut expected = vec![a.hash, b.hash];
        expected.sort();

        book.insert(b).unwrap();
        book.insert(a).unwrap();

        let order: Vec<Hash> = book.select().map(|tx| tx.hash).collect();
        assert_eq!(order, expected);
    }

    #[test]
    fn test_same_bidder_may_hold_several_bids() {
        let mut book = BidBook::default();
        book.insert(create_bid(0xA1, 100, 1)).unwrap();
        book.insert(create_bid(0xA1, 200, 2)).unwrap();

        assert_eq!(book.len(), 2);
        assert_eq!(book.status().sender_count, 1);
    }

    #[test]
    fn test_non_bid_rejected() {
        let mut book = BidBook::default();
        let tx = Transaction::new(vec![1], [0xAA; 20], 0, U256::one(), TxKind::Standard);
        assert_eq!(book.insert(tx.clone()), Err(MempoolError::NotABid(tx.hash)));
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut book = BidBook::default();
        let bid = create_bid(0xA1, 100, 1);
        book.insert(bid.clone()).unwrap();
        assert_eq!(
            book.insert(bid.clone()),
            Err(MempoolError::DuplicateTransaction(bid.hash))
        );
    }

    #[test]
    fn test_capacity_rejects_without_evicting() {
        let mut book = BidBook::new(IndexConfig::with_capacity(1));
        book.insert(create_bid(0xA1, 100, 1)).unwrap();

        let result = book.insert(create_bid(0xA2, 10_000, 2));
        assert_eq!(result, Err(MempoolError::CapacityExceeded { capacity: 1 }));
        assert_eq!(book.top_amount(), Some(U256::from(100)));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut book = BidBook::default();
        let bid = create_bid(0xA1, 100, 1);
        book.insert(bid.clone()).unwrap();

        assert!(book.remove(&bid.hash).is_some());
        assert!(book.remove(&bid.hash).is_none());
        assert!(book.is_empty());
        assert!(book.top().is_none());
    }
}
