//! # Lanes
//!
//! A lane is a named partition of transaction-space: a predicate fixed by
//! its [`LaneKind`], an ignore set, a block-space ratio and one index.
//!
//! The index lives behind a `parking_lot::RwLock` so admission, eviction and
//! proposal handling can share a lane through `&self`. Lock guards are never
//! held across calls into another lane.

use crate::config::{LaneConfig, LaneKind, SpaceRatio};
use lane_mempool::{
    BidBook, Hash, IndexConfig, IndexStatus, MempoolError, PriorityIndex, TransactionIndex,
    TxPriority,
};
use parking_lot::{RwLock, RwLockReadGuard};
use primitive_types::U256;
use shared_types::Transaction;
use std::sync::Arc;

/// Index backing a lane.
#[derive(Debug)]
pub enum LaneIndex {
    /// Sender-sequenced priority index
    Priority(PriorityIndex),
    /// Bids ordered by amount
    Bids(BidBook),
}

impl LaneIndex {
    fn as_index(&self) -> &dyn TransactionIndex {
        match self {
            Self::Priority(index) => index,
            Self::Bids(book) => book,
        }
    }

    fn as_index_mut(&mut self) -> &mut dyn TransactionIndex {
        match self {
            Self::Priority(index) => index,
            Self::Bids(book) => book,
        }
    }

    /// Resident transactions in selection order.
    pub fn ordered(&self) -> Vec<Transaction> {
        match self {
            Self::Priority(index) => index.select().cloned().collect(),
            Self::Bids(book) => book.select().cloned().collect(),
        }
    }

    /// Index status.
    pub fn status(&self) -> IndexStatus {
        match self {
            Self::Priority(index) => index.status(),
            Self::Bids(book) => book.status(),
        }
    }
}

impl LaneKind {
    /// The lane's own predicate, before ignore sets apply.
    pub fn predicate(&self, tx: &Transaction) -> bool {
        match self {
            Self::Auction => tx.is_bid(),
            Self::Free => tx.is_free(),
            Self::Default => true,
        }
    }
}

/// A configured lane.
pub struct Lane {
    name: String,
    kind: LaneKind,
    ratio: SpaceRatio,
    ignore: Vec<usize>,
    priority: Arc<dyn TxPriority>,
    index: RwLock<LaneIndex>,
}

impl std::fmt::Debug for Lane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lane")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("ratio", &self.ratio)
            .field("ignore", &self.ignore)
            .field("len", &self.len())
            .finish()
    }
}

impl Lane {
    /// Builds a lane with an empty index. `ignore` holds chain positions.
    pub fn new(config: &LaneConfig, ignore: Vec<usize>, priority: Arc<dyn TxPriority>) -> Self {
        let index_config = IndexConfig {
            max_txs: config.max_txs,
        };
        let index = match config.kind {
            LaneKind::Auction => LaneIndex::Bids(BidBook::new(index_config)),
            LaneKind::Free | LaneKind::Default => {
                LaneIndex::Priority(PriorityIndex::new(index_config, Arc::clone(&priority)))
            }
        };

        Self {
            name: config.name.clone(),
            kind: config.kind,
            ratio: config.max_block_space,
            ignore,
            priority,
            index: RwLock::new(index),
        }
    }

    /// Lane name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lane implementation.
    pub fn kind(&self) -> LaneKind {
        self.kind
    }

    /// Share of the block.
    pub fn ratio(&self) -> SpaceRatio {
        self.ratio
    }

    /// Chain positions of ignored lanes.
    pub fn ignores(&self) -> &[usize] {
        &self.ignore
    }

    /// Ordering key used inside this lane.
    pub fn priority_of(&self, tx: &Transaction) -> U256 {
        match self.kind {
            LaneKind::Auction => tx.bid().map(|b| b.amount).unwrap_or_default(),
            LaneKind::Free | LaneKind::Default => self.priority.priority(tx),
        }
    }

    /// Read access to the index.
    pub fn read(&self) -> RwLockReadGuard<'_, LaneIndex> {
        self.index.read()
    }

    /// Inserts into the index.
    pub fn insert(&self, tx: Transaction) -> Result<(), MempoolError> {
        self.index.write().as_index_mut().insert(tx)
    }

    /// Removes from the index; absent hashes are a no-op.
    pub fn remove(&self, hash: &Hash) -> Option<Transaction> {
        self.index.write().as_index_mut().remove(hash)
    }

    /// Removes several hashes under one lock; returns how many were resident.
    pub fn remove_all<'a>(&self, hashes: impl IntoIterator<Item = &'a Hash>) -> usize {
        let mut index = self.index.write();
        hashes
            .into_iter()
            .filter(|hash| index.as_index_mut().remove(hash).is_some())
            .count()
    }

    /// Checks membership.
    pub fn contains(&self, hash: &Hash) -> bool {
        self.index.read().as_index().contains(hash)
    }

    /// Resident transaction count.
    pub fn len(&self) -> usize {
        self.index.read().as_index().len()
    }

    /// Returns true if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Index status.
    pub fn status(&self) -> IndexStatus {
        self.index.read().status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lane_mempool::FeePriority;
    use shared_types::{BidInfo, TxKind};

    fn lane(kind: LaneKind) -> Lane {
        let config = LaneConfig::new("test", kind, SpaceRatio::ZERO);
        Lane::new(&config, Vec::new(), Arc::new(FeePriority))
    }

    fn create_tx(kind: TxKind, fee: u64) -> Transaction {
        Transaction::new(vec![fee as u8, 1], [0xAA; 20], 0, U256::from(fee), kind)
    }

    fn create_bid(amount: u64) -> Transaction {
        let info = BidInfo {
            bidder: [0xBB; 20],
            amount: U256::from(amount),
            bundle: vec![],
        };
        Transaction::new(vec![amount as u8, 2], [0xBB; 20], 0, U256::zero(), TxKind::Bid(info))
    }

    #[test]
    fn test_predicates() {
        let bid = create_bid(5);
        let free = create_tx(TxKind::Free, 0);
        let standard = create_tx(TxKind::Standard, 3);

        assert!(LaneKind::Auction.predicate(&bid));
        assert!(!LaneKind::Auction.predicate(&free));
        assert!(LaneKind::Free.predicate(&free));
        assert!(!LaneKind::Free.predicate(&standard));
        assert!(LaneKind::Default.predicate(&standard));
        assert!(LaneKind::Default.predicate(&bid));
    }

    #[test]
    fn test_auction_lane_uses_bid_book() {
        let lane = lane(LaneKind::Auction);
        lane.insert(create_bid(7)).unwrap();
        assert!(matches!(*lane.read(), LaneIndex::Bids(_)));

        let err = lane.insert(create_tx(TxKind::Standard, 1));
        assert!(matches!(err, Err(MempoolError::NotABid(_))));
        assert_eq!(lane.priority_of(&create_bid(7)), U256::from(7));
    }

    #[test]
    fn test_insert_remove_contains() {
        let lane = lane(LaneKind::Default);
        let tx = create_tx(TxKind::Standard, 3);

        lane.insert(tx.clone()).unwrap();
        assert!(lane.contains(&tx.hash));
        assert_eq!(lane.len(), 1);
        assert_eq!(lane.priority_of(&tx), U256::from(3));

        assert!(lane.remove(&tx.hash).is_some());
        assert!(lane.remove(&tx.hash).is_none());
        assert!(lane.is_empty());
    }

    #[test]
    fn test_remove_all_counts_resident() {
        let lane = lane(LaneKind::Default);
        let a = create_tx(TxKind::Standard, 3);
        let b = Transaction::new(vec![9], [0xCC; 20], 0, U256::one(), TxKind::Standard);
        lane.insert(a.clone()).unwrap();
        lane.insert(b.clone()).unwrap();

        assert_eq!(lane.remove_all([&a.hash, &b.hash, &[0u8; 32]]), 2);
        assert!(lane.is_empty());
    }

    #[test]
    fn test_ordered_snapshot() {
        let lane = lane(LaneKind::Auction);
        lane.insert(create_bid(3)).unwrap();
        lane.insert(create_bid(9)).unwrap();

        let amounts: Vec<U256> = lane
            .read()
            .ordered()
            .iter()
            .map(|tx| lane.priority_of(tx))
            .collect();
        assert_eq!(amounts, vec![U256::from(9), U256::from(3)]);
    }
}
