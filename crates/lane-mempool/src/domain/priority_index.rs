//! # Priority Index - Sender Sequencing and Cross-Sender Priority
//!
//! The ordered store behind every non-auction lane.
//!
//! ## Data Structures
//!
//! - `by_hash`: O(1) membership and lookup by content hash
//! - `by_sender`: O(log n) sequence-ordered chain per sender
//!
//! ## Selection Order
//!
//! `select()` merges the sender chains lazily through a max-heap holding
//! one entry per sender. The entry for a chain successor is pushed only
//! after its predecessor has been popped, with its priority clamped to the
//! predecessor's effective priority. Consequences:
//!
//! - a sender's transactions come out in strictly increasing sequence;
//! - the effective priorities of emitted transactions never increase;
//! - ties are broken by content hash, ascending.
//!
//! A `Selection` borrows the index, so the index cannot be mutated while
//! one is alive. Callers that want to remove entries collect hashes, drop
//! the selection, remove, and call `select()` again.

use super::entities::{Address, Hash, IndexConfig, IndexedTransaction, Transaction, U256};
use super::errors::MempoolError;
use super::priority::{FeePriority, TxPriority};
use super::value_objects::{IndexStatus, SelectionKey};
use std::collections::{BTreeMap, BinaryHeap, HashMap, HashSet};
use std::ops::Bound;
use std::sync::Arc;

/// Sender-sequenced priority index.
///
/// INVARIANTS:
/// - No duplicate hashes
/// - At most one transaction per (sender, sequence)
/// - `by_hash` and `by_sender` always describe the same set
pub struct PriorityIndex {
    /// Configuration.
    config: IndexConfig,

    /// Cross-sender priority function.
    priority: Arc<dyn TxPriority>,

    /// All transactions indexed by hash.
    by_hash: HashMap<Hash, IndexedTransaction>,

    /// Transactions grouped by sender, ordered by sequence.
    by_sender: HashMap<Address, BTreeMap<u64, Hash>>,
}

impl std::fmt::Debug for PriorityIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriorityIndex")
            .field("config", &self.config)
            .field("len", &self.by_hash.len())
            .field("senders", &self.by_sender.len())
            .finish()
    }
}

impl PriorityIndex {
    /// Creates an empty index ordered by `priority`.
    pub fn new(config: IndexConfig, priority: Arc<dyn TxPriority>) -> Self {
        Self {
            config,
            priority,
            by_hash: HashMap::new(),
            by_sender: HashMap::new(),
        }
    }

    /// Creates an unbounded index ordered by fee.
    pub fn with_defaults() -> Self {
        Self::new(IndexConfig::default(), Arc::new(FeePriority))
    }

    /// Returns the current configuration.
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Computes the priority this index would assign to `tx`.
    pub fn priority_of(&self, tx: &Transaction) -> U256 {
        self.priority.priority(tx)
    }

    /// Returns the number of transactions in the index.
    pub fn len(&self) -> usize {
        self.by_hash.len()
    }

    /// Returns true if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.by_hash.is_empty()
    }

    /// Checks if a transaction is resident.
    pub fn contains(&self, hash: &Hash) -> bool {
        self.by_hash.contains_key(hash)
    }

    /// Gets a transaction by hash.
    pub fn get(&self, hash: &Hash) -> Option<&Transaction> {
        self.by_hash.get(hash).map(|entry| &entry.tx)
    }

    /// Adds a transaction.
    ///
    /// # Errors
    /// - `DuplicateTransaction` if the hash is already resident
    /// - `SequenceConflict` if the sender already has this sequence
    /// - `CapacityExceeded` if the configured maximum is reached
    pub fn insert(&mut self, tx: Transaction) -> Result<(), MempoolError> {
        if self.by_hash.contains_key(&tx.hash) {
            return Err(MempoolError::DuplicateTransaction(tx.hash));
        }

        let slot_taken = self
            .by_sender
            .get(&tx.sender)
            .is_some_and(|chain| chain.contains_key(&tx.sequence));
        if slot_taken {
            return Err(MempoolError::SequenceConflict {
                sender: tx.sender,
                sequence: tx.sequence,
            });
        }

        if self.config.is_full(self.by_hash.len()) {
            return Err(MempoolError::CapacityExceeded {
                capacity: self.config.max_txs.unwrap_or(self.by_hash.len()),
            });
        }

        let priority = self.priority.priority(&tx);
        self.by_sender
            .entry(tx.sender)
            .or_default()
            .insert(tx.sequence, tx.hash);
        self.by_hash
            .insert(tx.hash, IndexedTransaction { tx, priority });

        Ok(())
    }

    /// Removes a transaction. Absent hashes are a no-op.
    pub fn remove(&mut self, hash: &Hash) -> Option<Transaction> {
        let entry = self.by_hash.remove(hash)?;

        if let Some(chain) = self.by_sender.get_mut(&entry.tx.sender) {
            chain.remove(&entry.tx.sequence);
            if chain.is_empty() {
                self.by_sender.remove(&entry.tx.sender);
            }
        }

        Some(entry.tx)
    }

    /// Starts a fresh selection pass in priority order.
    pub fn select(&self) -> Selection<'_> {
        Selection::new(self)
    }

    /// Gets the number of transactions for a sender.
    pub fn sender_count(&self, sender: &Address) -> usize {
        self.by_sender.get(sender).map(|m| m.len()).unwrap_or(0)
    }

    /// Gets the index status.
    pub fn status(&self) -> IndexStatus {
        IndexStatus {
            tx_count: self.by_hash.len(),
            sender_count: self.by_sender.len(),
            total_bytes: self.by_hash.values().map(|e| e.tx.size()).sum(),
        }
    }
}

/// Lazy, restartable pass over a [`PriorityIndex`].
pub struct Selection<'a> {
    index: &'a PriorityIndex,
    heap: BinaryHeap<SelectionKey>,
    skipped: HashSet<Address>,
}

impl<'a> Selection<'a> {
    fn new(index: &'a PriorityIndex) -> Self {
        let mut heap = BinaryHeap::with_capacity(index.by_sender.len());

        for (sender, chain) in &index.by_sender {
            let Some((&sequence, hash)) = chain.iter().next() else {
                continue;
            };
            let Some(entry) = index.by_hash.get(hash) else {
                continue;
            };
            heap.push(SelectionKey {
                effective: entry.priority,
                hash: *hash,
                sender: *sender,
                sequence,
            });
        }

        Self {
            index,
            heap,
            skipped: HashSet::new(),
        }
    }

    /// Drops the rest of `sender`'s chain from this pass.
    ///
    /// Used when a sender's transaction is rejected: its successors can no
    /// longer execute in sequence.
    pub fn skip_sender(&mut self, sender: Address) {
        self.skipped.insert(sender);
    }

    fn push_successor(&mut self, key: &SelectionKey) {
        let Some(chain) = self.index.by_sender.get(&key.sender) else {
            return;
        };
        let next = chain
            .range((Bound::Excluded(key.sequence), Bound::Unbounded))
            .next();
        let Some((&sequence, hash)) = next else {
            return;
        };
        let Some(entry) = self.index.by_hash.get(hash) else {
            return;
        };

        self.heap.push(SelectionKey {
            effective: entry.priority.min(key.effective),
            hash: *hash,
            sender: key.sender,
            sequence,
        });
    }
}

impl<'a> Iterator for Selection<'a> {
    type Item = &'a Transaction;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let key = self.heap.pop()?;
            if self.skipped.contains(&key.sender) {
                continue;
            }
            let index = self.index;
            let Some(entry) = index.by_hash.get(&key.hash) else {
                continue;
            };
            self.push_successor(&key);
            return Some(&entry.tx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::TxKind;

    fn create_tx(sender_byte: u8, sequence: u64, fee: u64) -> Transaction {
        let bytes = vec![sender_byte, sequence as u8, fee as u8, (fee >> 8) as u8];
        Transaction::new(
            bytes,
            [sender_byte; 20],
            sequence,
            U256::from(fee),
            TxKind::Standard,
        )
    }

    fn fees(index: &PriorityIndex) -> Vec<u64> {
        index.select().map(|tx| tx.fee.as_u64()).collect()
    }

    // =========================================================================
    // PRIORITY ORDERING TESTS
    // =========================================================================

    #[test]
    fn test_distinct_senders_descending_priority() {
        let mut index = PriorityIndex::with_defaults();
        index.insert(create_tx(0xA1, 0, 10)).unwrap();
        index.insert(create_tx(0xA2, 0, 50)).unwrap();
        index.insert(create_tx(0xA3, 0, 30)).unwrap();

        assert_eq!(fees(&index), vec![50, 30, 10]);
    }

    #[test]
    fn test_same_sender_sequence_order_regardless_of_priority() {
        let mut index = PriorityIndex::with_defaults();
        index.insert(create_tx(0xAA, 1, 90)).unwrap();
        index.insert(create_tx(0xAA, 0, 5)).unwrap();

        let order: Vec<u64> = index.select().map(|tx| tx.sequence).collect();
        assert_eq!(order, vec![0, 1]);
    }

    #[test]
    fn test_successor_clamped_to_predecessor() {
        let mut index = PriorityIndex::with_defaults();
        index.insert(create_tx(0xAA, 0, 10)).unwrap();
        index.insert(create_tx(0xAA, 1, 100)).unwrap();
        index.insert(create_tx(0xBB, 0, 50)).unwrap();

        // A1 cannot overtake B even though its own fee is higher.
        let order: Vec<(u8, u64)> = index
            .select()
            .map(|tx| (tx.sender[0], tx.sequence))
            .collect();
        assert_eq!(order, vec![(0xBB, 0), (0xAA, 0), (0xAA, 1)]);
    }

    #[test]
    fn test_equal_priority_broken_by_hash() {
        let mut index = PriorityIndex::with_defaults();
        let a = create_tx(0xA1, 0, 10);
        let b = create_tx(0xA2, 0, 10);
        let mut expected = vec![a.hash, b.hash];
        expected.sort();

        index.insert(b).unwrap();
        index.insert(a).unwrap();

        let order: Vec<Hash> = index.select().map(|tx| tx.hash).collect();
        assert_eq!(order, expected);
    }

    #[test]
    fn test_sequence_gap_still_ordered() {
        let mut index = PriorityIndex::with_defaults();
        index.insert(create_tx(0xAA, 0, 10)).unwrap();
        index.insert(create_tx(0xAA, 2, 20)).unwrap();

        let order: Vec<u64> = index.select().map(|tx| tx.sequence).collect();
        assert_eq!(order, vec![0, 2]);
    }

    #[test]
    fn test_custom_priority_function() {
        let by_sequence: Arc<dyn TxPriority> = Arc::new(|tx: &Transaction| U256::from(tx.sequence));
        let mut index = PriorityIndex::new(IndexConfig::default(), by_sequence);
        index.insert(create_tx(0xA1, 3, 1)).unwrap();
        index.insert(create_tx(0xA2, 7, 1)).unwrap();

        let order: Vec<u64> = index.select().map(|tx| tx.sequence).collect();
        assert_eq!(order, vec![7, 3]);
    }

    // =========================================================================
    // SELECTION CONTROL TESTS
    // =========================================================================

    #[test]
    fn test_skip_sender_drops_rest_of_chain() {
        let mut index = PriorityIndex::with_defaults();
        index.insert(create_tx(0xAA, 0, 90)).unwrap();
        index.insert(create_tx(0xAA, 1, 80)).unwrap();
        index.insert(create_tx(0xBB, 0, 10)).unwrap();

        let mut selection = index.select();
        let first = selection.next().unwrap();
        assert_eq!(first.sender, [0xAA; 20]);
        selection.skip_sender(first.sender);

        let rest: Vec<Address> = selection.map(|tx| tx.sender).collect();
        assert_eq!(rest, vec![[0xBB; 20]]);
    }

    #[test]
    fn test_selection_restarts_after_removal() {
        let mut index = PriorityIndex::with_defaults();
        index.insert(create_tx(0xA1, 0, 30)).unwrap();
        index.insert(create_tx(0xA2, 0, 20)).unwrap();
        index.insert(create_tx(0xA3, 0, 10)).unwrap();

        let doomed: Vec<Hash> = index
            .select()
            .filter(|tx| tx.fee == U256::from(20))
            .map(|tx| tx.hash)
            .collect();
        for hash in &doomed {
            index.remove(hash);
        }

        assert_eq!(fees(&index), vec![30, 10]);
    }

    #[test]
    fn test_empty_selection() {
        let index = PriorityIndex::with_defaults();
        assert_eq!(index.select().count(), 0);
    }

    // =========================================================================
    // INSERT / REMOVE TESTS
    // =========================================================================

    #[test]
    fn test_duplicate_rejected() {
        let mut index = PriorityIndex::with_defaults();
        let tx = create_tx(0xAA, 0, 10);
        index.insert(tx.clone()).unwrap();

        assert_eq!(
            index.insert(tx.clone()),
            Err(MempoolError::DuplicateTransaction(tx.hash))
        );
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_sequence_conflict_rejected() {
        let mut index = PriorityIndex::with_defaults();
        index.insert(create_tx(0xAA, 0, 10)).unwrap();

        let result = index.insert(create_tx(0xAA, 0, 20));
        assert!(matches!(
            result,
            Err(MempoolError::SequenceConflict { sequence: 0, .. })
        ));
    }

    #[test]
    fn test_capacity_rejects_new_inserts() {
        let mut index =
            PriorityIndex::new(IndexConfig::with_capacity(2), Arc::new(FeePriority));
        let low = create_tx(0xA1, 0, 1);
        index.insert(low.clone()).unwrap();
        index.insert(create_tx(0xA2, 0, 2)).unwrap();

        let result = index.insert(create_tx(0xA3, 0, 1000));
        assert!(matches!(result, Err(MempoolError::CapacityExceeded { .. })));

        // Nothing was evicted to make room.
        assert!(index.contains(&low.hash));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut index = PriorityIndex::with_defaults();
        index.insert(create_tx(0xAA, 0, 10)).unwrap();

        assert!(index.remove(&[0xFF; 32]).is_none());
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_remove_cleans_sender_chain() {
        let mut index = PriorityIndex::with_defaults();
        let tx = create_tx(0xAA, 0, 10);
        index.insert(tx.clone()).unwrap();
        assert_eq!(index.sender_count(&tx.sender), 1);

        assert_eq!(index.remove(&tx.hash), Some(tx.clone()));
        assert_eq!(index.sender_count(&tx.sender), 0);
        assert!(!index.contains(&tx.hash));
        assert_eq!(index.status(), IndexStatus::default());
    }

    #[test]
    fn test_status_counts() {
        let mut index = PriorityIndex::with_defaults();
        index.insert(create_tx(0xAA, 0, 10)).unwrap();
        index.insert(create_tx(0xAA, 1, 10)).unwrap();
        index.insert(create_tx(0xBB, 0, 10)).unwrap();

        let status = index.status();
        assert_eq!(status.tx_count, 3);
        assert_eq!(status.sender_count, 2);
        assert_eq!(status.total_bytes, 12);
    }

    // =========================================================================
    // PROPERTY TESTS
    // =========================================================================

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn selection_is_complete_sequenced_and_monotone(
                entries in proptest::collection::vec((0u8..6, 0u64..8, 0u64..1000), 0..40)
            ) {
                let mut index = PriorityIndex::with_defaults();
                for (sender, sequence, fee) in entries {
                    let tx = Transaction::new(
                        vec![sender, sequence as u8, (fee >> 8) as u8, fee as u8],
                        [sender; 20],
                        sequence,
                        U256::from(fee),
                        TxKind::Standard,
                    );
                    let _ = index.insert(tx);
                }

                let selected: Vec<&Transaction> = index.select().collect();
                prop_assert_eq!(selected.len(), index.len());

                let mut last_sequence: HashMap<Address, u64> = HashMap::new();
                let mut last_effective: HashMap<Address, U256> = HashMap::new();
                let mut watermark: Option<U256> = None;
                for tx in selected {
                    if let Some(prev) = last_sequence.insert(tx.sender, tx.sequence) {
                        prop_assert!(tx.sequence > prev);
                    }
                    let effective = match last_effective.get(&tx.sender) {
                        Some(prev) => tx.fee.min(*prev),
                        None => tx.fee,
                    };
                    last_effective.insert(tx.sender, effective);
                    if let Some(mark) = watermark {
                        prop_assert!(effective <= mark);
                    }
                    watermark = Some(effective);
                }
            }
        }
    }
}
