//! # Core Domain Entities
//!
//! Defines the decoded transaction view that every lane, index and the
//! auction works against.
//!
//! ## Clusters
//!
//! - **Identity**: `Hash`, `Address`, `Height`
//! - **Transactions**: `Transaction`, `TxKind`, `BidInfo`
//!
//! The encoded bytes are the source of truth; the decoded fields are a
//! read-only view produced by a `TxDecoder`. Two transactions are the same
//! transaction if and only if their content hashes are equal.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// Re-export U256 from primitive-types for use across all crates
pub use primitive_types::U256;

// =============================================================================
// CLUSTER A: IDENTITY
// =============================================================================

/// A 32-byte SHA-256 content hash.
pub type Hash = [u8; 32];

/// A 20-byte account address.
pub type Address = [u8; 20];

/// A block height.
pub type Height = u64;

/// Computes the content hash of an encoded transaction.
pub fn tx_hash(bytes: &[u8]) -> Hash {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

/// Short hex rendering of a hash for log lines.
pub fn short_hash(hash: &Hash) -> String {
    hex::encode(&hash[..4])
}

// =============================================================================
// CLUSTER B: TRANSACTIONS
// =============================================================================

/// Auction payload carried by a bid transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidInfo {
    /// Account paying the bid.
    pub bidder: Address,
    /// Bid amount.
    pub amount: U256,
    /// Encoded transactions that must execute right after the bid, in order.
    pub bundle: Vec<Vec<u8>>,
}

impl BidInfo {
    /// Total encoded size of the bundle.
    pub fn bundle_size(&self) -> usize {
        self.bundle.iter().map(Vec::len).sum()
    }
}

/// Classification of a decoded transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxKind {
    /// Ordinary fee-paying transaction.
    Standard,
    /// Transaction eligible for fee-free block space.
    Free,
    /// Top-of-block auction bid.
    Bid(BidInfo),
}

/// A decoded transaction together with its encoding.
///
/// `hash` is always `tx_hash(&bytes)`; use [`Transaction::new`] to keep the
/// two consistent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// Canonical encoding.
    pub bytes: Vec<u8>,
    /// Content hash of `bytes`.
    pub hash: Hash,
    /// Primary signer; owns the sequence number.
    pub sender: Address,
    /// Per-sender sequence number.
    pub sequence: u64,
    /// Every account that signed the transaction (always includes `sender`).
    pub signers: BTreeSet<Address>,
    /// Fee offered, used as the default priority key.
    pub fee: U256,
    /// Last height at which the transaction may be included (0 = no timeout).
    pub timeout_height: Height,
    /// Classification.
    pub kind: TxKind,
}

impl Transaction {
    /// Creates a transaction view signed only by `sender`.
    pub fn new(bytes: Vec<u8>, sender: Address, sequence: u64, fee: U256, kind: TxKind) -> Self {
        let hash = tx_hash(&bytes);
        let mut signers = BTreeSet::new();
        signers.insert(sender);
        Self {
            bytes,
            hash,
            sender,
            sequence,
            signers,
            fee,
            timeout_height: 0,
            kind,
        }
    }

    /// Adds co-signers to the signer set.
    pub fn with_signers(mut self, extra: impl IntoIterator<Item = Address>) -> Self {
        self.signers.extend(extra);
        self
    }

    /// Sets the timeout height.
    pub fn with_timeout(mut self, timeout_height: Height) -> Self {
        self.timeout_height = timeout_height;
        self
    }

    /// Encoded size in bytes.
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Returns the bid payload if this is a bid.
    pub fn bid(&self) -> Option<&BidInfo> {
        match &self.kind {
            TxKind::Bid(info) => Some(info),
            _ => None,
        }
    }

    /// Returns true if this is a bid.
    pub fn is_bid(&self) -> bool {
        matches!(self.kind, TxKind::Bid(_))
    }

    /// Returns true if this transaction is eligible for free block space.
    pub fn is_free(&self) -> bool {
        matches!(self.kind, TxKind::Free)
    }

    /// Returns true if the transaction has expired at `height`.
    pub fn is_expired(&self, height: Height) -> bool {
        self.timeout_height != 0 && self.timeout_height < height
    }

    /// Short hex rendering of the hash for log lines.
    pub fn short_hash(&self) -> String {
        short_hash(&self.hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_matches_bytes() {
        let tx = Transaction::new(vec![1, 2, 3], [0xAA; 20], 0, U256::from(10), TxKind::Standard);
        assert_eq!(tx.hash, tx_hash(&[1, 2, 3]));
        assert_eq!(tx.size(), 3);
    }

    #[test]
    fn test_sender_is_always_a_signer() {
        let tx = Transaction::new(vec![1], [0xAA; 20], 0, U256::zero(), TxKind::Standard)
            .with_signers([[0xBB; 20]]);
        assert!(tx.signers.contains(&[0xAA; 20]));
        assert!(tx.signers.contains(&[0xBB; 20]));
        assert_eq!(tx.signers.len(), 2);
    }

    #[test]
    fn test_timeout_zero_never_expires() {
        let tx = Transaction::new(vec![1], [0xAA; 20], 0, U256::zero(), TxKind::Standard);
        assert!(!tx.is_expired(1_000_000));

        let tx = tx.with_timeout(10);
        assert!(!tx.is_expired(10));
        assert!(tx.is_expired(11));
    }

    #[test]
    fn test_bid_accessors() {
        let info = BidInfo {
            bidder: [0xAA; 20],
            amount: U256::from(1000),
            bundle: vec![vec![0; 10], vec![0; 5]],
        };
        let tx = Transaction::new(vec![9], [0xAA; 20], 0, U256::zero(), TxKind::Bid(info));
        assert!(tx.is_bid());
        assert_eq!(tx.bid().map(BidInfo::bundle_size), Some(15));
    }
}
