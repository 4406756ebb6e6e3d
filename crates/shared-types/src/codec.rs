//! # Transaction Codec
//!
//! The wire format itself is owned by the host application. The builder
//! only needs the [`TxDecoder`] port. [`BincodeTxCodec`] is a reference
//! implementation over [`WireTransaction`] used by tests and local tooling.
//!
//! Encoding is canonical: fixed-width little-endian integers and no
//! trailing bytes, so `decode(encode(x))` reproduces the exact same hash.

use crate::entities::{Address, BidInfo, Height, Transaction, TxKind, U256};
use crate::errors::{DecodeError, EncodeError};
use bincode::Options;
use serde::{Deserialize, Serialize};

/// Port: turn opaque transaction bytes into a decoded view.
pub trait TxDecoder: Send + Sync {
    /// Decodes `bytes`. The returned transaction must carry `bytes` verbatim.
    fn decode(&self, bytes: &[u8]) -> Result<Transaction, DecodeError>;
}

/// Classification on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WireKind {
    /// Ordinary fee-paying transaction.
    Standard,
    /// Fee-free transaction.
    Free,
    /// Auction bid with its bundle.
    Bid {
        /// Account paying the bid.
        bidder: Address,
        /// Bid amount.
        amount: U256,
        /// Encoded bundled transactions.
        bundle: Vec<Vec<u8>>,
    },
}

/// Reference wire layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireTransaction {
    /// Primary signer.
    pub sender: Address,
    /// Sender sequence number.
    pub sequence: u64,
    /// Co-signers besides `sender`.
    pub co_signers: Vec<Address>,
    /// Fee offered.
    pub fee: U256,
    /// Timeout height (0 = none).
    pub timeout_height: Height,
    /// Classification.
    pub kind: WireKind,
    /// Free-form payload.
    pub memo: Vec<u8>,
}

fn wire_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .reject_trailing_bytes()
}

impl WireTransaction {
    /// Creates a standard transaction.
    pub fn standard(sender: Address, sequence: u64, fee: u64) -> Self {
        Self {
            sender,
            sequence,
            co_signers: Vec::new(),
            fee: U256::from(fee),
            timeout_height: 0,
            kind: WireKind::Standard,
            memo: Vec::new(),
        }
    }

    /// Creates a fee-free transaction.
    pub fn free(sender: Address, sequence: u64) -> Self {
        Self {
            kind: WireKind::Free,
            ..Self::standard(sender, sequence, 0)
        }
    }

    /// Creates a bid signed by `bidder`.
    pub fn bid(
        bidder: Address,
        sequence: u64,
        amount: u64,
        bundle: Vec<Vec<u8>>,
        timeout_height: Height,
    ) -> Self {
        Self {
            timeout_height,
            kind: WireKind::Bid {
                bidder,
                amount: U256::from(amount),
                bundle,
            },
            ..Self::standard(bidder, sequence, 0)
        }
    }

    /// Attaches a memo, mostly to make otherwise identical payloads distinct.
    pub fn with_memo(mut self, memo: impl Into<Vec<u8>>) -> Self {
        self.memo = memo.into();
        self
    }

    /// Adds co-signers.
    pub fn with_co_signers(mut self, co_signers: Vec<Address>) -> Self {
        self.co_signers = co_signers;
        self
    }

    /// Encodes canonically.
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        wire_options()
            .serialize(self)
            .map_err(|e| EncodeError(e.to_string()))
    }

    /// Decodes canonically.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.is_empty() {
            return Err(DecodeError::Empty);
        }
        wire_options()
            .deserialize(bytes)
            .map_err(|e| DecodeError::Malformed(e.to_string()))
    }
}

/// Reference decoder for [`WireTransaction`] bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeTxCodec;

impl TxDecoder for BincodeTxCodec {
    fn decode(&self, bytes: &[u8]) -> Result<Transaction, DecodeError> {
        let wire = WireTransaction::decode(bytes)?;

        let kind = match wire.kind {
            WireKind::Standard => TxKind::Standard,
            WireKind::Free => TxKind::Free,
            WireKind::Bid {
                bidder,
                amount,
                bundle,
            } => {
                if bidder != wire.sender {
                    return Err(DecodeError::InvalidField {
                        field: "bidder",
                        reason: "bidder must be the transaction sender".to_string(),
                    });
                }
                if bundle.iter().any(Vec::is_empty) {
                    return Err(DecodeError::InvalidField {
                        field: "bundle",
                        reason: "bundle contains an empty transaction".to_string(),
                    });
                }
                TxKind::Bid(BidInfo {
                    bidder,
                    amount,
                    bundle,
                })
            }
        };

        Ok(
            Transaction::new(bytes.to_vec(), wire.sender, wire.sequence, wire.fee, kind)
                .with_signers(wire.co_signers)
                .with_timeout(wire.timeout_height),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::tx_hash;

    #[test]
    fn test_decode_keeps_bytes_and_hash() {
        let bytes = WireTransaction::standard([0xAA; 20], 3, 50).encode().unwrap();
        let tx = BincodeTxCodec.decode(&bytes).unwrap();

        assert_eq!(tx.bytes, bytes);
        assert_eq!(tx.hash, tx_hash(&bytes));
        assert_eq!(tx.sequence, 3);
        assert_eq!(tx.fee, U256::from(50));
        assert_eq!(tx.kind, TxKind::Standard);
    }

    #[test]
    fn test_truncated_bytes_fail_to_decode() {
        let bytes = WireTransaction::standard([0xAA; 20], 3, 50).encode().unwrap();
        let result = BincodeTxCodec.decode(&bytes[..bytes.len() - 1]);
        assert!(matches!(result, Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = WireTransaction::standard([0xAA; 20], 3, 50).encode().unwrap();
        bytes.push(0);
        assert!(BincodeTxCodec.decode(&bytes).is_err());
    }

    #[test]
    fn test_empty_bytes_rejected() {
        assert_eq!(BincodeTxCodec.decode(&[]), Err(DecodeError::Empty));
    }

    #[test]
    fn test_bid_decodes_with_bundle() {
        let inner = WireTransaction::standard([0xBB; 20], 0, 1).encode().unwrap();
        let bytes = WireTransaction::bid([0xAA; 20], 0, 1000, vec![inner.clone()], 10)
            .encode()
            .unwrap();

        let tx = BincodeTxCodec.decode(&bytes).unwrap();
        let bid = tx.bid().unwrap();
        assert_eq!(bid.bidder, [0xAA; 20]);
        assert_eq!(bid.amount, U256::from(1000));
        assert_eq!(bid.bundle, vec![inner]);
        assert_eq!(tx.timeout_height, 10);
    }

    #[test]
    fn test_bid_from_other_sender_rejected() {
        let mut wire = WireTransaction::bid([0xAA; 20], 0, 1000, vec![], 10);
        wire.sender = [0xBB; 20];
        let bytes = wire.encode().unwrap();
        assert!(matches!(
            BincodeTxCodec.decode(&bytes),
            Err(DecodeError::InvalidField { field: "bidder", .. })
        ));
    }

    #[test]
    fn test_co_signers_are_signers() {
        let bytes = WireTransaction::standard([0xAA; 20], 0, 1)
            .with_co_signers(vec![[0xCC; 20]])
            .encode()
            .unwrap();
        let tx = BincodeTxCodec.decode(&bytes).unwrap();
        assert_eq!(tx.signers.len(), 2);
        assert!(tx.signers.contains(&[0xCC; 20]));
    }
}
