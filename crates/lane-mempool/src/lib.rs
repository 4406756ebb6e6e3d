//! # Lane Mempool
//!
//! Per-lane transaction indices used by the block builder.
//!
//! ## Purpose
//!
//! Holds pending transactions between admission (CheckTx) and inclusion.
//! Each lane of the block owns exactly one index:
//!
//! - [`PriorityIndex`] for ordinary lanes: per-sender sequence chains merged
//!   by a caller-supplied priority, ties broken by content hash.
//! - [`BidBook`] for the auction lane: bids ranked purely by amount.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | No duplicate hashes | `insert()` of both indices |
//! | Strictly increasing sequence per sender | `PriorityIndex::by_sender` BTreeMap keys |
//! | Non-increasing effective priority on select | `Selection::push_successor` clamping |
//! | Capacity rejects, never evicts | `IndexConfig::is_full` check in `insert()` |
//! | Removal is idempotent | `remove()` returns `Option` |
//!
//! ## Module Structure
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  ports/inbound.rs  - TransactionIndex trait                     │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ implemented by ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  domain/priority_index.rs - PriorityIndex, Selection            │
//! │  domain/bid_book.rs       - BidBook                             │
//! │  domain/priority.rs       - TxPriority, FeePriority             │
//! │  domain/value_objects.rs  - BidKey, SelectionKey, IndexStatus   │
//! │  domain/errors.rs         - MempoolError enum                   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod domain;
pub mod ports;

pub use domain::*;
pub use ports::*;
