//! # Domain Layer - Lane Indices
//!
//! Pure data structures, no I/O.
//!
//! ## Components
//!
//! - `entities`: IndexConfig, IndexedTransaction
//! - `priority_index`: PriorityIndex with lazy sender-sequenced selection
//! - `bid_book`: BidBook ordered by bid amount
//! - `priority`: TxPriority port and FeePriority
//! - `value_objects`: BidKey, SelectionKey, IndexStatus
//! - `errors`: MempoolError enumeration

pub mod bid_book;
pub mod entities;
pub mod errors;
pub mod priority;
pub mod priority_index;
pub mod value_objects;

pub use bid_book::*;
pub use entities::*;
pub use errors::*;
pub use priority::*;
pub use priority_index::*;
pub use value_objects::*;
