//! # Domain Layer - Block Construction
//!
//! ## Components
//!
//! - `proposal`: Proposal accumulator and the slot-0 record
//! - `lane`: Lane definition and its index
//! - `chain`: Ordered lane chain, prepare and process passes
//! - `auction`: Bid verification and top-of-block selection
//! - `invariants`: Ordering and top-of-block checks used by process

pub mod auction;
pub mod chain;
pub mod invariants;
pub mod lane;
pub mod proposal;

pub use auction::*;
pub use chain::*;
pub use invariants::*;
pub use lane::*;
pub use proposal::*;
