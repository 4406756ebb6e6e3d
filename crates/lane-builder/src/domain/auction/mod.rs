//! Top-of-block auction: bid terms, bundle checks and winner selection.

pub mod bid;
pub mod bundle;
pub mod engine;

pub use bid::{check_bid_terms, decode_bundle};
pub use bundle::check_signer_continuity;
pub use engine::{AuctionEngine, BidSelection, TopOfBlock};
