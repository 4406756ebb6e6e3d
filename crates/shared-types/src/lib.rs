//! # Shared Types Crate
//!
//! Domain entities shared by the lane indices and the block builder.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: the decoded `Transaction` view and the
//!   `Hash`/`Address` aliases are defined once, here.
//! - **Bytes Are Identity**: a transaction is identified by the SHA-256 of
//!   its encoding everywhere (index membership, proposal dedup, removal).
//! - **Wire Format Is External**: decoding goes through the `TxDecoder`
//!   port; `BincodeTxCodec` is only a reference implementation.

pub mod codec;
pub mod entities;
pub mod errors;

pub use codec::*;
pub use entities::*;
pub use errors::*;
