//! # Lane Builder - Validator Block Construction Engine
//!
//! ## Purpose
//!
//! Builds and verifies block proposals for a validator. The block is split
//! into ordered lanes, each with its own mempool index, admission predicate
//! and share of the block's byte budget. The first lane is a top-of-block
//! auction: searchers bid for the right to place a bundle of transactions
//! at the head of the block, and the winning bid is derived from the
//! previous height's vote extensions so every validator reaches the same
//! answer.
//!
//! ## Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │  Service                                            │
//! │  - BlockBuilder: prepare / process / vote ext.      │
//! │  - CheckTx, precommit eviction, commit cleanup      │
//! └─────────────────────────────────────────────────────┘
//!                         │
//! ┌─────────────────────────────────────────────────────┐
//! │  Ports                                              │
//! │  - Inbound: ProposalHandler, VoteExtensionHandler   │
//! │  - Outbound: ExecutionContext (ledger branch)       │
//! └─────────────────────────────────────────────────────┘
//!                         │
//! ┌─────────────────────────────────────────────────────┐
//! │  Domain                                             │
//! │  - LaneChain, Lane, Proposal, ProposalInfo          │
//! │  - AuctionEngine, signer continuity                 │
//! │  - Invariants: ordering, top-of-block match         │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Proposal Layout
//!
//! ```text
//! [ record | bid | bundle... | lane 1 txs | lane 2 txs | ... ]
//! ```
//!
//! Slot 0 carries a [`domain::ProposalInfo`] record: the vote extensions the
//! auction ran on, the number of top-of-block transactions that follow, the
//! proposer's byte limit, and the number of transactions in the proposal.
//! When even a bare record exceeds the byte limit the proposal is empty.
//!
//! ## Critical Invariants
//!
//! 1. **Byte Budget**: record plus transactions never exceed `max_bytes`
//! 2. **Lane Budget**: a lane never exceeds its ratio of `max_bytes`
//! 3. **Partition**: each transaction is claimed by exactly one lane
//! 4. **No Duplicates**: a hash appears at most once per proposal
//! 5. **Deterministic Auction**: the same extensions and state pick the same winner
//! 6. **Bundle Safety**: a bundle may not sandwich other signers around the bidder
//! 7. **Lane Isolation**: a failing or panicking lane only loses its own segment
//! 8. **All or Nothing**: ProcessProposal accepts only if every check passes
//!
//! ## Module Structure
//!
//! - [`domain`]: Lanes, proposal accumulator, auction engine
//! - [`ports`]: Consensus-facing handlers and the ledger port
//! - [`adapters`]: In-memory ledger
//! - [`service`]: `BlockBuilder`, the composition of all of the above
//! - [`logging`]: tracing subscriber setup

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Ledger adapters
pub mod adapters;
/// Domain models and block construction logic
pub mod domain;
pub mod logging;
pub mod ports;
pub mod service;

mod config;
mod error;
mod metrics;

pub use config::{
    AuctionConfig, BuilderConfig, LaneConfig, LaneKind, LoggingConfig, SpaceRatio,
};
pub use error::{BidRejection, BlockBuilderError, InvariantViolation, Result};
pub use metrics::Metrics;

pub use domain::{
    check_signer_continuity, AuctionEngine, Lane, LaneChain, LaneOutcome, LaneReport, Proposal,
    ProposalInfo, TopOfBlock,
};

pub use ports::{
    ExecMode, ExecutionContext, PrepareRequest, ProposalHandler, ProposalStatus,
    ValidationFailure, VoteExtensionHandler,
};

pub use service::BlockBuilder;

/// Default auction reserve price
pub const DEFAULT_RESERVE_PRICE: u64 = 1;

/// Default amount a new bid must add over the current top bid
pub const DEFAULT_MIN_BID_INCREMENT: u64 = 1;

/// Default maximum number of transactions in a bundle
pub const DEFAULT_MAX_BUNDLE_SIZE: usize = 16;
