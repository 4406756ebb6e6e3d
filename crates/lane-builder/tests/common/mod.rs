//! Shared fixtures for the block builder integration tests.

#![allow(dead_code)]

use lane_builder::adapters::InMemoryLedger;
use lane_builder::{
    AuctionConfig, BlockBuilder, BuilderConfig, ExecMode, ExecutionContext, LaneConfig, LaneKind,
    SpaceRatio, ValidationFailure,
};
use primitive_types::U256;
use shared_types::{Address, BincodeTxCodec, Hash, Transaction, TxDecoder, WireTransaction};
use std::sync::Arc;

pub const HEIGHT: u64 = 10;
pub const MAX_BYTES: u64 = 100_000;

pub const BIDDER: Address = [0xB1; 20];
pub const RIVAL: Address = [0xB2; 20];

pub fn user(n: u8) -> Address {
    [n; 20]
}

pub fn ratio(numerator: u64, denominator: u64) -> SpaceRatio {
    SpaceRatio::from_fraction(numerator, denominator).unwrap()
}

pub fn auction_config() -> AuctionConfig {
    AuctionConfig {
        reserve_price: U256::from(100),
        min_bid_increment: U256::from(1),
        max_bundle_size: 4,
        front_running_protection: true,
    }
}

/// [auction 50%, default remainder]
pub fn two_lane_config() -> BuilderConfig {
    BuilderConfig {
        lanes: vec![
            LaneConfig::new("auction", LaneKind::Auction, ratio(1, 2)),
            LaneConfig::new("default", LaneKind::Default, SpaceRatio::ZERO),
        ],
        auction: auction_config(),
        ..BuilderConfig::default()
    }
}

/// [auction 20%, free 20%, default remainder]
pub fn three_lane_config() -> BuilderConfig {
    BuilderConfig {
        lanes: vec![
            LaneConfig::new("auction", LaneKind::Auction, ratio(1, 5)),
            LaneConfig::new("free", LaneKind::Free, ratio(1, 5)),
            LaneConfig::new("default", LaneKind::Default, SpaceRatio::ZERO),
        ],
        auction: auction_config(),
        ..BuilderConfig::default()
    }
}

pub fn builder(config: BuilderConfig) -> BlockBuilder {
    BlockBuilder::new(config, Arc::new(BincodeTxCodec)).unwrap()
}

pub fn funded_ledger(accounts: &[Address]) -> InMemoryLedger {
    accounts
        .iter()
        .fold(InMemoryLedger::new(), |ledger, account| {
            ledger.with_balance(*account, 1_000_000)
        })
}

pub fn standard(sender: Address, sequence: u64, fee: u64) -> Vec<u8> {
    WireTransaction::standard(sender, sequence, fee)
        .encode()
        .unwrap()
}

pub fn free(sender: Address, sequence: u64) -> Vec<u8> {
    WireTransaction::free(sender, sequence).encode().unwrap()
}

pub fn bid(bidder: Address, sequence: u64, amount: u64, bundle: Vec<Vec<u8>>) -> Vec<u8> {
    WireTransaction::bid(bidder, sequence, amount, bundle, HEIGHT + 100)
        .encode()
        .unwrap()
}

pub fn decode(bytes: &[u8]) -> Transaction {
    BincodeTxCodec.decode(bytes).unwrap()
}

pub fn hash_of(bytes: &[u8]) -> Hash {
    decode(bytes).hash
}

/// Ledger that panics when it sees one particular transaction.
#[derive(Clone, Debug)]
pub struct Tripwire {
    pub inner: InMemoryLedger,
    pub trip: Option<Hash>,
}

impl Tripwire {
    pub fn new(inner: InMemoryLedger, trip: Option<Hash>) -> Self {
        Self { inner, trip }
    }
}

impl ExecutionContext for Tripwire {
    fn validate_tx(&mut self, tx: &Transaction, mode: ExecMode) -> Result<(), ValidationFailure> {
        if self.trip == Some(tx.hash) {
            panic!("tripwire hit by {}", tx.short_hash());
        }
        self.inner.validate_tx(tx, mode)
    }
}
