//! # Auction Engine
//!
//! Derives the top-of-block segment from the previous height's vote
//! extensions. Proposer and verifiers run the same derivation, so the winner
//! depends only on the extensions and the ledger state.

use super::bid::{check_bid_terms, decode_bundle};
use super::bundle::check_signer_continuity;
use crate::config::AuctionConfig;
use crate::error::{BlockBuilderError, Result};
use crate::ports::{ExecMode, ExecutionContext};
use lane_mempool::BidKey;
use primitive_types::U256;
use shared_types::{short_hash, tx_hash, Hash, Height, Transaction, TxDecoder};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Winning bid followed by its bundle, in execution order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TopOfBlock {
    /// The winning bid
    pub bid: Transaction,
    /// Decoded bundle, in bundle order
    pub bundle: Vec<Transaction>,
}

impl TopOfBlock {
    /// Bid then bundle.
    pub fn transactions(&self) -> impl Iterator<Item = &Transaction> {
        std::iter::once(&self.bid).chain(self.bundle.iter())
    }

    /// Encoded segment as it appears after the record.
    pub fn encoded(&self) -> Vec<Vec<u8>> {
        self.transactions().map(|tx| tx.bytes.clone()).collect()
    }

    /// Number of transactions in the segment.
    pub fn len(&self) -> usize {
        1 + self.bundle.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Segment size in bytes.
    pub fn size(&self) -> u64 {
        self.transactions().map(Transaction::size).sum()
    }
}

/// Outcome of [`AuctionEngine::select_top_bid`].
#[derive(Debug)]
pub struct BidSelection<C> {
    /// Winner with the context it left behind
    pub winner: Option<(TopOfBlock, C)>,
    /// Bids that failed verification
    pub failed: Vec<Hash>,
}

/// Bid extraction, verification and winner selection.
pub struct AuctionEngine {
    config: AuctionConfig,
    decoder: Arc<dyn TxDecoder>,
}

impl std::fmt::Debug for AuctionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuctionEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AuctionEngine {
    /// Creates an engine.
    pub fn new(config: AuctionConfig, decoder: Arc<dyn TxDecoder>) -> Self {
        Self { config, decoder }
    }

    /// Auction rules in force.
    pub fn config(&self) -> &AuctionConfig {
        &self.config
    }

    /// Decodes vote extensions into candidate bids.
    ///
    /// Empty extensions, undecodable ones and non-bids are dropped; repeated
    /// bids are kept once.
    pub fn extract_bids(&self, vote_extensions: &[Vec<u8>]) -> Vec<Transaction> {
        let mut seen = HashSet::new();
        let mut bids = Vec::new();

        for (index, bytes) in vote_extensions.iter().enumerate() {
            if bytes.is_empty() {
                continue;
            }
            match self.decoder.decode(bytes) {
                Ok(tx) if tx.is_bid() => {
                    if seen.insert(tx.hash) {
                        bids.push(tx);
                    }
                }
                Ok(tx) => {
                    debug!(index, tx = %tx.short_hash(), "[auction] vote extension is not a bid");
                }
                Err(e) => {
                    debug!(index, error = %e, "[auction] undecodable vote extension");
                }
            }
        }

        bids
    }

    /// Verifies a bid and its bundle against `ctx`, applying their effects.
    ///
    /// Order: auction terms, bundle decoding, signer continuity, then the bid
    /// and each bundled transaction through the ledger. Callers pass a branch
    /// and drop it on error.
    pub fn verify_bid<C: ExecutionContext>(
        &self,
        ctx: &mut C,
        tx: &Transaction,
        height: Height,
        mode: ExecMode,
        previous_top: Option<U256>,
    ) -> Result<Vec<Transaction>> {
        let bid = check_bid_terms(&self.config, tx, height, previous_top)?;
        let bundle = decode_bundle(self.decoder.as_ref(), tx, bid)?;

        if self.config.front_running_protection {
            let signers: Vec<_> = bundle.iter().map(|t| &t.signers).collect();
            check_signer_continuity(&bid.bidder, &signers)?;
        }

        if let Some(expired) = bundle.iter().find(|t| t.is_expired(height)) {
            return Err(BlockBuilderError::Validation {
                tx: expired.short_hash(),
                reason: format!("bundled transaction expired at height {height}"),
            });
        }

        for t in std::iter::once(tx).chain(bundle.iter()) {
            ctx.validate_tx(t, mode)
                .map_err(|e| BlockBuilderError::Validation {
                    tx: t.short_hash(),
                    reason: e.reason,
                })?;
        }

        Ok(bundle)
    }

    /// Picks the highest bid that fits in `max_bytes` and verifies.
    ///
    /// Candidates are tried by amount descending, hash ascending. A bid too
    /// large for the budget is skipped without penalty. A bid that fails
    /// verification is reported in `failed`, and its bundled transactions
    /// may not be reused by a lower bid in the same derivation.
    pub fn select_top_bid<C: ExecutionContext>(
        &self,
        ctx: &C,
        mut candidates: Vec<Transaction>,
        height: Height,
        max_bytes: u64,
        mode: ExecMode,
    ) -> BidSelection<C> {
        let key = |tx: &Transaction| {
            BidKey::new(tx.bid().map(|b| b.amount).unwrap_or_default(), tx.hash)
        };
        candidates.sort_by(|a, b| key(a).cmp(&key(b)));
        candidates.dedup_by(|a, b| a.hash == b.hash);

        let mut failed = Vec::new();
        let mut burned: HashSet<Hash> = HashSet::new();

        for candidate in candidates {
            let Some(bid) = candidate.bid() else {
                continue;
            };

            let size = candidate.size() + bid.bundle_size() as u64;
            if size > max_bytes {
                debug!(
                    bid = %candidate.short_hash(),
                    size,
                    max_bytes,
                    "[auction] bid does not fit"
                );
                continue;
            }

            let bundle_hashes: Vec<Hash> = bid.bundle.iter().map(|b| tx_hash(b)).collect();
            if bundle_hashes.iter().any(|h| burned.contains(h)) {
                debug!(
                    bid = %candidate.short_hash(),
                    "[auction] bundle reuses transactions of a failed bid"
                );
                continue;
            }

            let mut branch = ctx.clone();
            match self.verify_bid(&mut branch, &candidate, height, mode, None) {
                Ok(bundle) => {
                    debug!(
                        bid = %candidate.short_hash(),
                        amount = %bid.amount,
                        bundle_len = bundle.len(),
                        "[auction] top bid selected"
                    );
                    let tob = TopOfBlock {
                        bid: candidate,
                        bundle,
                    };
                    return BidSelection {
                        winner: Some((tob, branch)),
                        failed,
                    };
                }
                Err(e) => {
                    debug!(
                        bid = %candidate.short_hash(),
                        error = %e,
                        "[auction] bid failed verification"
                    );
                    burned.extend(bundle_hashes);
                    failed.push(candidate.hash);
                }
            }
        }

        BidSelection {
            winner: None,
            failed,
        }
    }

    /// Re-derives the top of block from `vote_extensions` and compares it with
    /// the proposal's claimed segment.
    pub fn verify_top_of_block<C: ExecutionContext>(
        &self,
        ctx: &C,
        vote_extensions: &[Vec<u8>],
        claimed: &[Vec<u8>],
        height: Height,
        max_bytes: u64,
    ) -> Result<Option<(TopOfBlock, C)>> {
        let candidates = self.extract_bids(vote_extensions);
        let selection = self.select_top_bid(ctx, candidates, height, max_bytes, ExecMode::Process);

        let expected = selection
            .winner
            .as_ref()
            .map(|(tob, _)| tob.encoded())
            .unwrap_or_default();
        crate::domain::invariants::check_top_of_block(&expected, claimed)?;

        if let Some((tob, _)) = &selection.winner {
            debug!(
                bid = %short_hash(&tob.bid.hash),
                count = tob.len(),
                "[auction] top of block verified"
            );
        }
        Ok(selection.winner)
    }
}
