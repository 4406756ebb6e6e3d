//! Block Builder Service
//!
//! Owns the lane chain, the auction engine and the metrics, and implements
//! the consensus callbacks (PrepareProposal, ProcessProposal, vote
//! extensions) plus the mempool hooks used by CheckTx, precommit eviction and
//! commit cleanup.
//!
//! Every method takes `&self`; lane indices synchronize internally, so one
//! builder can be shared between the admission path and consensus.

use crate::config::{BuilderConfig, LaneKind};
use crate::domain::{
    check_top_of_block, panic_message, AuctionEngine, LaneChain, LaneIndex, LaneOutcome,
    Proposal, ProposalInfo,
};
use crate::error::{BidRejection, BlockBuilderError, InvariantViolation, Result};
use crate::metrics::Metrics;
use crate::ports::{
    ExecMode, ExecutionContext, PrepareRequest, ProposalHandler, ProposalStatus,
    VoteExtensionHandler,
};
use lane_mempool::{FeePriority, IndexStatus, MempoolError, TxPriority};
use shared_types::{short_hash, tx_hash, DecodeError, Hash, Height, Transaction, TxDecoder};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Block builder for one validator.
pub struct BlockBuilder {
    config: BuilderConfig,
    chain: LaneChain,
    auction: AuctionEngine,
    decoder: Arc<dyn TxDecoder>,
    metrics: Metrics,
}

impl std::fmt::Debug for BlockBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockBuilder")
            .field("chain", &self.chain)
            .field("auction", &self.auction)
            .finish_non_exhaustive()
    }
}

impl BlockBuilder {
    /// Creates a builder ordering lanes by fee.
    pub fn new(config: BuilderConfig, decoder: Arc<dyn TxDecoder>) -> Result<Self> {
        Self::with_priority(config, decoder, Arc::new(FeePriority))
    }

    /// Creates a builder with a custom priority for the ordinary lanes.
    pub fn with_priority(
        config: BuilderConfig,
        decoder: Arc<dyn TxDecoder>,
        priority: Arc<dyn TxPriority>,
    ) -> Result<Self> {
        let chain = LaneChain::from_config(&config, priority)?;
        let auction = AuctionEngine::new(config.auction.clone(), Arc::clone(&decoder));

        info!(
            lanes = ?chain.lanes().iter().map(|l| l.name()).collect::<Vec<_>>(),
            "[builder] block builder initialized"
        );

        Ok(Self {
            config,
            chain,
            auction,
            decoder,
            metrics: Metrics::new(),
        })
    }

    /// Configuration in force.
    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Lane chain.
    pub fn chain(&self) -> &LaneChain {
        &self.chain
    }

    /// Auction engine.
    pub fn auction(&self) -> &AuctionEngine {
        &self.auction
    }

    /// Metrics.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Status of a lane's index.
    pub fn lane_status(&self, name: &str) -> Option<IndexStatus> {
        self.chain.lane(name).map(|lane| lane.status())
    }

    // =========================================================================
    // Mempool
    // =========================================================================

    /// Inserts into the single lane whose `Match` holds; returns its name.
    pub fn insert(&self, tx: Transaction) -> Result<String> {
        let pos = self
            .chain
            .route(&tx)
            .ok_or_else(|| BlockBuilderError::Validation {
                tx: tx.short_hash(),
                reason: "no lane claims the transaction".to_string(),
            })?;
        let lane = &self.chain.lanes()[pos];
        lane.insert(tx)?;
        Ok(lane.name().to_string())
    }

    /// Removes from whichever lane holds `hash`.
    pub fn remove(&self, hash: &Hash) -> Option<Transaction> {
        self.chain.lanes().iter().find_map(|lane| lane.remove(hash))
    }

    /// Checks every lane.
    pub fn contains(&self, hash: &Hash) -> bool {
        self.chain.lanes().iter().any(|lane| lane.contains(hash))
    }

    /// Admission path.
    ///
    /// `ctx` is the caller's check state; on success it receives the
    /// transaction's effects. Bids are verified with their bundle on a
    /// scratch branch and must outbid the local top bid; only the bid itself
    /// is applied to `ctx`. `height` is the next height to be proposed.
    #[tracing::instrument(skip(self, ctx, bytes), fields(len = bytes.len()))]
    pub fn check_tx<C: ExecutionContext>(
        &self,
        ctx: &mut C,
        height: Height,
        bytes: &[u8],
    ) -> Result<Hash> {
        let tx = self.decoder.decode(bytes)?;
        if self.contains(&tx.hash) {
            return Err(MempoolError::DuplicateTransaction(tx.hash).into());
        }

        if tx.is_bid() {
            let top = self.chain.auction_lane().and_then(|lane| match &*lane.read() {
                LaneIndex::Bids(book) => book.top_amount(),
                LaneIndex::Priority(_) => None,
            });
            let mut scratch = ctx.clone();
            self.auction
                .verify_bid(&mut scratch, &tx, height, ExecMode::CheckTx, top)?;
        } else if tx.is_expired(height) {
            return Err(BlockBuilderError::Validation {
                tx: tx.short_hash(),
                reason: format!("expired at height {height}"),
            });
        }

        let mut branch = ctx.clone();
        branch
            .validate_tx(&tx, ExecMode::CheckTx)
            .map_err(|e| BlockBuilderError::Validation {
                tx: tx.short_hash(),
                reason: e.reason,
            })?;

        let hash = tx.hash;
        let lane = self.insert(tx)?;
        *ctx = branch;

        debug!(tx = %short_hash(&hash), %lane, "[builder] transaction admitted");
        Ok(hash)
    }

    /// Precommit hook: re-validates every resident transaction against `ctx`
    /// and removes those that fail or no longer match their lane.
    ///
    /// All lanes replay on one scratch branch, bids first and then the
    /// ordinary lanes in chain order, mirroring how CheckTx admitted them. A
    /// surviving bid applies only itself, so a bidder's follow-up
    /// transactions stay valid. Transactions that fail are retried while the
    /// replay keeps making progress, so a sender whose chain spans lanes in
    /// the opposite order is not evicted. Returns the number evicted.
    pub fn evict_stale<C: ExecutionContext>(&self, ctx: &C, height: Height) -> usize {
        let lanes = self.chain.lanes();
        let order = (0..lanes.len())
            .filter(|&pos| lanes[pos].kind() == LaneKind::Auction)
            .chain((0..lanes.len()).filter(|&pos| lanes[pos].kind() != LaneKind::Auction));

        let mut stale: Vec<Vec<Hash>> = vec![Vec::new(); lanes.len()];
        let mut pending: Vec<(usize, Transaction)> = Vec::new();
        for pos in order {
            let snapshot = lanes[pos].read().ordered();
            for tx in snapshot {
                if self.chain.lane_matches(pos, &tx) {
                    pending.push((pos, tx));
                } else {
                    stale[pos].push(tx.hash);
                }
            }
        }

        let mut scratch = ctx.clone();
        loop {
            let before = pending.len();
            pending.retain(|(_, tx)| self.recheck(&mut scratch, tx, height).is_err());
            if pending.len() == before {
                break;
            }
        }
        for (pos, tx) in &pending {
            debug!(tx = %tx.short_hash(), lane = %lanes[*pos].name(), "[builder] recheck failed");
            stale[*pos].push(tx.hash);
        }

        let mut evicted = 0;
        for (lane, hashes) in lanes.iter().zip(&stale) {
            let removed = lane.remove_all(hashes);
            if removed > 0 {
                debug!(lane = %lane.name(), removed, "[builder] evicted stale transactions");
            }
            evicted += removed;
        }

        self.metrics.record_txs_evicted(evicted);
        info!(height, evicted, "[builder] precommit eviction complete");
        evicted
    }

    /// Re-validates one resident transaction on `scratch`, applying it only
    /// on success.
    fn recheck<C: ExecutionContext>(
        &self,
        scratch: &mut C,
        tx: &Transaction,
        height: Height,
    ) -> Result<()> {
        if tx.is_bid() {
            let mut bundle_branch = scratch.clone();
            self.auction
                .verify_bid(&mut bundle_branch, tx, height, ExecMode::Recheck, None)?;
        } else if tx.is_expired(height) {
            return Err(BlockBuilderError::Validation {
                tx: tx.short_hash(),
                reason: format!("expired at height {height}"),
            });
        }

        let mut branch = scratch.clone();
        branch
            .validate_tx(tx, ExecMode::Recheck)
            .map_err(|e| BlockBuilderError::Validation {
                tx: tx.short_hash(),
                reason: e.reason,
            })?;
        *scratch = branch;
        Ok(())
    }

    /// Removes every transaction of a committed block, and every bundled
    /// transaction of a committed bid, from the lanes.
    pub fn on_block_committed(&self, txs: &[Vec<u8>]) -> usize {
        let mut hashes: Vec<Hash> = Vec::with_capacity(txs.len());
        for bytes in txs {
            hashes.push(tx_hash(bytes));
            if let Ok(tx) = self.decoder.decode(bytes) {
                if let Some(bid) = tx.bid() {
                    hashes.extend(bid.bundle.iter().map(|b| tx_hash(b)));
                }
            }
        }

        let removed = self
            .chain
            .lanes()
            .iter()
            .map(|lane| lane.remove_all(&hashes))
            .sum();
        debug!(removed, "[builder] committed transactions removed");
        removed
    }

    // =========================================================================
    // Proposal internals
    // =========================================================================

    /// Reserves the record; falls back to an empty extension set when the
    /// full record does not fit.
    fn reserve_record(&self, proposal: &mut Proposal, info: &mut ProposalInfo) -> Result<()> {
        let len = info.encoded_len()?;
        if proposal.reserve_record(len).is_ok() {
            return Ok(());
        }
        warn!(
            len,
            max_bytes = proposal.max_bytes(),
            "[builder] vote extensions do not fit, proposing without top of block"
        );
        info.vote_extensions.clear();
        let len = info.encoded_len()?;
        proposal.reserve_record(len)
    }

    fn verify_proposal<C: ExecutionContext>(
        &self,
        ctx: &C,
        height: Height,
        txs: &[Vec<u8>],
    ) -> Result<usize> {
        let (record, rest) = txs
            .split_first()
            .ok_or(InvariantViolation::MissingRecord)?;
        let info = ProposalInfo::decode(record)?;

        if let Some(cap) = self.config.max_block_bytes_cap {
            if info.max_bytes > cap {
                return Err(InvariantViolation::MaxBytesAboveCap {
                    max_bytes: info.max_bytes,
                    cap,
                }
                .into());
            }
        }

        if info.tx_count != rest.len() as u64 {
            return Err(InvariantViolation::TransactionCountMismatch {
                claimed: info.tx_count,
                actual: rest.len(),
            }
            .into());
        }

        let mut proposal = Proposal::new(info.max_bytes);
        proposal.reserve_record(record.len() as u64)?;

        let count = usize::try_from(info.top_of_block_count)
            .ok()
            .filter(|&count| count <= rest.len())
            .ok_or_else(|| InvariantViolation::TopOfBlockMismatch {
                reason: format!(
                    "record claims {} transactions, proposal has {}",
                    info.top_of_block_count,
                    rest.len()
                ),
            })?;
        let (claimed, remaining) = rest.split_at(count);

        let mut overlay = ctx.clone();
        match self.chain.auction_lane() {
            Some(lane) => {
                let limit = proposal.lane_limit(lane.ratio());
                let winner = self.auction.verify_top_of_block(
                    ctx,
                    &info.vote_extensions,
                    claimed,
                    height,
                    limit,
                )?;
                if let Some((tob, branch)) = winner {
                    let segment: Vec<Transaction> = tob.transactions().cloned().collect();
                    proposal.admit(lane.name(), lane.ratio(), &segment)?;
                    overlay = branch;
                }
            }
            None => check_top_of_block(&[], claimed)?,
        }

        let decoded = remaining
            .iter()
            .map(|bytes| self.decoder.decode(bytes))
            .collect::<std::result::Result<Vec<_>, DecodeError>>()?;

        self.chain
            .process(&mut overlay, &mut proposal, &decoded, height)?;
        Ok(proposal.len())
    }
}

impl<C: ExecutionContext> ProposalHandler<C> for BlockBuilder {
    #[tracing::instrument(
        skip(self, ctx, request),
        fields(height = request.height, max_bytes = request.max_bytes)
    )]
    fn prepare_proposal(&self, ctx: &mut C, request: PrepareRequest) -> Vec<Vec<u8>> {
        let PrepareRequest {
            height,
            max_bytes,
            vote_extensions,
        } = request;

        let mut proposal = Proposal::new(max_bytes);
        let mut info = ProposalInfo {
            vote_extensions,
            top_of_block_count: 0,
            max_bytes,
            tx_count: 0,
        };
        if let Err(e) = self.reserve_record(&mut proposal, &mut info) {
            self.metrics.record_prepared(0, false);
            warn!(height, max_bytes, error = %e, "[builder] record does not fit, proposing nothing");
            return Vec::new();
        }

        let mut overlay = ctx.clone();

        if let Some(lane) = self.chain.auction_lane() {
            let limit = proposal.lane_limit(lane.ratio());
            let attempt = panic::catch_unwind(AssertUnwindSafe(|| {
                let candidates = self.auction.extract_bids(&info.vote_extensions);
                self.auction
                    .select_top_bid(&overlay, candidates, height, limit, ExecMode::Prepare)
            }));

            match attempt {
                Ok(selection) => {
                    let removed = lane.remove_all(&selection.failed);
                    self.metrics.record_bids_evicted(removed);

                    if let Some((tob, branch)) = selection.winner {
                        let segment: Vec<Transaction> = tob.transactions().cloned().collect();
                        match proposal.admit(lane.name(), lane.ratio(), &segment) {
                            Ok(()) => {
                                overlay = branch;
                                info.top_of_block_count = segment.len() as u64;
                            }
                            Err(e) => {
                                self.metrics.record_lane_failure(false);
                                warn!(error = %e, "[auction] top of block discarded");
                            }
                        }
                    }
                }
                Err(payload) => {
                    self.metrics.record_lane_failure(true);
                    error!(
                        lane = %lane.name(),
                        message = %panic_message(payload),
                        "[auction] auction panicked during prepare"
                    );
                }
            }
        }

        for report in self.chain.prepare(&mut overlay, &mut proposal, height) {
            match report.outcome {
                LaneOutcome::Committed { .. } => {}
                LaneOutcome::Failed(_) => self.metrics.record_lane_failure(false),
                LaneOutcome::Panicked(_) => self.metrics.record_lane_failure(true),
            }
        }

        *ctx = overlay;

        info.tx_count = proposal.len() as u64;
        let record = match info.encode() {
            Ok(record) => record,
            Err(e) => {
                error!(error = %e, "[builder] failed to encode proposal record");
                Vec::new()
            }
        };

        let total_bytes = proposal.total_bytes();
        let won = info.top_of_block_count > 0;
        self.metrics.record_prepared(total_bytes, won);
        info!(
            height,
            txs = proposal.len(),
            top_of_block = info.top_of_block_count,
            total_bytes,
            max_bytes,
            "[builder] proposal prepared"
        );

        proposal.into_txs(record)
    }

    #[tracing::instrument(skip(self, ctx, txs), fields(txs = txs.len()))]
    fn process_proposal(&self, ctx: &C, height: Height, txs: &[Vec<u8>]) -> ProposalStatus {
        let attempt =
            panic::catch_unwind(AssertUnwindSafe(|| self.verify_proposal(ctx, height, txs)));

        let result = match attempt {
            Ok(result) => result,
            Err(payload) => Err(BlockBuilderError::PanicRecovered {
                scope: "process_proposal".to_string(),
                message: panic_message(payload),
            }),
        };

        let status = match result {
            Ok(count) => {
                info!(height, txs = count, "[builder] proposal accepted");
                ProposalStatus::Accept
            }
            Err(e) => {
                if e.is_hard_reject() {
                    warn!(height, error = %e, "[builder] proposal rejected: invariant broken");
                } else {
                    warn!(height, error = %e, "[builder] proposal rejected");
                }
                ProposalStatus::Reject
            }
        };

        self.metrics.record_processed(status.is_accept());
        status
    }
}

impl<C: ExecutionContext> VoteExtensionHandler<C> for BlockBuilder {
    /// `height` is the height being voted on; bids are checked for inclusion
    /// at `height + 1`.
    fn extend_vote(&self, ctx: &C, height: Height) -> Vec<u8> {
        let Some(lane) = self.chain.auction_lane() else {
            return Vec::new();
        };

        let bids = lane.read().ordered();
        for bid in bids {
            let mut scratch = ctx.clone();
            match self
                .auction
                .verify_bid(&mut scratch, &bid, height + 1, ExecMode::VoteExtension, None)
            {
                Ok(_) => {
                    debug!(bid = %bid.short_hash(), "[auction] bid attached to vote");
                    return bid.bytes;
                }
                Err(e) => {
                    debug!(bid = %bid.short_hash(), error = %e, "[auction] bid skipped for vote");
                }
            }
        }
        Vec::new()
    }

    fn verify_vote_extension(&self, ctx: &C, height: Height, extension: &[u8]) -> Result<()> {
        if extension.is_empty() {
            return Ok(());
        }
        let tx = self.decoder.decode(extension)?;
        if !tx.is_bid() {
            return Err(BidRejection::NotABid.into());
        }
        let mut scratch = ctx.clone();
        self.auction
            .verify_bid(&mut scratch, &tx, height + 1, ExecMode::VoteExtension, None)
            .map(|_| ())
    }
}
