//! # Lane Chain
//!
//! Ordered lanes applied one after another, for both proposal preparation and
//! proposal verification.
//!
//! ## Prepare
//!
//! Each lane fills a segment on its own branch of the running context,
//! inside `catch_unwind`. A segment that is admitted to the proposal replaces
//! the running context with its branch; a segment that errors or panics is
//! discarded along with its branch, and the next lane starts from the last
//! committed state. Only the final running context is written back by the
//! caller, so a failing lane never leaves state behind.
//!
//! ## Process
//!
//! Each lane claims the maximal run at the head of the remaining
//! transactions that it matches, checks ordering, admits the run to the
//! proposal and validates it. Any failure rejects the whole proposal.

use super::invariants::check_lane_order;
use super::lane::{Lane, LaneIndex};
use super::proposal::Proposal;
use crate::config::{BuilderConfig, LaneKind};
use crate::error::{BlockBuilderError, InvariantViolation, Result};
use crate::ports::{ExecMode, ExecutionContext};
use lane_mempool::TxPriority;
use shared_types::{Hash, Height, Transaction};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Renders a panic payload as text.
pub fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(message) => *message,
        Err(payload) => match payload.downcast::<&'static str>() {
            Ok(message) => (*message).to_string(),
            Err(_) => "unknown panic payload".to_string(),
        },
    }
}

/// What one lane contributed during preparation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LaneOutcome {
    /// Segment admitted
    Committed {
        /// Transactions added
        txs: usize,
        /// Bytes added
        bytes: u64,
    },
    /// Segment discarded after an error
    Failed(String),
    /// Segment discarded after a panic
    Panicked(String),
}

/// Per-lane preparation report.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LaneReport {
    /// Lane name
    pub lane: String,
    /// Contribution
    pub outcome: LaneOutcome,
    /// Transactions removed from the lane's index as invalid
    pub removed: usize,
}

struct Segment<C> {
    txs: Vec<Transaction>,
    invalid: Vec<Hash>,
    ctx: C,
}

/// Lanes in configured order.
#[derive(Debug)]
pub struct LaneChain {
    lanes: Vec<Lane>,
}

impl LaneChain {
    /// Builds the chain from a validated configuration.
    pub fn from_config(config: &BuilderConfig, priority: Arc<dyn TxPriority>) -> Result<Self> {
        config.validate()?;
        let ignores = config.resolved_ignores()?;

        let lanes = config
            .lanes
            .iter()
            .zip(ignores)
            .map(|(lane, ignore)| Lane::new(lane, ignore, Arc::clone(&priority)))
            .collect();

        Ok(Self { lanes })
    }

    /// Lanes in chain order.
    pub fn lanes(&self) -> &[Lane] {
        &self.lanes
    }

    /// Lane by name.
    pub fn lane(&self, name: &str) -> Option<&Lane> {
        self.lanes.iter().find(|lane| lane.name() == name)
    }

    /// The auction lane, if configured.
    pub fn auction_lane(&self) -> Option<&Lane> {
        self.lanes
            .iter()
            .find(|lane| lane.kind() == LaneKind::Auction)
    }

    /// `Match` of the lane at `pos`: its predicate holds and no ignored lane
    /// matches.
    pub fn lane_matches(&self, pos: usize, tx: &Transaction) -> bool {
        let lane = &self.lanes[pos];
        lane.kind().predicate(tx)
            && !lane
                .ignores()
                .iter()
                .any(|&other| self.lane_matches(other, tx))
    }

    /// Position of the lane that claims `tx`.
    pub fn route(&self, tx: &Transaction) -> Option<usize> {
        (0..self.lanes.len()).find(|&pos| self.lane_matches(pos, tx))
    }

    /// Fills every non-auction lane in order.
    ///
    /// `overlay` is the running context; on return it holds the effects of
    /// every committed segment.
    pub fn prepare<C: ExecutionContext>(
        &self,
        overlay: &mut C,
        proposal: &mut Proposal,
        height: Height,
    ) -> Vec<LaneReport> {
        let mut reports = Vec::with_capacity(self.lanes.len());

        for (pos, lane) in self.lanes.iter().enumerate() {
            if lane.kind() == LaneKind::Auction {
                continue;
            }

            let branch = overlay.clone();
            let attempt = panic::catch_unwind(AssertUnwindSafe(|| {
                self.fill_segment(pos, branch, proposal, height)
            }));

            let (outcome, removed) = match attempt {
                Ok(segment) => {
                    let removed = lane.remove_all(&segment.invalid);
                    let bytes: u64 = segment.txs.iter().map(Transaction::size).sum();
                    let outcome = match proposal.admit(lane.name(), lane.ratio(), &segment.txs) {
                        Ok(()) => {
                            *overlay = segment.ctx;
                            LaneOutcome::Committed {
                                txs: segment.txs.len(),
                                bytes,
                            }
                        }
                        Err(e) => {
                            warn!(lane = %lane.name(), error = %e, "[lanes] segment discarded");
                            LaneOutcome::Failed(e.to_string())
                        }
                    };
                    (outcome, removed)
                }
                Err(payload) => {
                    let message = panic_message(payload);
                    error!(lane = %lane.name(), %message, "[lanes] lane panicked during prepare");
                    (LaneOutcome::Panicked(message), 0)
                }
            };

            debug!(lane = %lane.name(), ?outcome, removed, "[lanes] lane prepared");
            reports.push(LaneReport {
                lane: lane.name().to_string(),
                outcome,
                removed,
            });
        }

        reports
    }

    /// Pulls from the lane's index in priority order until the index or the
    /// lane limit is exhausted.
    fn fill_segment<C: ExecutionContext>(
        &self,
        pos: usize,
        mut ctx: C,
        proposal: &Proposal,
        height: Height,
    ) -> Segment<C> {
        let lane = &self.lanes[pos];
        let limit = proposal.lane_limit(lane.ratio());
        let mut used = 0u64;
        let mut txs = Vec::new();
        let mut invalid = Vec::new();

        let guard = lane.read();
        let LaneIndex::Priority(index) = &*guard else {
            return Segment { txs, invalid, ctx };
        };

        let mut selection = index.select();
        while let Some(tx) = selection.next() {
            if proposal.contains(&tx.hash) {
                continue;
            }

            if !self.lane_matches(pos, tx) || tx.is_expired(height) {
                debug!(lane = %lane.name(), tx = %tx.short_hash(), "[lanes] stale transaction");
                invalid.push(tx.hash);
                selection.skip_sender(tx.sender);
                continue;
            }

            if used + tx.size() > limit {
                selection.skip_sender(tx.sender);
                continue;
            }

            let mut branch = ctx.clone();
            match branch.validate_tx(tx, ExecMode::Prepare) {
                Ok(()) => {
                    ctx = branch;
                    used += tx.size();
                    txs.push(tx.clone());
                }
                Err(e) => {
                    debug!(
                        lane = %lane.name(),
                        tx = %tx.short_hash(),
                        reason = %e,
                        "[lanes] transaction failed validation"
                    );
                    invalid.push(tx.hash);
                    selection.skip_sender(tx.sender);
                }
            }

            if used == limit {
                break;
            }
        }

        Segment { txs, invalid, ctx }
    }

    /// Verifies `txs` (everything after the top of block) lane by lane.
    pub fn process<C: ExecutionContext>(
        &self,
        overlay: &mut C,
        proposal: &mut Proposal,
        txs: &[Transaction],
        height: Height,
    ) -> Result<()> {
        let mut rest = txs;

        for (pos, lane) in self.lanes.iter().enumerate() {
            // The auction lane's segment is the top of block, verified
            // separately. It still must not appear again below.
            let run_len = if lane.kind() == LaneKind::Auction {
                0
            } else {
                rest.iter()
                    .take_while(|tx| self.lane_matches(pos, tx))
                    .count()
            };
            let (run, tail) = rest.split_at(run_len);

            if !run.is_empty() {
                check_lane_order(lane.name(), run, |tx| lane.priority_of(tx), proposal)?;
                proposal.admit(lane.name(), lane.ratio(), run)?;

                for tx in run {
                    if tx.is_expired(height) {
                        return Err(BlockBuilderError::Validation {
                            tx: tx.short_hash(),
                            reason: format!("expired at height {height}"),
                        });
                    }
                    overlay
                        .validate_tx(tx, ExecMode::Process)
                        .map_err(|e| BlockBuilderError::Validation {
                            tx: tx.short_hash(),
                            reason: e.reason,
                        })?;
                }
            }

            if let Some(offset) = tail.iter().position(|tx| self.lane_matches(pos, tx)) {
                return Err(InvariantViolation::LaneInterleaving {
                    lane: lane.name().to_string(),
                    position: txs.len() - tail.len() + offset,
                }
                .into());
            }

            debug!(lane = %lane.name(), txs = run.len(), "[lanes] lane verified");
            rest = tail;
        }

        if !rest.is_empty() {
            return Err(InvariantViolation::UnclaimedTransactions { count: rest.len() }.into());
        }
        Ok(())
    }
}
