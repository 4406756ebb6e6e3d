//! Metrics collection for the block builder

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics collector for proposal handling
#[derive(Debug, Default)]
pub struct Metrics {
    /// Proposals built by PrepareProposal
    pub proposals_prepared: AtomicU64,

    /// Proposals accepted by ProcessProposal
    pub proposals_accepted: AtomicU64,

    /// Proposals rejected by ProcessProposal
    pub proposals_rejected: AtomicU64,

    /// Lane segments discarded after an error
    pub lane_failures: AtomicU64,

    /// Lane segments discarded after a panic
    pub lane_panics: AtomicU64,

    /// Prepared proposals that carried a winning bid
    pub auctions_won: AtomicU64,

    /// Bids removed from the bid book after failing verification
    pub bids_evicted: AtomicU64,

    /// Transactions removed by precommit eviction
    pub txs_evicted: AtomicU64,

    /// Total bytes of prepared proposals
    pub proposal_bytes: AtomicU64,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a prepared proposal
    pub fn record_prepared(&self, total_bytes: u64, auction_won: bool) {
        self.proposals_prepared.fetch_add(1, Ordering::Relaxed);
        self.proposal_bytes.fetch_add(total_bytes, Ordering::Relaxed);
        if auction_won {
            self.auctions_won.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a ProcessProposal verdict
    pub fn record_processed(&self, accepted: bool) {
        let counter = if accepted {
            &self.proposals_accepted
        } else {
            &self.proposals_rejected
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a discarded lane segment
    pub fn record_lane_failure(&self, panicked: bool) {
        let counter = if panicked {
            &self.lane_panics
        } else {
            &self.lane_failures
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record bids removed from the bid book
    pub fn record_bids_evicted(&self, count: usize) {
        self.bids_evicted
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Record transactions removed by eviction
    pub fn record_txs_evicted(&self, count: usize) {
        self.txs_evicted.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Get proposals prepared
    pub fn get_proposals_prepared(&self) -> u64 {
        self.proposals_prepared.load(Ordering::Relaxed)
    }

    /// Get (accepted, rejected) proposal counts
    pub fn get_processed(&self) -> (u64, u64) {
        (
            self.proposals_accepted.load(Ordering::Relaxed),
            self.proposals_rejected.load(Ordering::Relaxed),
        )
    }

    /// Get transactions removed by eviction
    pub fn get_txs_evicted(&self) -> u64 {
        self.txs_evicted.load(Ordering::Relaxed)
    }

    /// Get lane panics
    pub fn get_lane_panics(&self) -> u64 {
        self.lane_panics.load(Ordering::Relaxed)
    }

    /// Get average prepared proposal size in bytes
    pub fn get_avg_proposal_bytes(&self) -> f64 {
        let proposals = self.proposals_prepared.load(Ordering::Relaxed);
        if proposals == 0 {
            return 0.0;
        }
        let bytes = self.proposal_bytes.load(Ordering::Relaxed);
        bytes as f64 / proposals as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_recording() {
        let metrics = Metrics::new();

        metrics.record_prepared(1_000, true);
        metrics.record_prepared(3_000, false);

        assert_eq!(metrics.get_proposals_prepared(), 2);
        assert_eq!(metrics.get_avg_proposal_bytes(), 2_000.0);
        assert_eq!(metrics.auctions_won.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_verdicts_and_failures() {
        let metrics = Metrics::new();

        metrics.record_processed(true);
        metrics.record_processed(false);
        metrics.record_processed(false);
        metrics.record_lane_failure(true);
        metrics.record_lane_failure(false);

        assert_eq!(metrics.get_processed(), (1, 2));
        assert_eq!(metrics.get_lane_panics(), 1);
        assert_eq!(metrics.lane_failures.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_empty_average() {
        assert_eq!(Metrics::new().get_avg_proposal_bytes(), 0.0);
    }
}
