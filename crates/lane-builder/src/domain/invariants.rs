//! Invariant checkers for received proposals
//!
//! These run during ProcessProposal only. Any violation rejects the whole
//! proposal.

use super::proposal::Proposal;
use crate::error::{InvariantViolation, Result};
use primitive_types::U256;
use shared_types::{Address, Transaction};
use std::collections::HashMap;

/// Lane ordering: within a lane run, priority never increases and each
/// sender's sequence strictly increases.
///
/// A priority increase is tolerated only for a sender already present earlier
/// in the proposal, because an index orders a sender's later transactions no
/// higher than the earlier ones (the priority watermark). Such a transaction
/// inherits the previous effective priority.
pub fn check_lane_order<F>(
    lane: &str,
    run: &[Transaction],
    priority: F,
    proposal: &Proposal,
) -> Result<()>
where
    F: Fn(&Transaction) -> U256,
{
    let mut last_sequence: HashMap<Address, u64> = HashMap::new();
    let mut watermark: Option<U256> = None;

    for (position, tx) in run.iter().enumerate() {
        let previous = last_sequence.get(&tx.sender).copied();
        if previous.is_some_and(|seq| tx.sequence <= seq) {
            return Err(InvariantViolation::SequenceOrdering {
                lane: lane.to_string(),
                position,
            }
            .into());
        }

        let seen = previous.is_some() || proposal.has_sender(&tx.sender);
        let own = priority(tx);
        let effective = match watermark {
            None => own,
            Some(prev) if own <= prev => own,
            Some(prev) if seen => prev,
            Some(_) => {
                return Err(InvariantViolation::PriorityOrdering {
                    lane: lane.to_string(),
                    position,
                }
                .into())
            }
        };

        watermark = Some(effective);
        last_sequence.insert(tx.sender, tx.sequence);
    }

    Ok(())
}

/// Top of block: the claimed slots must equal the re-derived bytes exactly.
pub fn check_top_of_block(expected: &[Vec<u8>], claimed: &[Vec<u8>]) -> Result<()> {
    if expected.len() != claimed.len() {
        return Err(InvariantViolation::TopOfBlockMismatch {
            reason: format!(
                "expected {} transactions, record claims {}",
                expected.len(),
                claimed.len()
            ),
        }
        .into());
    }

    if let Some(position) = expected.iter().zip(claimed).position(|(e, c)| e != c) {
        return Err(InvariantViolation::TopOfBlockMismatch {
            reason: format!("bytes differ at position {position}"),
        }
        .into());
    }

    Ok(())
}
