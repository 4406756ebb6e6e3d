//! Bundle signer continuity (front-running protection).
//!
//! A bundle is accepted when every transaction has the same signer set, or
//! when a run of identical signer sets that exclude the bidder is followed
//! by a run in which every signer set includes the bidder. The bidder may
//! therefore only append after a third party's transactions, never place
//! transactions before or between them.

use crate::error::InvariantViolation;
use shared_types::Address;
use std::collections::BTreeSet;

/// Checks the signer sets of a bundle, in bundle order.
pub fn check_signer_continuity(
    bidder: &Address,
    signers: &[&BTreeSet<Address>],
) -> Result<(), InvariantViolation> {
    let Some(first) = signers.first() else {
        return Ok(());
    };

    if signers.iter().all(|set| set == first) {
        return Ok(());
    }

    if first.contains(bidder) {
        return Err(InvariantViolation::FrontRunning { position: 0 });
    }

    let prefix = signers.iter().take_while(|set| *set == first).count();

    match signers[prefix..]
        .iter()
        .position(|set| !set.contains(bidder))
    {
        Some(offset) => Err(InvariantViolation::FrontRunning {
            position: prefix + offset,
        }),
        None => Ok(()),
    }
}
