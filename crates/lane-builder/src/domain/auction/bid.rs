//! Stateless bid checks: auction terms and bundle decoding.

use crate::config::AuctionConfig;
use crate::error::BidRejection;
use primitive_types::U256;
use shared_types::{BidInfo, Hash, Height, Transaction, TxDecoder};
use std::collections::HashSet;

/// Checks timeout, reserve, increment and bundle length.
///
/// `previous_top` is the amount the bid must outbid; it is only supplied at
/// admission time.
///
/// A bid is always bounded: a timeout of 0 counts as expired from height 1
/// on. Ordinary transactions read 0 as "no timeout" (see
/// [`Transaction::is_expired`]).
pub fn check_bid_terms<'a>(
    config: &AuctionConfig,
    tx: &'a Transaction,
    height: Height,
    previous_top: Option<U256>,
) -> Result<&'a BidInfo, BidRejection> {
    let bid = tx.bid().ok_or(BidRejection::NotABid)?;

    if tx.timeout_height < height {
        return Err(BidRejection::Expired {
            timeout: tx.timeout_height,
            height,
        });
    }

    if bid.amount < config.reserve_price {
        return Err(BidRejection::BelowReserve {
            amount: bid.amount,
            reserve: config.reserve_price,
        });
    }

    if let Some(top) = previous_top {
        let required = top.saturating_add(config.min_bid_increment);
        if bid.amount < required {
            return Err(BidRejection::BelowIncrement {
                amount: bid.amount,
                required,
            });
        }
    }

    if bid.bundle.len() > config.max_bundle_size {
        return Err(BidRejection::BundleTooLarge {
            len: bid.bundle.len(),
            max: config.max_bundle_size,
        });
    }

    Ok(bid)
}

/// Decodes the bundle of `bid_tx` in order.
pub fn decode_bundle(
    decoder: &dyn TxDecoder,
    bid_tx: &Transaction,
    bid: &BidInfo,
) -> Result<Vec<Transaction>, BidRejection> {
    let mut seen: HashSet<Hash> = HashSet::with_capacity(bid.bundle.len());
    let mut bundle = Vec::with_capacity(bid.bundle.len());

    for (index, bytes) in bid.bundle.iter().enumerate() {
        let tx = decoder
            .decode(bytes)
            .map_err(|e| BidRejection::BundleDecode {
                index,
                reason: e.to_string(),
            })?;

        if tx.hash == bid_tx.hash {
            return Err(BidRejection::SelfBundled);
        }
        if tx.is_bid() {
            return Err(BidRejection::NestedBid { index });
        }
        if !seen.insert(tx.hash) {
            return Err(BidRejection::DuplicateBundleTx { index });
        }
        bundle.push(tx);
    }

    Ok(bundle)
}
