//! Inbound ports (driving side - API)
//!
//! Callbacks the consensus engine drives each height.

use super::outbound::ExecutionContext;
use crate::error::Result;
use shared_types::Height;

/// ProcessProposal verdict.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ProposalStatus {
    /// Every byte accounted for and valid
    Accept,
    /// Anything else
    Reject,
}

impl ProposalStatus {
    /// Returns true for `Accept`.
    pub fn is_accept(&self) -> bool {
        matches!(self, Self::Accept)
    }
}

/// PrepareProposal input.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PrepareRequest {
    /// Height being proposed
    pub height: Height,
    /// Maximum proposal bytes, record included
    pub max_bytes: u64,
    /// Vote extensions committed at the previous height
    pub vote_extensions: Vec<Vec<u8>>,
}

/// Primary port: proposal construction and verification.
pub trait ProposalHandler<C: ExecutionContext> {
    /// Builds a proposal. Never fails; lanes that fail contribute nothing.
    ///
    /// Slot 0 of the result is the encoded proposal record. `ctx` receives
    /// the effects of every committed segment.
    fn prepare_proposal(&self, ctx: &mut C, request: PrepareRequest) -> Vec<Vec<u8>>;

    /// Verifies a proposal. All or nothing.
    fn process_proposal(&self, ctx: &C, height: Height, txs: &[Vec<u8>]) -> ProposalStatus;
}

/// Vote extensions carrying candidate bids for the next height.
pub trait VoteExtensionHandler<C: ExecutionContext> {
    /// Encoded highest local bid that still verifies, or empty.
    fn extend_vote(&self, ctx: &C, height: Height) -> Vec<u8>;

    /// Checks another validator's extension. Empty extensions are valid.
    fn verify_vote_extension(&self, ctx: &C, height: Height, extension: &[u8]) -> Result<()>;
}
