//! Priority keys.
//!
//! A lane supplies the priority used to order transactions across senders.

use super::entities::{Transaction, U256};

/// Computes the cross-sender priority of a transaction. Higher goes first.
pub trait TxPriority: Send + Sync {
    /// Returns the priority of `tx`.
    fn priority(&self, tx: &Transaction) -> U256;
}

/// Orders by offered fee.
#[derive(Clone, Copy, Debug, Default)]
pub struct FeePriority;

impl TxPriority for FeePriority {
    fn priority(&self, tx: &Transaction) -> U256 {
        tx.fee
    }
}

impl<F> TxPriority for F
where
    F: Fn(&Transaction) -> U256 + Send + Sync,
{
    fn priority(&self, tx: &Transaction) -> U256 {
        self(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::TxKind;

    #[test]
    fn test_fee_priority() {
        let tx = Transaction::new(vec![1], [0xAA; 20], 0, U256::from(77), TxKind::Standard);
        assert_eq!(FeePriority.priority(&tx), U256::from(77));
    }

    #[test]
    fn test_closure_priority() {
        let by_sequence = |tx: &Transaction| U256::from(tx.sequence);
        let tx = Transaction::new(vec![1], [0xAA; 20], 9, U256::zero(), TxKind::Standard);
        assert_eq!(by_sequence.priority(&tx), U256::from(9));
    }
}
