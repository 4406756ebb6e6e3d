//! In-memory ledger implementing [`ExecutionContext`].
//!
//! Balances and per-sender sequences only. A transaction is valid if its
//! sequence is the sender's next one and the sender can pay the fee plus,
//! for bids, the bid amount.

use crate::ports::{ExecMode, ExecutionContext, ValidationFailure};
use primitive_types::U256;
use shared_types::{Address, Transaction};
use std::collections::HashMap;

/// Account balances and sequences.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InMemoryLedger {
    balances: HashMap<Address, U256>,
    sequences: HashMap<Address, u64>,
}

impl InMemoryLedger {
    /// Empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Credits `account`.
    pub fn with_balance(mut self, account: Address, amount: u64) -> Self {
        self.credit(account, U256::from(amount));
        self
    }

    /// Adds `amount` to `account`.
    pub fn credit(&mut self, account: Address, amount: U256) {
        let balance = self.balances.entry(account).or_default();
        *balance = balance.saturating_add(amount);
    }

    /// Current balance.
    pub fn balance(&self, account: &Address) -> U256 {
        self.balances.get(account).copied().unwrap_or_default()
    }

    /// Next expected sequence.
    pub fn sequence(&self, account: &Address) -> u64 {
        self.sequences.get(account).copied().unwrap_or(0)
    }
}

impl ExecutionContext for InMemoryLedger {
    fn validate_tx(&mut self, tx: &Transaction, _mode: ExecMode) -> Result<(), ValidationFailure> {
        let expected = self.sequence(&tx.sender);
        if tx.sequence != expected {
            return Err(ValidationFailure::new(format!(
                "sequence mismatch: expected {expected}, got {}",
                tx.sequence
            )));
        }

        let bid_amount = tx.bid().map(|b| b.amount).unwrap_or_default();
        let cost = tx
            .fee
            .checked_add(bid_amount)
            .ok_or_else(|| ValidationFailure::new("cost overflow"))?;

        let balance = self.balance(&tx.sender);
        if balance < cost {
            return Err(ValidationFailure::new(format!(
                "insufficient funds: balance {balance}, cost {cost}"
            )));
        }

        self.balances.insert(tx.sender, balance - cost);
        self.sequences.insert(tx.sender, expected + 1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{BidInfo, TxKind};

    const ALICE: Address = [0xA1; 20];

    fn create_tx(sequence: u64, fee: u64) -> Transaction {
        Transaction::new(
            vec![sequence as u8, fee as u8],
            ALICE,
            sequence,
            U256::from(fee),
            TxKind::Standard,
        )
    }

    #[test]
    fn test_applies_fee_and_sequence() {
        let mut ledger = InMemoryLedger::new().with_balance(ALICE, 100);
        ledger.validate_tx(&create_tx(0, 30), ExecMode::Prepare).unwrap();

        assert_eq!(ledger.balance(&ALICE), U256::from(70));
        assert_eq!(ledger.sequence(&ALICE), 1);
    }

    #[test]
    fn test_rejects_wrong_sequence() {
        let mut ledger = InMemoryLedger::new().with_balance(ALICE, 100);
        let result = ledger.validate_tx(&create_tx(1, 30), ExecMode::Prepare);
        assert!(result.unwrap_err().reason.contains("sequence mismatch"));
    }

    #[test]
    fn test_rejects_insufficient_funds() {
        let mut ledger = InMemoryLedger::new().with_balance(ALICE, 10);
        assert!(ledger.validate_tx(&create_tx(0, 30), ExecMode::Prepare).is_err());
        assert_eq!(ledger.sequence(&ALICE), 0);
    }

    #[test]
    fn test_bid_pays_amount() {
        let info = BidInfo {
            bidder: ALICE,
            amount: U256::from(60),
            bundle: vec![],
        };
        let bid = Transaction::new(vec![7], ALICE, 0, U256::from(5), TxKind::Bid(info));

        let mut ledger = InMemoryLedger::new().with_balance(ALICE, 100);
        ledger.validate_tx(&bid, ExecMode::Prepare).unwrap();
        assert_eq!(ledger.balance(&ALICE), U256::from(35));
    }
}
