//! Cash balances and the bank-broken latch.
//!
//! All money in the game lives in the `CashLedger`, keyed by `HolderId`.
//! Transfers are symmetric: the source loses exactly what the destination
//! gains, so the global sum is invariant for the life of the game.
//!
//! The bank may legally go negative. The first time its balance reaches
//! zero or below the ledger latches `broken`, and `is_just_broken` reports
//! that edge exactly once.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::ids::HolderId;

/// Money amount. Signed so deltas and (bank-only) negative balances work.
pub type Cash = i64;

/// The single source of truth for every cash balance.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CashLedger {
    balances: FxHashMap<HolderId, Cash>,
    broken: bool,
    just_broken: bool,
}

impl CashLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an initial balance. Setup only; does not touch the broken latch.
    pub fn fund(&mut self, holder: HolderId, amount: Cash) {
        self.balances.insert(holder, amount);
    }

    #[must_use]
    pub fn balance(&self, holder: HolderId) -> Cash {
        self.balances.get(&holder).copied().unwrap_or(0)
    }

    /// Apply a signed delta to one balance.
    ///
    /// Driving the bank to zero or below latches the broken flag.
    pub fn add(&mut self, holder: HolderId, delta: Cash) {
        let entry = self.balances.entry(holder).or_insert(0);
        *entry += delta;

        if holder == HolderId::Bank && *entry <= 0 && !self.broken {
            self.broken = true;
            self.just_broken = true;
            log::info!("the bank is broken");
        }
    }

    /// Move `amount` from one holder to another.
    pub fn transfer(&mut self, from: HolderId, to: HolderId, amount: Cash) {
        debug_assert!(amount >= 0, "negative transfer of {amount}");
        self.add(from, -amount);
        self.add(to, amount);
    }

    /// Total cash in circulation. Constant once setup is done.
    #[must_use]
    pub fn total(&self) -> Cash {
        self.balances.values().sum()
    }

    #[must_use]
    pub fn is_broken(&self) -> bool {
        self.broken
    }

    /// Edge-triggered broken report: true exactly once, on the first call
    /// after the bank broke.
    pub fn is_just_broken(&mut self) -> bool {
        std::mem::take(&mut self.just_broken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ids::PlayerId;

    #[test]
    fn test_fund_and_balance() {
        let mut ledger = CashLedger::new();
        ledger.fund(HolderId::Bank, 8000);
        ledger.fund(HolderId::Player(PlayerId(0)), 600);

        assert_eq!(ledger.balance(HolderId::Bank), 8000);
        assert_eq!(ledger.balance(HolderId::Player(PlayerId(0))), 600);
        assert_eq!(ledger.balance(HolderId::Player(PlayerId(1))), 0);
        assert_eq!(ledger.total(), 8600);
    }

    #[test]
    fn test_transfer_conserves_total() {
        let mut ledger = CashLedger::new();
        ledger.fund(HolderId::Bank, 1000);
        ledger.fund(HolderId::Player(PlayerId(0)), 500);

        ledger.transfer(HolderId::Player(PlayerId(0)), HolderId::Bank, 120);

        assert_eq!(ledger.balance(HolderId::Player(PlayerId(0))), 380);
        assert_eq!(ledger.balance(HolderId::Bank), 1120);
        assert_eq!(ledger.total(), 1500);
    }

    #[test]
    fn test_bank_break_edge_triggered() {
        let mut ledger = CashLedger::new();
        ledger.fund(HolderId::Bank, 100);
        ledger.fund(HolderId::Player(PlayerId(0)), 0);

        assert!(!ledger.is_broken());
        assert!(!ledger.is_just_broken());

        ledger.transfer(HolderId::Bank, HolderId::Player(PlayerId(0)), 100);

        assert!(ledger.is_broken());
        assert!(ledger.is_just_broken());
        // Reported exactly once.
        assert!(!ledger.is_just_broken());
        assert!(ledger.is_broken());
    }

    #[test]
    fn test_bank_breaks_only_once() {
        let mut ledger = CashLedger::new();
        ledger.fund(HolderId::Bank, 10);

        ledger.add(HolderId::Bank, -20);
        assert!(ledger.is_just_broken());

        // Recovering and dropping again does not re-trigger.
        ledger.add(HolderId::Bank, 100);
        ledger.add(HolderId::Bank, -200);
        assert!(!ledger.is_just_broken());
        assert!(ledger.is_broken());
    }
}
