//! Recorded state mutations.
//!
//! Every change an action makes to cash, ownership or the market goes
//! through a `Move`, applied immediately and recorded in the current
//! `MoveSet`. If a later check inside the same action fails, the set is
//! unwound in reverse order and the state is exactly as before the action
//! started. Committed sets are appended to the `MoveStack`, which gives an
//! audit trail of everything that ever moved.
//!
//! Player-visible undo does not unwind moves; it truncates the action log
//! and replays from the definition. The unwind path exists only for
//! atomicity within a single action.

use im::Vector;
use serde::{Deserialize, Serialize};

use crate::core::{Cash, CompanyId, HolderId, PlayerId, PortfolioId, RulesError};
use crate::ledger::Holding;
use crate::state::GameState;

/// One primitive mutation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Move {
    Cash {
        from: HolderId,
        to: HolderId,
        amount: Cash,
    },
    Holding {
        holding: Holding,
        from: PortfolioId,
        to: PortfolioId,
    },
    /// Adjust a player's bid-blocked cash.
    BlockCash { player: PlayerId, delta: Cash },
    /// Move a company's market token between ladder spaces.
    Price {
        company: CompanyId,
        from: usize,
        to: usize,
    },
}

/// The moves of one in-flight action. Apply-and-record, unwind on failure.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MoveSet {
    moves: Vec<Move>,
}

impl MoveSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    #[must_use]
    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    pub fn transfer_cash(
        &mut self,
        state: &mut GameState,
        from: HolderId,
        to: HolderId,
        amount: Cash,
    ) {
        if amount == 0 || from == to {
            return;
        }
        state.cash.transfer(from, to, amount);
        self.moves.push(Move::Cash { from, to, amount });
    }

    pub fn move_holding(
        &mut self,
        state: &mut GameState,
        holding: Holding,
        to: PortfolioId,
    ) -> Result<(), RulesError> {
        let from = state.portfolios.transfer(holding, to)?;
        if from != to {
            self.moves.push(Move::Holding { holding, from, to });
        }
        Ok(())
    }

    pub fn block_cash(&mut self, state: &mut GameState, player: PlayerId, delta: Cash) {
        if delta == 0 {
            return;
        }
        state.player_mut(player).blocked_cash += delta;
        self.moves.push(Move::BlockCash { player, delta });
    }

    /// Move a company's price token to `to`. No-op for unstarted companies.
    pub fn move_price(&mut self, state: &mut GameState, company: CompanyId, to: usize) {
        let Some(from) = state.company(company).market_index else {
            return;
        };
        if from == to {
            return;
        }
        state.company_mut(company).market_index = Some(to);
        self.moves.push(Move::Price { company, from, to });
    }

    /// Reverse every recorded move, last first. Consumes the set; after an
    /// unwind nothing of the action remains.
    pub fn unwind(mut self, state: &mut GameState) {
        while let Some(m) = self.moves.pop() {
            match m {
                Move::Cash { from, to, amount } => state.cash.transfer(to, from, amount),
                Move::Holding { holding, from, .. } => {
                    // The holding was in the ledger a moment ago.
                    state
                        .portfolios
                        .transfer(holding, from)
                        .unwrap_or_else(|e| panic!("unwind failed: {e}"));
                }
                Move::BlockCash { player, delta } => {
                    state.player_mut(player).blocked_cash -= delta;
                }
                Move::Price { company, from, .. } => {
                    state.company_mut(company).market_index = Some(from);
                }
            }
        }
    }
}

/// Append-only history of committed move sets.
#[derive(Clone, Debug, Default)]
pub struct MoveStack {
    committed: Vector<MoveSet>,
}

impl MoveStack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commit(&mut self, set: MoveSet) {
        self.committed.push_back(set);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.committed.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.committed.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MoveSet> {
        self.committed.iter()
    }
}
