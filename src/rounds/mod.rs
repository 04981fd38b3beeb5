//! Rounds: the phases of play.
//!
//! A round owns the turn order and the rules for one segment of the game:
//! the initial auction, stock trading, company operation, forced share
//! selling, and treasury share trading. The game manager drives exactly
//! one round at a time through the `Round` trait; a round reports back
//! whether it continues, finished, or needs an interrupting round spliced
//! in front of the action that triggered it.
//!
//! `Ctx` bundles the mutable state, the move recorder and the report log
//! so action handlers thread a single argument.

use crate::actions::{GameAction, PossibleAction};
use crate::core::{Cash, CompanyId, HolderId, PlayerId, PortfolioId, ReportLog, RulesError};
use crate::ledger::Holding;
use crate::moves::MoveSet;
use crate::state::GameState;

pub mod operating;
pub mod share_selling;
pub mod shares;
pub mod start;
pub mod stock;
pub mod treasury;

pub use operating::OperatingRound;
pub use share_selling::ShareSellingRound;
pub use start::StartRound;
pub use stock::StockRound;
pub use treasury::TreasuryShareRound;

/// What the round reports after handling an action.
#[derive(Clone, Debug, PartialEq)]
pub enum RoundOutcome {
    Continue,
    Finished,
    /// Suspend this round and run the named interrupt first. The action
    /// that triggered the interrupt is re-applied when the round resumes.
    Interrupt(InterruptKind),
}

#[derive(Clone, Debug, PartialEq)]
pub enum InterruptKind {
    /// A president must sell shares until they can cover `target`.
    ShareSelling { player: PlayerId, target: Cash },
    /// A company may trade its own treasury shares mid-turn.
    Treasury { company: CompanyId },
}

/// Everything an action handler may touch.
pub struct Ctx<'a> {
    pub state: &'a mut GameState,
    pub moves: &'a mut MoveSet,
    pub report: &'a mut ReportLog,
}

impl Ctx<'_> {
    pub fn cash(&mut self, from: HolderId, to: HolderId, amount: Cash) {
        self.moves.transfer_cash(self.state, from, to, amount);
    }

    pub fn move_holding(&mut self, holding: Holding, to: PortfolioId) -> Result<(), RulesError> {
        self.moves.move_holding(self.state, holding, to)
    }

    pub fn block_cash(&mut self, player: PlayerId, delta: Cash) {
        self.moves.block_cash(self.state, player, delta);
    }

    pub fn move_price(&mut self, company: CompanyId, to: usize) {
        self.moves.move_price(self.state, company, to);
    }

    pub fn say(&mut self, message: impl Into<String>) {
        self.report.add(message);
    }
}

pub trait Round {
    /// Short human name used in reports and saves.
    fn name(&self) -> &'static str;

    /// Called once when the round becomes current. A round may finish
    /// immediately (an operating round with nothing to operate).
    fn start(&mut self, ctx: &mut Ctx) -> RoundOutcome;

    /// Validate and execute one action. On error the manager unwinds the
    /// move set; the round must not keep partial state for failed actions.
    fn process(&mut self, ctx: &mut Ctx, action: &GameAction) -> Result<RoundOutcome, RulesError>;

    /// The full menu for the player(s) who may act now.
    fn possible_actions(&self, state: &GameState) -> Vec<PossibleAction>;

    /// Called when an interrupting round finished and this round is
    /// current again, after the saved action was re-applied.
    fn resume(&mut self, _ctx: &mut Ctx) -> RoundOutcome {
        RoundOutcome::Continue
    }
}
