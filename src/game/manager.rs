//! The game manager.
//!
//! Owns the state, the current round, the executed-action log and the
//! published possible-action set. Every submitted action runs the same
//! gauntlet: game-over check, meta-action routing, membership in the
//! published menu, then the round's own validation and execution. Failed
//! actions unwind their recorded moves and leave the state untouched.
//!
//! Undo and redo never mutate backwards. Undoing truncates the action log
//! and replays the remainder from a freshly built state; the engine is
//! deterministic, so replay reproduces the position exactly. The same
//! replay path restores saved games.
//!
//! Interrupting rounds (emergency share selling, treasury trading) are
//! spliced in by suspending the current round. The action that triggered
//! an emergency sale is logged when it is first submitted and re-applied
//! internally once the cash is raised, so a replayed log walks through the
//! interrupt exactly as the live game did.

use crate::actions::possible::PossibleKind;
use crate::actions::{ActionKind, GameAction, PossibleAction};
use crate::core::{Cash, ConfigError, PlayerId, ReplayError, ReportLog, RulesError};
use crate::definition::{GameDefinition, GameEndTiming};
use crate::moves::{MoveSet, MoveStack};
use crate::rounds::{
    Ctx, InterruptKind, OperatingRound, Round, RoundOutcome, ShareSellingRound, StartRound,
    StockRound, TreasuryShareRound,
};
use crate::state::GameState;

/// Which of the scheduled round types is current. Interrupt rounds are
/// tracked through `suspended`, not here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RoundKind {
    Start,
    Stock,
    Operating,
}

pub struct GameManager {
    definition: GameDefinition,
    state: GameState,
    report: ReportLog,

    current: Box<dyn Round>,
    round_kind: RoundKind,
    suspended: Option<Box<dyn Round>>,
    saved_action: Option<GameAction>,

    executed: Vec<GameAction>,
    undone: Vec<GameAction>,
    move_stack: MoveStack,
    possible: Vec<PossibleAction>,

    /// Operating rounds completed / scheduled in the current set.
    or_in_set: u8,
    ors_in_set: u8,
    or_operating: bool,
    stock_rounds_held: u32,

    game_over: bool,
    end_scheduled: bool,
}

impl std::fmt::Debug for GameManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameManager")
            .field("round_kind", &self.round_kind)
            .field("current", &self.current.name())
            .field("or_in_set", &self.or_in_set)
            .field("ors_in_set", &self.ors_in_set)
            .field("game_over", &self.game_over)
            .finish_non_exhaustive()
    }
}

impl GameManager {
    pub fn new(definition: GameDefinition) -> Result<Self, ConfigError> {
        let state = GameState::build(&definition)?;
        let mut manager = Self {
            definition,
            state,
            report: ReportLog::new(),
            current: Box::new(StartRound::new()),
            round_kind: RoundKind::Start,
            suspended: None,
            saved_action: None,
            executed: Vec::new(),
            undone: Vec::new(),
            move_stack: MoveStack::new(),
            possible: Vec::new(),
            or_in_set: 0,
            ors_in_set: 0,
            or_operating: false,
            stock_rounds_held: 0,
            game_over: false,
            end_scheduled: false,
        };
        manager.launch();
        Ok(manager)
    }

    fn launch(&mut self) {
        if self.run_start_of_current() == RoundOutcome::Finished {
            self.round_finished();
        }
        self.refresh_possible();
    }

    // === Public accessors ===

    #[must_use]
    pub fn state(&self) -> &GameState {
        &self.state
    }

    #[must_use]
    pub fn report(&self) -> &ReportLog {
        &self.report
    }

    #[must_use]
    pub fn possible_actions(&self) -> &[PossibleAction] {
        &self.possible
    }

    #[must_use]
    pub fn executed_actions(&self) -> &[GameAction] {
        &self.executed
    }

    #[must_use]
    pub fn move_stack(&self) -> &MoveStack {
        &self.move_stack
    }

    #[must_use]
    pub fn definition(&self) -> &GameDefinition {
        &self.definition
    }

    #[must_use]
    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    #[must_use]
    pub fn round_name(&self) -> &'static str {
        self.current.name()
    }

    /// Player worths, best first. Meaningful any time, final when the
    /// game is over.
    #[must_use]
    pub fn final_standings(&self) -> Vec<(PlayerId, Cash)> {
        let mut standings: Vec<(PlayerId, Cash)> = self
            .state
            .players
            .iter()
            .map(|p| (p.id, self.state.player_worth(p.id)))
            .collect();
        standings.sort_by_key(|&(id, worth)| (std::cmp::Reverse(worth), id.index()));
        standings
    }

    // === The action pipeline ===

    /// Submit one action, or `None` to just refresh the published menu.
    /// Returns whether the action was accepted.
    pub fn process(&mut self, action: Option<GameAction>) -> bool {
        let Some(action) = action else {
            self.refresh_possible();
            return true;
        };
        match self.try_apply(action) {
            Ok(()) => true,
            Err(e) => {
                log::info!("action rejected: {e}");
                false
            }
        }
    }

    fn try_apply(&mut self, action: GameAction) -> Result<(), RulesError> {
        if self.game_over {
            return Err(RulesError::GameOver);
        }
        if !self.possible.iter().any(|p| p.matches(&action)) {
            return Err(RulesError::NotAllowed);
        }

        if action.is_meta() {
            let result = match action.kind {
                ActionKind::Undo => self.undo(false),
                ActionKind::ForcedUndo => self.undo(true),
                ActionKind::Redo => self.redo(),
                // Saving is the caller's job; the action is a menu marker.
                ActionKind::Save => Ok(()),
                _ => unreachable!(),
            };
            self.refresh_possible();
            return result;
        }

        let mut moves = MoveSet::new();
        let outcome = {
            let mut ctx = Ctx {
                state: &mut self.state,
                moves: &mut moves,
                report: &mut self.report,
            };
            self.current.process(&mut ctx, &action)
        };

        match outcome {
            Err(e) => {
                moves.unwind(&mut self.state);
                Err(e)
            }
            Ok(outcome) => {
                self.move_stack.commit(moves);
                self.executed.push(action.clone());
                self.undone.clear();
                self.handle_outcome(outcome, action);
                self.post_action_checks();
                self.refresh_possible();
                Ok(())
            }
        }
    }

    fn handle_outcome(&mut self, outcome: RoundOutcome, action: GameAction) {
        match outcome {
            RoundOutcome::Continue => {}
            RoundOutcome::Finished => self.round_finished(),
            RoundOutcome::Interrupt(kind) => self.begin_interrupt(kind, action),
        }
    }

    fn begin_interrupt(&mut self, kind: InterruptKind, action: GameAction) {
        let round: Box<dyn Round> = match kind {
            InterruptKind::ShareSelling { player, target } => {
                self.saved_action = Some(action);
                Box::new(ShareSellingRound::new(player, target))
            }
            InterruptKind::Treasury { company } => {
                self.saved_action = None;
                Box::new(TreasuryShareRound::new(company))
            }
        };
        let previous = std::mem::replace(&mut self.current, round);
        self.suspended = Some(previous);
        if self.run_start_of_current() == RoundOutcome::Finished {
            self.round_finished();
        }
    }

    fn run_start_of_current(&mut self) -> RoundOutcome {
        let mut moves = MoveSet::new();
        let outcome = {
            let mut ctx = Ctx {
                state: &mut self.state,
                moves: &mut moves,
                report: &mut self.report,
            };
            self.current.start(&mut ctx)
        };
        self.move_stack.commit(moves);
        outcome
    }

    fn run_resume_of_current(&mut self) -> RoundOutcome {
        let mut moves = MoveSet::new();
        let outcome = {
            let mut ctx = Ctx {
                state: &mut self.state,
                moves: &mut moves,
                report: &mut self.report,
            };
            self.current.resume(&mut ctx)
        };
        self.move_stack.commit(moves);
        outcome
    }

    fn round_finished(&mut self) {
        if let Some(previous) = self.suspended.take() {
            self.current = previous;

            if self.check_bankruptcy() {
                return;
            }

            if let Some(saved) = self.saved_action.take() {
                // Re-apply the action that forced the interrupt. It was
                // already logged; only its effects run now.
                let mut moves = MoveSet::new();
                let outcome = {
                    let mut ctx = Ctx {
                        state: &mut self.state,
                        moves: &mut moves,
                        report: &mut self.report,
                    };
                    self.current.process(&mut ctx, &saved)
                };
                match outcome {
                    Ok(outcome) => {
                        self.move_stack.commit(moves);
                        self.handle_outcome(outcome, saved);
                    }
                    Err(e) => {
                        // The emergency did not raise enough after all;
                        // the turn moves on without the purchase.
                        moves.unwind(&mut self.state);
                        log::warn!("deferred action failed after interrupt: {e}");
                        let outcome = self.run_resume_of_current();
                        self.handle_outcome(outcome, GameAction::new(self.state.current_player, ActionKind::Pass));
                    }
                }
            } else {
                let outcome = self.run_resume_of_current();
                self.handle_outcome(outcome, GameAction::new(self.state.current_player, ActionKind::Pass));
            }
        } else {
            self.next_round();
        }
    }

    // === Round scheduling ===

    fn next_round(&mut self) {
        if self.game_over {
            return;
        }
        match self.round_kind {
            RoundKind::Start => {
                if self.state.first_unsold_item().is_some() {
                    // The round gave up on the packet; privates pay out and
                    // the remainder goes back on sale afterwards.
                    self.enter_revenue_round();
                } else if self.definition.options.skip_first_stock_round {
                    self.enter_or_set();
                } else {
                    self.enter_stock();
                }
            }
            RoundKind::Stock => self.enter_or_set(),
            RoundKind::Operating => {
                if self.or_in_set < self.ors_in_set {
                    self.enter_operating();
                } else if self.end_scheduled {
                    self.end_game();
                } else if self.state.first_unsold_item().is_some() {
                    self.enter_start();
                } else {
                    self.enter_stock();
                }
            }
        }
    }

    fn enter_start(&mut self) {
        self.round_kind = RoundKind::Start;
        self.current = Box::new(StartRound::new());
        if self.run_start_of_current() == RoundOutcome::Finished {
            self.round_finished();
        }
    }

    /// A non-operating round: privates pay, no company turns.
    fn enter_revenue_round(&mut self) {
        self.or_operating = false;
        self.ors_in_set = 1;
        self.or_in_set = 0;
        self.enter_operating();
    }

    fn enter_stock(&mut self) {
        self.round_kind = RoundKind::Stock;
        let sells_allowed =
            !(self.definition.options.no_sell_in_first_sr && self.stock_rounds_held == 0);
        self.stock_rounds_held += 1;
        self.current = Box::new(StockRound::new(sells_allowed));
        if self.run_start_of_current() == RoundOutcome::Finished {
            self.round_finished();
        }
    }

    fn enter_or_set(&mut self) {
        let any_operating = self
            .state
            .companies
            .iter()
            .any(|c| c.has_floated() && !c.is_closed());
        self.or_operating = any_operating;
        self.ors_in_set = if any_operating {
            self.state.phase().ors_per_set
        } else {
            1
        };
        self.or_in_set = 0;
        self.enter_operating();
    }

    fn enter_operating(&mut self) {
        self.or_in_set += 1;
        self.round_kind = RoundKind::Operating;
        self.current = Box::new(OperatingRound::new(self.or_operating));
        if self.run_start_of_current() == RoundOutcome::Finished {
            self.round_finished();
        }
    }

    // === Game end ===

    fn check_bankruptcy(&mut self) -> bool {
        if self.definition.options.bankruptcy_ends_game
            && self.state.players.iter().any(|p| p.bankrupt)
        {
            self.end_game();
            return true;
        }
        false
    }

    fn post_action_checks(&mut self) {
        if self.state.cash.is_just_broken() {
            self.report.add("the bank has broken");
            match self.definition.options.bank_break_ends {
                GameEndTiming::Immediate => self.end_game(),
                GameEndTiming::EndOfOrSet => self.end_scheduled = true,
            }
        }
        self.check_bankruptcy();
    }

    fn end_game(&mut self) {
        if self.game_over {
            return;
        }
        self.game_over = true;
        self.report.add("the game is over");
        for (player, worth) in self.final_standings() {
            let name = self.state.player(player).name.clone();
            self.report.add(format!("{name} finishes with {worth}"));
        }
        if let Some((winner, _)) = self.final_standings().first() {
            let name = self.state.player(*winner).name.clone();
            self.report.add(format!("{name} wins"));
        }
        self.possible.clear();
    }

    // === The published menu ===

    fn refresh_possible(&mut self) {
        if self.game_over {
            self.possible = Vec::new();
            return;
        }
        self.possible = self.current.possible_actions(&self.state);

        let player = self.state.current_player;
        if self
            .executed
            .last()
            .is_some_and(|last| last.player == player)
        {
            self.possible
                .push(PossibleAction::new(player, PossibleKind::Undo));
        }
        if !self.executed.is_empty() {
            self.possible
                .push(PossibleAction::new(player, PossibleKind::ForcedUndo));
        }
        if !self.undone.is_empty() {
            self.possible
                .push(PossibleAction::new(player, PossibleKind::Redo));
        }
        self.possible
            .push(PossibleAction::new(player, PossibleKind::Save));
    }

    // === Undo, redo, replay ===

    fn undo(&mut self, forced: bool) -> Result<(), RulesError> {
        let Some(last) = self.executed.last() else {
            return Err(RulesError::NothingToUndo);
        };
        if !forced && last.player != self.state.current_player {
            return Err(RulesError::NothingToUndo);
        }

        let mut actions = self.executed.clone();
        let Some(undone) = actions.pop() else {
            return Err(RulesError::NothingToUndo);
        };
        // Replay runs through try_apply, which clears the redo stack on
        // every accepted action; carry the stack across, as redo does.
        let redo_stack = std::mem::take(&mut self.undone);
        let result = self
            .replay(actions)
            .map_err(|e| RulesError::Internal(format!("undo replay failed: {e}")));
        self.undone = redo_stack;
        result?;
        self.undone.push(undone);
        Ok(())
    }

    fn redo(&mut self) -> Result<(), RulesError> {
        let action = self.undone.pop().ok_or(RulesError::NothingToRedo)?;
        let redo_stack = std::mem::take(&mut self.undone);
        let result = self.try_apply(action);
        // try_apply clears the redo stack on success; put the remainder
        // back so chained redos work.
        self.undone = redo_stack;
        result
    }

    fn reset(&mut self) -> Result<(), ConfigError> {
        self.state = GameState::build(&self.definition)?;
        self.report = ReportLog::new();
        self.current = Box::new(StartRound::new());
        self.round_kind = RoundKind::Start;
        self.suspended = None;
        self.saved_action = None;
        self.executed = Vec::new();
        self.move_stack = MoveStack::new();
        self.or_in_set = 0;
        self.ors_in_set = 0;
        self.or_operating = false;
        self.stock_rounds_held = 0;
        self.game_over = false;
        self.end_scheduled = false;
        self.launch();
        Ok(())
    }

    /// Rebuild from scratch and replay a log of actions.
    pub(crate) fn replay(&mut self, actions: Vec<GameAction>) -> Result<(), ReplayError> {
        self.reset()?;
        for (index, action) in actions.into_iter().enumerate() {
            self.try_apply(action)
                .map_err(|reason| ReplayError::ActionRejected { index, reason })?;
        }
        Ok(())
    }
}
