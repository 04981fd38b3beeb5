//! The forced share-selling round.
//!
//! Spliced in when a president must raise cash for an emergency train
//! purchase. The player sells share bundles until the proceeds cover the
//! target; the purchase that triggered the round is then re-applied. A
//! player with nothing left to sell and a target still outstanding is
//! bankrupt.

use crate::actions::possible::PossibleKind;
use crate::actions::{ActionKind, GameAction, PossibleAction};
use crate::core::{Cash, PlayerId, PortfolioId, RulesError};
use crate::rounds::{shares, Ctx, Round, RoundOutcome};
use crate::state::GameState;

pub struct ShareSellingRound {
    player: PlayerId,
    target: Cash,
    raised: Cash,
}

impl ShareSellingRound {
    #[must_use]
    pub fn new(player: PlayerId, target: Cash) -> Self {
        Self {
            player,
            target,
            raised: 0,
        }
    }

    fn anything_sellable(&self, state: &GameState) -> bool {
        state
            .companies
            .iter()
            .any(|c| shares::max_sellable(state, self.player, c.id) > 0)
    }

    fn go_bankrupt(&self, ctx: &mut Ctx) {
        ctx.state.player_mut(self.player).bankrupt = true;
        let name = ctx.state.player(self.player).name.clone();
        ctx.say(format!("{name} is bankrupt"));
    }
}

impl Round for ShareSellingRound {
    fn name(&self) -> &'static str {
        "emergency share selling"
    }

    fn start(&mut self, ctx: &mut Ctx) -> RoundOutcome {
        ctx.state.current_player = self.player;
        let name = ctx.state.player(self.player).name.clone();
        ctx.say(format!("{name} must raise {}", self.target));

        if !self.anything_sellable(ctx.state) {
            self.go_bankrupt(ctx);
            return RoundOutcome::Finished;
        }
        RoundOutcome::Continue
    }

    fn process(&mut self, ctx: &mut Ctx, action: &GameAction) -> Result<RoundOutcome, RulesError> {
        match action.kind {
            ActionKind::SellShares { company, count } => {
                if action.player != self.player {
                    return Err(RulesError::NotYourTurn(
                        ctx.state.player(self.player).name.clone(),
                    ));
                }
                let proceeds = shares::execute_share_sale(
                    ctx,
                    PortfolioId::Player(self.player),
                    company,
                    count,
                )?;
                self.raised += proceeds;

                if self.raised >= self.target {
                    return Ok(RoundOutcome::Finished);
                }
                if !self.anything_sellable(ctx.state) {
                    self.go_bankrupt(ctx);
                    return Ok(RoundOutcome::Finished);
                }
                Ok(RoundOutcome::Continue)
            }
            _ => Err(RulesError::WrongStep),
        }
    }

    fn possible_actions(&self, state: &GameState) -> Vec<PossibleAction> {
        state
            .companies
            .iter()
            .filter_map(|c| {
                let max = shares::max_sellable(state, self.player, c.id);
                (max > 0).then(|| {
                    PossibleAction::new(
                        self.player,
                        PossibleKind::SellShares {
                            company: c.id,
                            max,
                        },
                    )
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CompanyId, HolderId, ReportLog};
    use crate::games::demo::DemoGameBuilder;
    use crate::ledger::Holding;
    use crate::moves::MoveSet;

    fn setup() -> (GameState, CompanyId) {
        let mut state = GameState::build(&DemoGameBuilder::new().build()).unwrap();
        let company = state.company_id("Lakeshore Line").unwrap();
        let index = state.market.par_space_at(76).unwrap();
        state.company_mut(company).start(76, index);
        (state, company)
    }

    fn give_shares(state: &mut GameState, player: PlayerId, company: CompanyId, units: u8) {
        let certs = state
            .common_certs_for_units(PortfolioId::Ipo, company, units)
            .unwrap();
        for cert in certs {
            state
                .portfolios
                .transfer(Holding::Certificate(cert), PortfolioId::Player(player))
                .unwrap();
        }
    }

    #[test]
    fn test_selling_to_target_finishes() {
        let (mut state, company) = setup();
        give_shares(&mut state, PlayerId(0), company, 3);

        let mut round = ShareSellingRound::new(PlayerId(0), 150);
        let mut report = ReportLog::new();
        let mut moves = MoveSet::new();
        let mut ctx = Ctx {
            state: &mut state,
            moves: &mut moves,
            report: &mut report,
        };
        assert_eq!(round.start(&mut ctx), RoundOutcome::Continue);

        let outcome = round
            .process(
                &mut ctx,
                &GameAction::new(
                    PlayerId(0),
                    ActionKind::SellShares { company, count: 2 },
                ),
            )
            .unwrap();

        // 2 shares at 76 comfortably covers 150.
        assert_eq!(outcome, RoundOutcome::Finished);
        assert!(!state.player(PlayerId(0)).bankrupt);
    }

    #[test]
    fn test_nothing_to_sell_is_bankruptcy() {
        let (mut state, _company) = setup();

        let mut round = ShareSellingRound::new(PlayerId(0), 200);
        let mut report = ReportLog::new();
        let mut moves = MoveSet::new();
        let mut ctx = Ctx {
            state: &mut state,
            moves: &mut moves,
            report: &mut report,
        };
        assert_eq!(round.start(&mut ctx), RoundOutcome::Finished);
        assert!(state.player(PlayerId(0)).bankrupt);
    }

    #[test]
    fn test_running_dry_mid_round_is_bankruptcy() {
        let (mut state, company) = setup();
        give_shares(&mut state, PlayerId(0), company, 1);

        let mut round = ShareSellingRound::new(PlayerId(0), 1_000);
        let mut report = ReportLog::new();
        let mut moves = MoveSet::new();
        let mut ctx = Ctx {
            state: &mut state,
            moves: &mut moves,
            report: &mut report,
        };
        assert_eq!(round.start(&mut ctx), RoundOutcome::Continue);

        let outcome = round
            .process(
                &mut ctx,
                &GameAction::new(
                    PlayerId(0),
                    ActionKind::SellShares { company, count: 1 },
                ),
            )
            .unwrap();

        assert_eq!(outcome, RoundOutcome::Finished);
        assert!(state.player(PlayerId(0)).bankrupt);
        // The proceeds were still paid out before the bankruptcy.
        assert_eq!(
            state.balance(HolderId::Player(PlayerId(0))),
            state.options.starting_cash + 76
        );
    }
}
