//! The treasury share-trading round.
//!
//! Companies entitled to trade their own shares get this round spliced
//! into their operating turn. Buying and selling are mutually exclusive
//! within one visit: once the company buys it may only keep buying, and
//! vice versa. Trades happen at market price against the pool.

use crate::actions::possible::PossibleKind;
use crate::actions::{ActionKind, GameAction, PossibleAction};
use crate::core::{CompanyId, HolderId, PortfolioId, RulesError};
use crate::ledger::Holding;
use crate::rounds::{shares, Ctx, Round, RoundOutcome};
use crate::state::GameState;

pub struct TreasuryShareRound {
    company: CompanyId,
    bought: bool,
    sold: bool,
}

impl TreasuryShareRound {
    #[must_use]
    pub fn new(company: CompanyId) -> Self {
        Self {
            company,
            bought: false,
            sold: false,
        }
    }

    fn pool_cert(&self, state: &GameState) -> Option<crate::core::CertId> {
        state
            .company_certs_in(PortfolioId::Pool, self.company)
            .into_iter()
            .find(|&c| !state.certificate(c).president)
    }

    fn may_buy(&self, state: &GameState) -> bool {
        if self.sold {
            return false;
        }
        let Some(cert) = self.pool_cert(state) else {
            return false;
        };
        let c = state.company(self.company);
        let unit = c.share_unit;
        let after = state.percent_of(PortfolioId::Company(self.company), self.company)
            + state.certificate(cert).shares * unit;
        if after > state.options.treasury_share_limit {
            return false;
        }
        let price = shares::cert_price(state, cert, PortfolioId::Pool);
        state.balance(HolderId::Company(self.company)) >= price
    }

    fn max_sell(&self, state: &GameState) -> u8 {
        if self.bought {
            return 0;
        }
        let c = state.company(self.company);
        let held = state.share_units(PortfolioId::Company(self.company), self.company);
        let pool_room = (state.options.pool_share_limit
            - state.percent_of(PortfolioId::Pool, self.company))
            / c.share_unit;
        held.min(pool_room)
    }
}

impl Round for TreasuryShareRound {
    fn name(&self) -> &'static str {
        "treasury share trading"
    }

    fn start(&mut self, ctx: &mut Ctx) -> RoundOutcome {
        if let Some(president) = ctx.state.president_player(self.company) {
            ctx.state.current_player = president;
        }
        if !self.may_buy(ctx.state) && self.max_sell(ctx.state) == 0 {
            return RoundOutcome::Finished;
        }
        let name = ctx.state.company(self.company).name.clone();
        ctx.say(format!("{name} may trade its own shares"));
        RoundOutcome::Continue
    }

    fn process(&mut self, ctx: &mut Ctx, action: &GameAction) -> Result<RoundOutcome, RulesError> {
        match action.kind {
            ActionKind::BuyTreasuryShare { company } if company == self.company => {
                if !self.may_buy(ctx.state) {
                    return Err(RulesError::NotAllowed);
                }
                let cert = self
                    .pool_cert(ctx.state)
                    .ok_or(RulesError::NotAllowed)?;
                let price = shares::cert_price(ctx.state, cert, PortfolioId::Pool);

                ctx.move_holding(
                    Holding::Certificate(cert),
                    PortfolioId::Company(self.company),
                )?;
                ctx.cash(HolderId::Company(self.company), HolderId::Bank, price);
                let name = ctx.state.company(self.company).name.clone();
                ctx.say(format!("{name} buys one of its own shares for {price}"));

                self.bought = true;
                Ok(RoundOutcome::Continue)
            }
            ActionKind::SellTreasuryShares { company, count } if company == self.company => {
                if self.bought {
                    return Err(RulesError::NotAllowed);
                }
                shares::execute_share_sale(
                    ctx,
                    PortfolioId::Company(self.company),
                    self.company,
                    count,
                )?;
                self.sold = true;
                Ok(RoundOutcome::Continue)
            }
            ActionKind::Pass => Ok(RoundOutcome::Finished),
            _ => Err(RulesError::WrongStep),
        }
    }

    fn possible_actions(&self, state: &GameState) -> Vec<PossibleAction> {
        let Some(president) = state.president_player(self.company) else {
            return Vec::new();
        };
        let mut actions = Vec::new();

        if self.may_buy(state) {
            let price = self
                .pool_cert(state)
                .map_or(0, |cert| shares::cert_price(state, cert, PortfolioId::Pool));
            actions.push(PossibleAction::new(
                president,
                PossibleKind::BuyTreasuryShare {
                    company: self.company,
                    price,
                },
            ));
        }
        let max = self.max_sell(state);
        if max > 0 {
            actions.push(PossibleAction::new(
                president,
                PossibleKind::SellTreasuryShares {
                    company: self.company,
                    max,
                },
            ));
        }
        actions.push(PossibleAction::new(president, PossibleKind::Pass));
        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{PlayerId, ReportLog};
    use crate::games::demo::DemoGameBuilder;
    use crate::moves::MoveSet;

    fn setup() -> (GameState, CompanyId) {
        let mut state = GameState::build(&DemoGameBuilder::new().build()).unwrap();
        // Great Plains Railroad is the company allowed to trade treasury
        // shares in the demo setup.
        let company = state.company_id("Great Plains Railroad").unwrap();
        let index = state.market.par_space_at(76).unwrap();
        state.company_mut(company).start(76, index);
        state.company_mut(company).float();
        state.cash.fund(HolderId::Company(company), 500);

        let pres = state.president_cert(company).unwrap();
        state
            .portfolios
            .transfer(Holding::Certificate(pres), PortfolioId::Player(PlayerId(0)))
            .unwrap();
        (state, company)
    }

    fn submit(
        state: &mut GameState,
        round: &mut TreasuryShareRound,
        kind: ActionKind,
    ) -> Result<RoundOutcome, RulesError> {
        let mut moves = MoveSet::new();
        let mut report = ReportLog::new();
        let mut ctx = Ctx {
            state,
            moves: &mut moves,
            report: &mut report,
        };
        let result = round.process(&mut ctx, &GameAction::new(PlayerId(0), kind));
        if result.is_err() {
            moves.unwind(state);
        }
        result
    }

    #[test]
    fn test_buy_own_share_from_pool() {
        let (mut state, company) = setup();
        // Put one share in the pool.
        let cert = state
            .common_certs_for_units(PortfolioId::Ipo, company, 1)
            .unwrap()[0];
        state
            .portfolios
            .transfer(Holding::Certificate(cert), PortfolioId::Pool)
            .unwrap();

        let mut round = TreasuryShareRound::new(company);
        submit(&mut state, &mut round, ActionKind::BuyTreasuryShare { company }).unwrap();

        assert_eq!(
            state.percent_of(PortfolioId::Company(company), company),
            10
        );
        assert_eq!(state.balance(HolderId::Company(company)), 500 - 76);

        // Mutual lockout: no selling after buying.
        let err = submit(
            &mut state,
            &mut round,
            ActionKind::SellTreasuryShares { company, count: 1 },
        )
        .unwrap_err();
        assert_eq!(err, RulesError::NotAllowed);
    }

    #[test]
    fn test_sell_treasury_shares_drops_price() {
        let (mut state, company) = setup();
        let certs = state
            .common_certs_for_units(PortfolioId::Ipo, company, 2)
            .unwrap();
        for cert in certs {
            state
                .portfolios
                .transfer(Holding::Certificate(cert), PortfolioId::Company(company))
                .unwrap();
        }
        let index = state.company(company).market_index.unwrap();

        let mut round = TreasuryShareRound::new(company);
        submit(
            &mut state,
            &mut round,
            ActionKind::SellTreasuryShares { company, count: 2 },
        )
        .unwrap();

        assert_eq!(state.balance(HolderId::Company(company)), 500 + 152);
        assert_eq!(state.company(company).market_index, Some(index - 2));
        assert_eq!(state.percent_of(PortfolioId::Pool, company), 20);

        // And no buying back afterwards.
        let err = submit(&mut state, &mut round, ActionKind::BuyTreasuryShare { company })
            .unwrap_err();
        assert_eq!(err, RulesError::NotAllowed);
    }

    #[test]
    fn test_pass_finishes() {
        let (mut state, company) = setup();
        let mut round = TreasuryShareRound::new(company);
        let outcome = submit(&mut state, &mut round, ActionKind::Pass).unwrap();
        assert_eq!(outcome, RoundOutcome::Finished);
    }
}
