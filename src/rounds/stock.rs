//! The stock round.
//!
//! Each turn a player may sell share bundles and make one purchase, in the
//! order the sell-buy rule allows. Passing with nothing done counts toward
//! ending the round; once every player passes in a row the round ends,
//! sold-out companies get their price bumped, and priority for the next
//! round goes to the player after the last one to act.

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::actions::possible::PossibleKind;
use crate::actions::{ActionKind, GameAction, PossibleAction};
use crate::core::{Cash, CertId, CompanyId, PlayerId, PortfolioId, RulesError};
use crate::definition::SellBuyOrder;
use crate::rounds::{shares, Ctx, Round, RoundOutcome};
use crate::state::GameState;

/// What the current player has done so far this turn.
#[derive(Clone, Debug, Default)]
struct Turn {
    bought: Option<CompanyId>,
    sold_before_buy: bool,
    sold_after_buy: bool,
}

impl Turn {
    fn acted(&self) -> bool {
        self.bought.is_some() || self.sold_before_buy || self.sold_after_buy
    }
}

pub struct StockRound {
    /// Selling is disallowed in the very first stock round of the game.
    sells_allowed: bool,
    passes: usize,
    turn: Turn,
    /// Companies each player sold this round; they may not buy them back.
    sold_this_round: FxHashMap<PlayerId, FxHashSet<CompanyId>>,
    last_actor: Option<PlayerId>,
}

impl StockRound {
    #[must_use]
    pub fn new(sells_allowed: bool) -> Self {
        Self {
            sells_allowed,
            passes: 0,
            turn: Turn::default(),
            sold_this_round: FxHashMap::default(),
            last_actor: None,
        }
    }

    fn next_player(state: &GameState, player: PlayerId) -> PlayerId {
        PlayerId(((player.index() + 1) % state.player_count()) as u8)
    }

    fn may_sell_now(&self, order: SellBuyOrder) -> bool {
        if !self.sells_allowed {
            return false;
        }
        match order {
            SellBuyOrder::SellBuySell => true,
            SellBuyOrder::SellBuy => self.turn.bought.is_none(),
            SellBuyOrder::SellBuyOrBuySell => {
                self.turn.bought.is_none() || !self.turn.sold_before_buy
            }
        }
    }

    fn may_buy_company(&self, state: &GameState, player: PlayerId, company: CompanyId) -> bool {
        if self
            .sold_this_round
            .get(&player)
            .is_some_and(|sold| sold.contains(&company))
        {
            return false;
        }
        match self.turn.bought {
            None => true,
            // A second buy is only ever a repeat of the same company in
            // the deepest price band.
            Some(bought) => {
                bought == company
                    && state
                        .market_zone(company)
                        .is_some_and(|zone| zone.unlimited_buys())
            }
        }
    }

    fn check_limits_for_buy(
        &self,
        state: &GameState,
        player: PlayerId,
        company: CompanyId,
        added_shares: u8,
    ) -> Result<(), RulesError> {
        let zone = state.market_zone(company);

        if zone.is_none_or(|z| z.counts_for_cert_limit())
            && state.cert_count_for_limit(player) >= state.options.cert_limit
        {
            return Err(RulesError::CertLimitReached {
                limit: state.options.cert_limit,
            });
        }

        if !zone.is_some_and(|z| z.ignores_hold_limit()) {
            let unit = state.company(company).share_unit;
            let after =
                state.percent_of(PortfolioId::Player(player), company) + added_shares * unit;
            if after > state.options.player_hold_limit {
                return Err(RulesError::HoldLimitReached {
                    limit: state.options.player_hold_limit,
                });
            }
        }
        Ok(())
    }

    fn pay_check(state: &GameState, player: PlayerId, price: Cash) -> Result<(), RulesError> {
        let free = state.free_cash(player);
        if free < price {
            return Err(RulesError::InsufficientCash {
                have: free,
                need: price,
            });
        }
        Ok(())
    }

    fn end_turn(&mut self, state: &mut GameState) {
        if self.turn.acted() {
            self.last_actor = Some(state.current_player);
            self.passes = 0;
        } else {
            self.passes += 1;
        }
        self.turn = Turn::default();
        state.current_player = Self::next_player(state, state.current_player);
    }

    /// Round-end bookkeeping: sold-out companies rise, priority moves on.
    fn finish(&mut self, ctx: &mut Ctx) -> RoundOutcome {
        let sold_out: Vec<CompanyId> = ctx
            .state
            .companies
            .iter()
            .filter(|c| {
                c.has_started()
                    && !c.is_closed()
                    && ctx.state.share_units(PortfolioId::Ipo, c.id) == 0
                    && ctx.state.share_units(PortfolioId::Pool, c.id) == 0
            })
            .map(|c| c.id)
            .collect();
        for company in sold_out {
            if let Some(index) = ctx.state.company(company).market_index {
                let bumped = ctx.state.market.up(index);
                ctx.move_price(company, bumped);
                let name = ctx.state.company(company).name.clone();
                ctx.say(format!("{name} is sold out and rises"));
            }
        }

        if let Some(last) = self.last_actor {
            ctx.state.priority_player = Self::next_player(ctx.state, last);
        }
        ctx.state.current_player = ctx.state.priority_player;
        ctx.say("stock round ends");
        RoundOutcome::Finished
    }

    fn first_buyable_cert(
        state: &GameState,
        company: CompanyId,
        from: PortfolioId,
    ) -> Option<CertId> {
        state
            .company_certs_in(from, company)
            .into_iter()
            .find(|&c| !state.certificate(c).president)
    }
}

impl Round for StockRound {
    fn name(&self) -> &'static str {
        "stock round"
    }

    fn start(&mut self, ctx: &mut Ctx) -> RoundOutcome {
        ctx.state.current_player = ctx.state.priority_player;
        ctx.say("stock round begins");
        RoundOutcome::Continue
    }

    fn process(&mut self, ctx: &mut Ctx, action: &GameAction) -> Result<RoundOutcome, RulesError> {
        let player = action.player;
        match action.kind {
            ActionKind::StartCompany { company, par } => {
                if !self.may_buy_company(ctx.state, player, company) || self.turn.bought.is_some() {
                    return Err(RulesError::NotAllowed);
                }
                if ctx.state.company(company).has_started() {
                    return Err(RulesError::AlreadyStarted(
                        ctx.state.company(company).name.clone(),
                    ));
                }
                let index = ctx
                    .state
                    .market
                    .par_space_at(par)
                    .ok_or(RulesError::InvalidParPrice(par))?;
                let pres_cert = ctx
                    .state
                    .president_cert(company)
                    .filter(|&c| {
                        ctx.state
                            .portfolios
                            .is_in(crate::ledger::Holding::Certificate(c), PortfolioId::Ipo)
                    })
                    .ok_or(RulesError::NotAllowed)?;

                let shares = ctx.state.certificate(pres_cert).shares;
                self.check_limits_for_buy(ctx.state, player, company, shares)?;
                Self::pay_check(ctx.state, player, par * shares as Cash)?;

                ctx.state.company_mut(company).start(par, index);
                let name = ctx.state.company(company).name.clone();
                ctx.say(format!("{name} starts at a par of {par}"));
                shares::execute_cert_buy(
                    ctx,
                    PortfolioId::Player(player),
                    pres_cert,
                    PortfolioId::Ipo,
                )?;

                self.turn.bought = Some(company);
                Ok(RoundOutcome::Continue)
            }
            ActionKind::BuyCertificate { cert, from } => {
                let company = ctx.state.certificate(cert).company;
                if !self.may_buy_company(ctx.state, player, company) {
                    return Err(RulesError::NotAllowed);
                }
                if ctx.state.certificate(cert).president
                    || !ctx.state.portfolios.is_in(
                        crate::ledger::Holding::Certificate(cert),
                        from,
                    )
                {
                    return Err(RulesError::NotAllowed);
                }
                if !ctx.state.company(company).has_started() {
                    return Err(RulesError::NotStarted(
                        ctx.state.company(company).name.clone(),
                    ));
                }

                let shares = ctx.state.certificate(cert).shares;
                self.check_limits_for_buy(ctx.state, player, company, shares)?;
                Self::pay_check(ctx.state, player, shares::cert_price(ctx.state, cert, from))?;

                shares::execute_cert_buy(ctx, PortfolioId::Player(player), cert, from)?;
                self.turn.bought = Some(company);
                Ok(RoundOutcome::Continue)
            }
            ActionKind::SellShares { company, count } => {
                if !self.may_sell_now(ctx.state.options.sell_buy_order) {
                    return Err(RulesError::NotAllowed);
                }
                if self.turn.bought == Some(company) {
                    return Err(RulesError::Rule(
                        "cannot sell a company bought this turn",
                    ));
                }
                shares::execute_share_sale(ctx, PortfolioId::Player(player), company, count)?;

                if self.turn.bought.is_some() {
                    self.turn.sold_after_buy = true;
                } else {
                    self.turn.sold_before_buy = true;
                }
                self.sold_this_round
                    .entry(player)
                    .or_default()
                    .insert(company);
                Ok(RoundOutcome::Continue)
            }
            ActionKind::Pass => {
                self.end_turn(ctx.state);
                if self.passes == ctx.state.player_count() {
                    return Ok(self.finish(ctx));
                }
                Ok(RoundOutcome::Continue)
            }
            _ => Err(RulesError::WrongStep),
        }
    }

    fn possible_actions(&self, state: &GameState) -> Vec<PossibleAction> {
        let player = state.current_player;
        let mut actions = Vec::new();
        let buyable = self.turn.bought.is_none()
            || self
                .turn
                .bought
                .is_some_and(|c| state.market_zone(c).is_some_and(|z| z.unlimited_buys()));

        if buyable {
            // New companies.
            for company in &state.companies {
                if company.has_started() || company.is_closed() {
                    continue;
                }
                if !self.may_buy_company(state, player, company.id) || self.turn.bought.is_some() {
                    continue;
                }
                let Some(pres) = state.president_cert(company.id) else {
                    continue;
                };
                if !state
                    .portfolios
                    .is_in(crate::ledger::Holding::Certificate(pres), PortfolioId::Ipo)
                {
                    continue;
                }
                let shares = state.certificate(pres).shares;
                if self
                    .check_limits_for_buy(state, player, company.id, shares)
                    .is_err()
                {
                    continue;
                }
                let prices: SmallVec<[Cash; 8]> = shares::par_prices(state)
                    .into_iter()
                    .filter(|&par| state.free_cash(player) >= par * shares as Cash)
                    .collect();
                if !prices.is_empty() {
                    actions.push(PossibleAction::new(
                        player,
                        PossibleKind::StartCompany {
                            company: company.id,
                            prices,
                        },
                    ));
                }
            }

            // Existing certificates, one representative per source.
            for company in &state.companies {
                if !company.has_started() || company.is_closed() {
                    continue;
                }
                if !self.may_buy_company(state, player, company.id) {
                    continue;
                }
                let sources = [
                    PortfolioId::Ipo,
                    PortfolioId::Pool,
                    PortfolioId::Company(company.id),
                ];
                for from in sources {
                    let Some(cert) = Self::first_buyable_cert(state, company.id, from) else {
                        continue;
                    };
                    let shares = state.certificate(cert).shares;
                    if self
                        .check_limits_for_buy(state, player, company.id, shares)
                        .is_err()
                    {
                        continue;
                    }
                    let price = shares::cert_price(state, cert, from);
                    if state.free_cash(player) >= price {
                        actions.push(PossibleAction::new(
                            player,
                            PossibleKind::BuyCertificate { cert, from, price },
                        ));
                    }
                }
            }
        }

        if self.may_sell_now(state.options.sell_buy_order) {
            for company in &state.companies {
                if !company.has_started() || self.turn.bought == Some(company.id) {
                    continue;
                }
                let held = state.share_units(PortfolioId::Player(player), company.id);
                if held == 0 {
                    continue;
                }
                let unit = company.share_unit;
                let pool_room = (state.options.pool_share_limit
                    - state.percent_of(PortfolioId::Pool, company.id))
                    / unit;
                let max = held.min(pool_room);
                if max > 0 {
                    actions.push(PossibleAction::new(
                        player,
                        PossibleKind::SellShares {
                            company: company.id,
                            max,
                        },
                    ));
                }
            }
        }

        actions.push(PossibleAction::new(player, PossibleKind::Pass));
        actions
    }
}
