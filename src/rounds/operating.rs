//! The operating round.
//!
//! Floated companies operate in descending price order, each walking the
//! same step sequence: lay track, lay a token, declare revenue, buy
//! trains, and optionally trade treasury shares. Private companies pay
//! their fixed revenue to their owners when the round opens.
//!
//! Two situations punch out of the normal flow. A president who cannot
//! cover a mandatory train purchase from company and personal cash
//! triggers a share-selling interrupt, and the purchase is re-applied
//! once the cash is raised. A company entitled to trade its own shares
//! gets a treasury-trading interrupt between buying trains and finishing
//! its turn. Companies pushed over the train limit by a phase change must
//! discard before anything else happens.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::actions::possible::PossibleKind;
use crate::actions::{ActionKind, GameAction, PossibleAction};
use crate::core::{Cash, CompanyId, HexId, HolderId, PortfolioId, PrivateId, RulesError, TileId, TrainId};
use crate::entities::{Allocation, RightKind, TileColour};
use crate::ledger::Holding;
use crate::rounds::{shares, Ctx, InterruptKind, Round, RoundOutcome};
use crate::state::GameState;

/// Declared revenue is not computed from routes; this bounds the entry.
const MAX_DECLARED_REVENUE: Cash = 9_990;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Step {
    LayTrack,
    LayToken,
    CalcRevenue,
    BuyTrain,
    TradeShares,
    Final,
}

pub struct OperatingRound {
    /// False for the pre-stock round that only pays private revenue.
    operating: bool,
    order: Vec<CompanyId>,
    index: usize,
    step: Step,
    /// Remaining tile lays per colour for the current company.
    lays: FxHashMap<TileColour, u8>,
    /// Companies that must shed trains before play continues.
    pending_discards: Vec<CompanyId>,
    done: bool,
}

impl OperatingRound {
    #[must_use]
    pub fn new(operating: bool) -> Self {
        Self {
            operating,
            order: Vec::new(),
            index: 0,
            step: Step::LayTrack,
            lays: FxHashMap::default(),
            pending_discards: Vec::new(),
            done: false,
        }
    }

    #[must_use]
    pub fn current_company(&self) -> Option<CompanyId> {
        (!self.done).then(|| self.order.get(self.index).copied()).flatten()
    }

    fn pay_private_revenue(ctx: &mut Ctx) {
        let privates: Vec<PrivateId> = ctx.state.privates.iter().map(|p| p.id).collect();
        for id in privates {
            if ctx.state.private(id).is_closed() {
                continue;
            }
            let owner = match ctx.state.portfolios.holder_of(Holding::Private(id)) {
                Some(PortfolioId::Player(p)) => HolderId::Player(p),
                Some(PortfolioId::Company(c)) => HolderId::Company(c),
                _ => continue,
            };
            let revenue = ctx.state.private(id).revenue;
            if revenue > 0 {
                ctx.cash(HolderId::Bank, owner, revenue);
                let name = ctx.state.private(id).name.clone();
                ctx.say(format!("{name} pays {revenue} to {owner}"));
            }
        }
    }

    /// Descending market price; earlier ladder entry breaks ties.
    fn operating_order(state: &GameState) -> Vec<CompanyId> {
        let mut order: Vec<CompanyId> = state
            .companies
            .iter()
            .filter(|c| c.has_floated() && !c.is_closed())
            .filter(|c| state.president_player(c.id).is_some())
            .map(|c| c.id)
            .collect();
        order.sort_by_key(|&c| {
            (
                std::cmp::Reverse(state.market_price(c).unwrap_or(0)),
                c.index(),
            )
        });
        order
    }

    fn enter_company(&mut self, ctx: &mut Ctx) {
        let company = self.order[self.index];
        self.step = Step::LayTrack;
        self.lays = ctx
            .state
            .phase()
            .tile_lays
            .iter()
            .copied()
            .collect();
        if let Some(president) = ctx.state.president_player(company) {
            ctx.state.current_player = president;
        }
        let name = ctx.state.company(company).name.clone();
        ctx.say(format!("{name} operates"));
    }

    /// Advance past the current step, applying the skip rules, until a
    /// step that needs input (or the end of the round) is reached.
    fn advance_step(&mut self, ctx: &mut Ctx) -> RoundOutcome {
        loop {
            let company = self.order[self.index];
            self.step = match self.step {
                Step::LayTrack => Step::LayToken,
                Step::LayToken => Step::CalcRevenue,
                Step::CalcRevenue => Step::BuyTrain,
                Step::BuyTrain => Step::TradeShares,
                Step::TradeShares => Step::Final,
                Step::Final => Step::Final,
            };
            match self.step {
                Step::LayTrack => unreachable!(),
                Step::LayToken => {
                    if ctx.state.company(company).base_tokens_free > 0 {
                        return RoundOutcome::Continue;
                    }
                }
                Step::CalcRevenue => {
                    if ctx.state.portfolios.train_count(PortfolioId::Company(company)) == 0 {
                        // A trainless company earns nothing and withholds.
                        self.apply_revenue(ctx, company, 0, Allocation::Withhold);
                    } else {
                        return RoundOutcome::Continue;
                    }
                }
                Step::BuyTrain => return RoundOutcome::Continue,
                Step::TradeShares => {
                    let c = ctx.state.company(company);
                    if c.may_trade_shares && c.has_operated() {
                        return RoundOutcome::Interrupt(InterruptKind::Treasury { company });
                    }
                }
                Step::Final => {
                    ctx.state.company_mut(company).mark_operated();
                    self.index += 1;
                    if self.index >= self.order.len() {
                        self.done = true;
                        ctx.state.current_player = ctx.state.priority_player;
                        ctx.say("operating round ends");
                        return RoundOutcome::Finished;
                    }
                    self.enter_company(ctx);
                    return RoundOutcome::Continue;
                }
            }
        }
    }

    fn apply_revenue(
        &mut self,
        ctx: &mut Ctx,
        company: CompanyId,
        amount: Cash,
        allocation: Allocation,
    ) {
        let name = ctx.state.company(company).name.clone();
        ctx.say(format!("{name} runs for {amount} and {allocation}"));

        let share_count = ctx.state.company(company).share_count();
        let (treasury_part, distributed) = match allocation {
            Allocation::Withhold => (amount, 0),
            Allocation::Payout => (0, amount),
            Allocation::Split => {
                let half = amount / 2;
                let distributed = half - half % 10;
                (amount - distributed, distributed)
            }
        };

        if treasury_part > 0 {
            ctx.cash(HolderId::Bank, HolderId::Company(company), treasury_part);
        }
        if distributed > 0 {
            let per_unit = distributed / share_count as Cash;
            let mut payees: Vec<(HolderId, u8)> = Vec::new();
            for player in 0..ctx.state.player_count() {
                let player = crate::core::PlayerId(player as u8);
                let units = ctx.state.share_units(PortfolioId::Player(player), company);
                if units > 0 {
                    payees.push((HolderId::Player(player), units));
                }
            }
            for holder in ctx.state.companies.iter().map(|c| c.id).collect::<Vec<_>>() {
                let units = ctx.state.share_units(PortfolioId::Company(holder), company);
                if units > 0 {
                    payees.push((HolderId::Company(holder), units));
                }
            }
            let c = ctx.state.company(company);
            if c.ipo_pays_out {
                let units = ctx.state.share_units(PortfolioId::Ipo, company);
                if units > 0 {
                    payees.push((HolderId::Company(company), units));
                }
            }
            if ctx.state.company(company).pool_pays_out {
                let units = ctx.state.share_units(PortfolioId::Pool, company);
                if units > 0 {
                    payees.push((HolderId::Company(company), units));
                }
            }
            for (holder, units) in payees {
                ctx.cash(HolderId::Bank, holder, per_unit * units as Cash);
            }
        }

        // Withholding drops the price; any distribution raises it.
        if let Some(index) = ctx.state.company(company).market_index {
            let moved = if distributed > 0 {
                ctx.state.market.up(index)
            } else {
                ctx.state.market.down(index)
            };
            ctx.move_price(company, moved);
        }

        let c = ctx.state.company_mut(company);
        c.last_revenue = amount;
        c.last_allocation = Some(allocation);
    }

    fn validate_tile_lay(
        &self,
        state: &GameState,
        company: CompanyId,
        hex: HexId,
        tile: TileId,
        right: Option<PrivateId>,
    ) -> Result<(bool, Cash), RulesError> {
        let tile_ref = state.tile(tile).ok_or(RulesError::NotAllowed)?;
        let hex_ref = &state.hexes[hex.index()];

        let required = match hex_ref.tile.and_then(|t| state.tile(t)) {
            Some(current) => current
                .colour
                .upgrade()
                .ok_or(RulesError::Rule("tile cannot be upgraded further"))?,
            None => TileColour::Yellow,
        };
        if tile_ref.colour != required {
            return Err(RulesError::Rule("wrong tile colour for this hex"));
        }
        if !state.phase().allows_colour(tile_ref.colour) {
            return Err(RulesError::Rule("tile colour not available this phase"));
        }

        let mut free = false;
        let mut extra = false;
        if let Some(private) = right {
            let r = state
                .private(private)
                .usable_right()
                .filter(|r| r.kind == RightKind::TileLay)
                .ok_or(RulesError::NotAllowed)?;
            let owner = state.portfolios.holder_of(Holding::Private(private));
            let president = state.president_player(company).map(PortfolioId::Player);
            if owner != Some(PortfolioId::Company(company)) && owner != president {
                return Err(RulesError::NotAllowed);
            }
            if let Some(restricted) = r.hex {
                if restricted != hex {
                    return Err(RulesError::Rule("right does not apply to this hex"));
                }
            }
            free = r.free;
            extra = r.extra;
        }

        if !extra && self.lays.get(&tile_ref.colour).copied().unwrap_or(0) == 0 {
            return Err(RulesError::Rule("no tile lay of that colour left"));
        }

        // Terrain is paid once, on the first tile.
        let cost = if hex_ref.tile.is_none() && !free {
            hex_ref.cost
        } else {
            0
        };
        if state.balance(HolderId::Company(company)) < cost {
            return Err(RulesError::InsufficientCash {
                have: state.balance(HolderId::Company(company)),
                need: cost,
            });
        }
        Ok((extra, cost))
    }

    /// Buy a train from the bank shelf or the pool, always at list price.
    fn buy_listed_train(
        &mut self,
        ctx: &mut Ctx,
        company: CompanyId,
        train: TrainId,
        price: Cash,
        exchange: Option<TrainId>,
        source: PortfolioId,
    ) -> Result<RoundOutcome, RulesError> {
        if !ctx.state.portfolios.is_in(Holding::Train(train), source) {
            return Err(RulesError::NotAllowed);
        }
        let kind_index = ctx.state.train(train).kind;
        let cost = ctx.state.train_kind(train).cost;
        if price != cost {
            return Err(RulesError::Rule("bank trains sell at list price"));
        }

        if let Some(old) = exchange {
            if !ctx
                .state
                .portfolios
                .is_in(Holding::Train(old), PortfolioId::Company(company))
            {
                return Err(RulesError::NotAllowed);
            }
        }

        let treasury = ctx.state.balance(HolderId::Company(company));
        if treasury < cost {
            if ctx.state.portfolios.train_count(PortfolioId::Company(company)) > 0 {
                return Err(RulesError::InsufficientCash {
                    have: treasury,
                    need: cost,
                });
            }
            // Emergency purchase: the president makes up the difference,
            // selling shares first if personal cash is not enough.
            let president = ctx
                .state
                .president_player(company)
                .ok_or_else(|| RulesError::Internal(format!("{company} has no president")))?;
            let personal = ctx.state.free_cash(president);
            if treasury + personal < cost {
                return Ok(RoundOutcome::Interrupt(InterruptKind::ShareSelling {
                    player: president,
                    target: cost - treasury - personal,
                }));
            }
            let contribution = cost - treasury;
            ctx.cash(HolderId::Player(president), HolderId::Company(company), contribution);
            let name = ctx.state.player(president).name.clone();
            ctx.say(format!("{name} contributes {contribution} for the train"));
        }

        ctx.cash(HolderId::Company(company), HolderId::Bank, cost);
        ctx.move_holding(Holding::Train(train), PortfolioId::Company(company))?;
        if let Some(old) = exchange {
            ctx.move_holding(Holding::Train(old), PortfolioId::ScrapHeap)?;
        }

        let kind_name = ctx.state.train_kinds[kind_index].name.clone();
        let name = ctx.state.company(company).name.clone();
        ctx.say(format!("{name} buys a {kind_name} train for {cost}"));

        self.after_bank_purchase(ctx, kind_index);
        Ok(RoundOutcome::Continue)
    }

    /// Phase change, rusting, private closures and the release of the
    /// next train kind.
    fn after_bank_purchase(&mut self, ctx: &mut Ctx, kind_index: usize) {
        let kind_phase = ctx.state.train_kinds[kind_index].phase;
        if kind_phase > ctx.state.phase_index {
            ctx.state.phase_index = kind_phase;
            let phase_name = ctx.state.phase().name.clone();
            ctx.say(format!("phase {phase_name} begins"));

            let rusting: Vec<TrainId> = ctx
                .state
                .trains
                .iter()
                .filter(|t| ctx.state.train_kinds[t.kind].rusted_by == Some(kind_index))
                .filter(|t| {
                    !matches!(
                        ctx.state.portfolios.holder_of(Holding::Train(t.id)),
                        Some(PortfolioId::ScrapHeap) | None
                    )
                })
                .map(|t| t.id)
                .collect();
            for train in rusting {
                if let Err(e) = ctx.move_holding(Holding::Train(train), PortfolioId::ScrapHeap) {
                    log::error!("rusting failed: {e}");
                }
            }

            let closing: Vec<PrivateId> = ctx
                .state
                .privates
                .iter()
                .filter(|p| !p.is_closed())
                .filter(|p| p.closes_at_phase.is_some_and(|phase| phase <= kind_phase))
                .map(|p| p.id)
                .collect();
            for private in closing {
                ctx.state.private_mut(private).close();
                let name = ctx.state.private(private).name.clone();
                ctx.say(format!("{name} closes"));
            }

            self.pending_discards = ctx.state.over_train_limit();
            if let Some(&first) = self.pending_discards.first() {
                if let Some(president) = ctx.state.president_player(first) {
                    ctx.state.current_player = president;
                }
            }
        }

        // When the shelf empties the next kind goes on sale.
        while ctx.state.portfolios.train_count(PortfolioId::Ipo) == 0
            && ctx.state.next_train_release < ctx.state.train_kinds.len()
        {
            let next = ctx.state.next_train_release;
            let released: Vec<TrainId> = ctx
                .state
                .portfolios
                .trains_in(PortfolioId::Unavailable)
                .filter(|&t| ctx.state.train(t).kind == next)
                .collect();
            for train in released {
                if let Err(e) = ctx.move_holding(Holding::Train(train), PortfolioId::Ipo) {
                    log::error!("train release failed: {e}");
                }
            }
            ctx.state.next_train_release += 1;
            let kind_name = ctx.state.train_kinds[next].name.clone();
            ctx.say(format!("{kind_name} trains are now available"));
        }
    }

    fn process_discard(
        &mut self,
        ctx: &mut Ctx,
        train: TrainId,
    ) -> Result<RoundOutcome, RulesError> {
        let company = *self
            .pending_discards
            .first()
            .ok_or(RulesError::WrongStep)?;
        if !ctx
            .state
            .portfolios
            .is_in(Holding::Train(train), PortfolioId::Company(company))
        {
            return Err(RulesError::NotAllowed);
        }
        ctx.move_holding(Holding::Train(train), PortfolioId::ScrapHeap)?;
        let name = ctx.state.company(company).name.clone();
        ctx.say(format!("{name} discards a train"));

        let limit = ctx.state.phase().train_limit as usize;
        if ctx.state.portfolios.train_count(PortfolioId::Company(company)) <= limit {
            self.pending_discards.remove(0);
        }
        let next_player = match self.pending_discards.first() {
            Some(&c) => ctx.state.president_player(c),
            None => self
                .current_company()
                .and_then(|c| ctx.state.president_player(c)),
        };
        if let Some(player) = next_player {
            ctx.state.current_player = player;
        }
        Ok(RoundOutcome::Continue)
    }
}

impl Round for OperatingRound {
    fn name(&self) -> &'static str {
        if self.operating {
            "operating round"
        } else {
            "private revenue round"
        }
    }

    fn start(&mut self, ctx: &mut Ctx) -> RoundOutcome {
        ctx.say(format!("{} begins", self.name()));
        Self::pay_private_revenue(ctx);

        if !self.operating {
            self.done = true;
            return RoundOutcome::Finished;
        }
        self.order = Self::operating_order(ctx.state);
        if self.order.is_empty() {
            self.done = true;
            return RoundOutcome::Finished;
        }
        self.index = 0;
        self.enter_company(ctx);
        RoundOutcome::Continue
    }

    fn process(&mut self, ctx: &mut Ctx, action: &GameAction) -> Result<RoundOutcome, RulesError> {
        // Forced discards take precedence over everything.
        if !self.pending_discards.is_empty() {
            return match action.kind {
                ActionKind::DiscardTrain { train } => self.process_discard(ctx, train),
                _ => Err(RulesError::WrongStep),
            };
        }

        let company = self.current_company().ok_or(RulesError::WrongStep)?;

        match action.kind {
            ActionKind::LayTile {
                hex,
                tile,
                orientation,
                right,
            } => {
                if self.step != Step::LayTrack {
                    return Err(RulesError::WrongStep);
                }
                let (extra, cost) =
                    self.validate_tile_lay(ctx.state, company, hex, tile, right)?;

                let colour = ctx.state.tile(tile).map(|t| t.colour).unwrap_or(TileColour::Yellow);
                if cost > 0 {
                    ctx.cash(HolderId::Company(company), HolderId::Bank, cost);
                }
                {
                    let hex_ref = ctx.state.hex_mut(hex);
                    hex_ref.tile = Some(tile);
                    hex_ref.orientation = orientation;
                }
                let hex_name = ctx.state.hex(hex).name.clone();
                let name = ctx.state.company(company).name.clone();
                ctx.say(format!("{name} lays tile {} on {hex_name}", tile.0));

                if let Some(private) = right {
                    let p = ctx.state.private_mut(private);
                    p.right_used = true;
                    if p.right.as_ref().is_some_and(|r| r.close_on_use) {
                        p.close();
                        let private_name = ctx.state.private(private).name.clone();
                        ctx.say(format!("{private_name} closes"));
                    }
                }
                // Only lays marked extra bypass the per-colour allowance.
                if !extra {
                    if let Some(remaining) = self.lays.get_mut(&colour) {
                        *remaining = remaining.saturating_sub(1);
                    }
                }

                if !extra && self.lays.values().all(|&n| n == 0) {
                    return Ok(self.advance_step(ctx));
                }
                Ok(RoundOutcome::Continue)
            }
            ActionKind::LayToken { hex } => {
                if self.step != Step::LayToken {
                    return Err(RulesError::WrongStep);
                }
                let c = ctx.state.company(company);
                if c.base_tokens_free == 0 {
                    return Err(RulesError::NotAllowed);
                }
                let cost = c.base_token_cost;
                let hex_ref = ctx.state.hex(hex);
                if hex_ref.open_token_slots() == 0 || hex_ref.has_token_of(company) {
                    return Err(RulesError::NotAllowed);
                }
                let treasury = ctx.state.balance(HolderId::Company(company));
                if treasury < cost {
                    return Err(RulesError::InsufficientCash {
                        have: treasury,
                        need: cost,
                    });
                }

                ctx.cash(HolderId::Company(company), HolderId::Bank, cost);
                ctx.state.hex_mut(hex).tokens.push(company);
                ctx.state.company_mut(company).base_tokens_free -= 1;
                let hex_name = ctx.state.hex(hex).name.clone();
                let name = ctx.state.company(company).name.clone();
                ctx.say(format!("{name} places a token on {hex_name}"));
                Ok(self.advance_step(ctx))
            }
            ActionKind::SetRevenue { amount, allocation } => {
                if self.step != Step::CalcRevenue {
                    return Err(RulesError::WrongStep);
                }
                if amount < 0 || amount % 10 != 0 || amount > MAX_DECLARED_REVENUE {
                    return Err(RulesError::InvalidRevenue(amount));
                }
                if amount > 0
                    && ctx.state.portfolios.train_count(PortfolioId::Company(company)) == 0
                {
                    return Err(RulesError::Rule("a company without trains earns nothing"));
                }
                self.apply_revenue(ctx, company, amount, allocation);
                Ok(self.advance_step(ctx))
            }
            ActionKind::BuyTrain {
                train,
                from,
                price,
                exchange,
            } => {
                if self.step != Step::BuyTrain {
                    return Err(RulesError::WrongStep);
                }
                // An exchange scraps the old train, so only a plain purchase
                // is held to the limit.
                if exchange.is_none() {
                    let limit = ctx.state.phase().train_limit as usize;
                    if ctx.state.portfolios.train_count(PortfolioId::Company(company)) >= limit {
                        return Err(RulesError::TrainLimitReached {
                            limit: limit as u8,
                        });
                    }
                }
                match from {
                    PortfolioId::Ipo | PortfolioId::Pool => {
                        self.buy_listed_train(ctx, company, train, price, exchange, from)
                    }
                    PortfolioId::Company(seller) => {
                        if seller == company || exchange.is_some() {
                            return Err(RulesError::NotAllowed);
                        }
                        if !ctx
                            .state
                            .portfolios
                            .is_in(Holding::Train(train), PortfolioId::Company(seller))
                        {
                            return Err(RulesError::NotAllowed);
                        }
                        let treasury = ctx.state.balance(HolderId::Company(company));
                        if price < 1 || price > treasury {
                            return Err(RulesError::InsufficientCash {
                                have: treasury,
                                need: price,
                            });
                        }
                        ctx.cash(
                            HolderId::Company(company),
                            HolderId::Company(seller),
                            price,
                        );
                        ctx.move_holding(Holding::Train(train), PortfolioId::Company(company))?;
                        let name = ctx.state.company(company).name.clone();
                        let seller_name = ctx.state.company(seller).name.clone();
                        ctx.say(format!("{name} buys a train from {seller_name} for {price}"));
                        Ok(RoundOutcome::Continue)
                    }
                    _ => Err(RulesError::NotAllowed),
                }
            }
            ActionKind::Pass => {
                if self.step == Step::BuyTrain {
                    // A trainless company must buy when the treasury, the
                    // president's pocket and forced share sales together
                    // cover the cheapest train.
                    let state = &*ctx.state;
                    if state.portfolios.train_count(PortfolioId::Company(company)) == 0 {
                        if let Some((_, cost)) = state.cheapest_bank_train() {
                            let treasury = state.balance(HolderId::Company(company));
                            let president = state.president_player(company);
                            let personal = president.map_or(0, |p| state.free_cash(p));
                            let raisable: Cash = president.map_or(0, |p| {
                                state
                                    .companies
                                    .iter()
                                    .map(|c| {
                                        Cash::from(shares::max_sellable(state, p, c.id))
                                            * state.market_price(c.id).unwrap_or(0)
                                    })
                                    .sum()
                            });
                            if treasury + personal + raisable >= cost {
                                return Err(RulesError::Rule(
                                    "a company without trains must buy one",
                                ));
                            }
                        }
                    }
                }
                Ok(self.advance_step(ctx))
            }
            _ => Err(RulesError::WrongStep),
        }
    }

    fn possible_actions(&self, state: &GameState) -> Vec<PossibleAction> {
        if let Some(&company) = self.pending_discards.first() {
            let Some(president) = state.president_player(company) else {
                return Vec::new();
            };
            return state
                .portfolios
                .trains_in(PortfolioId::Company(company))
                .map(|train| {
                    PossibleAction::new(president, PossibleKind::DiscardTrain { train })
                })
                .collect();
        }

        let Some(company) = self.current_company() else {
            return Vec::new();
        };
        let Some(president) = state.president_player(company) else {
            return Vec::new();
        };
        let mut actions = Vec::new();
        let treasury = state.balance(HolderId::Company(company));

        match self.step {
            Step::LayTrack => {
                let layable: SmallVec<[HexId; 8]> = state
                    .hexes
                    .iter()
                    .filter(|h| {
                        let colour = match h.tile.and_then(|t| state.tile(t)) {
                            Some(t) => t.colour.upgrade(),
                            None => Some(TileColour::Yellow),
                        };
                        let Some(colour) = colour else { return false };
                        if !state.phase().allows_colour(colour) {
                            return false;
                        }
                        if self.lays.get(&colour).copied().unwrap_or(0) == 0 {
                            return false;
                        }
                        let cost = if h.tile.is_none() { h.cost } else { 0 };
                        treasury >= cost && state.tiles.iter().any(|t| t.colour == colour)
                    })
                    .map(|h| h.id)
                    .collect();
                if !layable.is_empty() {
                    actions.push(PossibleAction::new(
                        president,
                        PossibleKind::LayTile {
                            hexes: layable,
                            right: None,
                        },
                    ));
                }
                // Rights usable by this company or its president.
                for private in &state.privates {
                    let Some(right) = private.usable_right() else {
                        continue;
                    };
                    if right.kind != RightKind::TileLay {
                        continue;
                    }
                    let owner = state.portfolios.holder_of(Holding::Private(private.id));
                    if owner != Some(PortfolioId::Company(company))
                        && owner != Some(PortfolioId::Player(president))
                    {
                        continue;
                    }
                    let hexes: SmallVec<[HexId; 8]> = match right.hex {
                        Some(hex) => std::iter::once(hex).collect(),
                        None => state.hexes.iter().map(|h| h.id).collect(),
                    };
                    actions.push(PossibleAction::new(
                        president,
                        PossibleKind::LayTile {
                            hexes,
                            right: Some(private.id),
                        },
                    ));
                }
            }
            Step::LayToken => {
                if state.company(company).base_tokens_free > 0
                    && treasury >= state.company(company).base_token_cost
                {
                    let hexes: SmallVec<[HexId; 8]> = state
                        .hexes
                        .iter()
                        .filter(|h| h.open_token_slots() > 0 && !h.has_token_of(company))
                        .map(|h| h.id)
                        .collect();
                    if !hexes.is_empty() {
                        actions.push(PossibleAction::new(
                            president,
                            PossibleKind::LayToken { hexes },
                        ));
                    }
                }
            }
            Step::CalcRevenue => {
                actions.push(PossibleAction::new(
                    president,
                    PossibleKind::SetRevenue {
                        max: MAX_DECLARED_REVENUE,
                        may_distribute: true,
                    },
                ));
            }
            Step::BuyTrain => {
                let limit = state.phase().train_limit as usize;
                let owned = state.portfolios.train_count(PortfolioId::Company(company));
                if owned < limit {
                    if let Some((train, cost)) = state.cheapest_bank_train() {
                        let trainless =
                            state.portfolios.train_count(PortfolioId::Company(company)) == 0;
                        // A trainless company may always reach for the
                        // cheapest train; the emergency machinery finds
                        // the money or forces sales.
                        if treasury >= cost || trainless {
                            actions.push(PossibleAction::new(
                                president,
                                PossibleKind::BuyTrain {
                                    train,
                                    from: PortfolioId::Ipo,
                                    min: cost,
                                    max: cost,
                                    exchange: None,
                                },
                            ));
                        }
                    }
                    for other in &state.companies {
                        if other.id == company || !other.has_floated() || other.is_closed() {
                            continue;
                        }
                        for train in state.portfolios.trains_in(PortfolioId::Company(other.id)) {
                            if treasury >= 1 {
                                actions.push(PossibleAction::new(
                                    president,
                                    PossibleKind::BuyTrain {
                                        train,
                                        from: PortfolioId::Company(other.id),
                                        min: 1,
                                        max: treasury,
                                        exchange: None,
                                    },
                                ));
                            }
                        }
                    }
                } else if let Some((train, cost)) = state.cheapest_bank_train() {
                    // At the limit a new train can only replace an old one.
                    if treasury >= cost {
                        for old in state.portfolios.trains_in(PortfolioId::Company(company)) {
                            actions.push(PossibleAction::new(
                                president,
                                PossibleKind::BuyTrain {
                                    train,
                                    from: PortfolioId::Ipo,
                                    min: cost,
                                    max: cost,
                                    exchange: Some(old),
                                },
                            ));
                        }
                    }
                }
            }
            Step::TradeShares | Step::Final => {}
        }

        actions.push(PossibleAction::new(president, PossibleKind::Pass));
        actions
    }

    fn resume(&mut self, ctx: &mut Ctx) -> RoundOutcome {
        if self.step == Step::TradeShares {
            return self.advance_step(ctx);
        }
        RoundOutcome::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{PlayerId, ReportLog};
    use crate::games::demo::DemoGameBuilder;
    use crate::moves::MoveSet;

    struct Fixture {
        state: GameState,
        round: OperatingRound,
        report: ReportLog,
    }

    impl Fixture {
        /// One floated company with player 0 as president.
        fn floated() -> (Self, CompanyId) {
            let mut state = GameState::build(&DemoGameBuilder::new().build()).unwrap();
            let company = state.company_id("Lakeshore Line").unwrap();
            let index = state.market.par_space_at(76).unwrap();
            state.company_mut(company).start(76, index);

            let pres = state.president_cert(company).unwrap();
            state
                .portfolios
                .transfer(Holding::Certificate(pres), PortfolioId::Player(PlayerId(0)))
                .unwrap();
            let certs = state
                .common_certs_for_units(PortfolioId::Ipo, company, 4)
                .unwrap();
            for cert in certs {
                state
                    .portfolios
                    .transfer(Holding::Certificate(cert), PortfolioId::Player(PlayerId(1)))
                    .unwrap();
            }
            state.company_mut(company).float();
            state.cash.fund(HolderId::Company(company), 760);

            let mut fixture = Self {
                state,
                round: OperatingRound::new(true),
                report: ReportLog::new(),
            };
            let mut moves = MoveSet::new();
            let mut ctx = Ctx {
                state: &mut fixture.state,
                moves: &mut moves,
                report: &mut fixture.report,
            };
            fixture.round.start(&mut ctx);
            (fixture, company)
        }

        fn submit(&mut self, player: u8, kind: ActionKind) -> Result<RoundOutcome, RulesError> {
            let mut moves = MoveSet::new();
            let mut ctx = Ctx {
                state: &mut self.state,
                moves: &mut moves,
                report: &mut self.report,
            };
            let result = self
                .round
                .process(&mut ctx, &GameAction::new(PlayerId(player), kind));
            if result.is_err() {
                moves.unwind(&mut self.state);
            }
            result
        }

        fn give_train(&mut self, company: CompanyId) {
            let train = self
                .state
                .portfolios
                .trains_in(PortfolioId::Ipo)
                .next()
                .unwrap();
            self.state
                .portfolios
                .transfer(Holding::Train(train), PortfolioId::Company(company))
                .unwrap();
        }
    }

    #[test]
    fn test_private_revenue_paid_at_start() {
        let mut state = GameState::build(&DemoGameBuilder::new().build()).unwrap();
        let private = state.private_id("Coal Creek Tramway").unwrap();
        state
            .portfolios
            .transfer(Holding::Private(private), PortfolioId::Player(PlayerId(2)))
            .unwrap();
        let revenue = state.private(private).revenue;

        let mut round = OperatingRound::new(false);
        let mut moves = MoveSet::new();
        let mut report = ReportLog::new();
        let mut ctx = Ctx {
            state: &mut state,
            moves: &mut moves,
            report: &mut report,
        };
        let outcome = round.start(&mut ctx);

        // Nothing floats yet, so the non-operating round ends at once.
        assert_eq!(outcome, RoundOutcome::Finished);
        assert_eq!(
            state.balance(HolderId::Player(PlayerId(2))),
            state.options.starting_cash + revenue
        );
    }

    #[test]
    fn test_trainless_company_withholds_zero() {
        let (mut fixture, company) = Fixture::floated();
        let index_before = fixture.state.company(company).market_index.unwrap();

        // Skip track and token; revenue is then forced to zero.
        fixture.submit(0, ActionKind::Pass).unwrap();
        fixture.submit(0, ActionKind::Pass).unwrap();

        assert_eq!(fixture.round.step, Step::BuyTrain);
        assert_eq!(fixture.state.company(company).last_revenue, 0);
        assert_eq!(
            fixture.state.company(company).market_index,
            Some(index_before - 1)
        );
    }

    #[test]
    fn test_payout_distributes_and_raises_price() {
        let (mut fixture, company) = Fixture::floated();
        fixture.give_train(company);
        let index_before = fixture.state.company(company).market_index.unwrap();
        let p0_before = fixture.state.balance(HolderId::Player(PlayerId(0)));
        let p1_before = fixture.state.balance(HolderId::Player(PlayerId(1)));

        fixture.submit(0, ActionKind::Pass).unwrap();
        fixture.submit(0, ActionKind::Pass).unwrap();
        fixture
            .submit(
                0,
                ActionKind::SetRevenue {
                    amount: 100,
                    allocation: Allocation::Payout,
                },
            )
            .unwrap();

        // President holds 20%, player 1 holds 40%; the unsold 40% in the
        // IPO pays nobody.
        assert_eq!(
            fixture.state.balance(HolderId::Player(PlayerId(0))),
            p0_before + 20
        );
        assert_eq!(
            fixture.state.balance(HolderId::Player(PlayerId(1))),
            p1_before + 40
        );
        assert_eq!(
            fixture.state.company(company).market_index,
            Some(index_before + 1)
        );
    }

    #[test]
    fn test_split_rounds_toward_treasury() {
        let (mut fixture, company) = Fixture::floated();
        fixture.give_train(company);
        let treasury_before = fixture.state.balance(HolderId::Company(company));

        fixture.submit(0, ActionKind::Pass).unwrap();
        fixture.submit(0, ActionKind::Pass).unwrap();
        fixture
            .submit(
                0,
                ActionKind::SetRevenue {
                    amount: 70,
                    allocation: Allocation::Split,
                },
            )
            .unwrap();

        // Half of 70 is 35; 30 is distributed, 40 goes to the treasury.
        assert_eq!(
            fixture.state.balance(HolderId::Company(company)),
            treasury_before + 40
        );
    }

    #[test]
    fn test_revenue_must_be_multiple_of_ten() {
        let (mut fixture, company) = Fixture::floated();
        fixture.give_train(company);
        fixture.submit(0, ActionKind::Pass).unwrap();
        fixture.submit(0, ActionKind::Pass).unwrap();

        let err = fixture
            .submit(
                0,
                ActionKind::SetRevenue {
                    amount: 105,
                    allocation: Allocation::Withhold,
                },
            )
            .unwrap_err();
        assert_eq!(err, RulesError::InvalidRevenue(105));
    }

    #[test]
    fn test_buying_out_a_kind_releases_the_next() {
        let (mut fixture, company) = Fixture::floated();
        fixture.submit(0, ActionKind::Pass).unwrap();
        fixture.submit(0, ActionKind::Pass).unwrap();
        assert_eq!(fixture.round.step, Step::BuyTrain);

        // Buy out the entire first kind.
        let first_kind_cost = fixture.state.train_kinds[0].cost;
        let count = fixture.state.train_kinds[0].count;
        fixture
            .state
            .cash
            .fund(HolderId::Company(company), first_kind_cost * count as Cash);
        for _ in 0..count {
            let train = fixture
                .state
                .portfolios
                .trains_in(PortfolioId::Ipo)
                .next()
                .unwrap();
            // The train limit gets in the way of hoarding; scrap a held
            // train to keep the shelf clearing legal.
            let owned = fixture
                .state
                .portfolios
                .train_count(PortfolioId::Company(company));
            if owned >= fixture.state.phase().train_limit as usize {
                let held = fixture
                    .state
                    .portfolios
                    .trains_in(PortfolioId::Company(company))
                    .next()
                    .unwrap();
                fixture
                    .state
                    .portfolios
                    .transfer(Holding::Train(held), PortfolioId::ScrapHeap)
                    .unwrap();
            }
            fixture
                .submit(
                    0,
                    ActionKind::BuyTrain {
                        train,
                        from: PortfolioId::Ipo,
                        price: first_kind_cost,
                        exchange: None,
                    },
                )
                .unwrap();
        }

        // Shelf is empty, so the second kind is on sale now.
        let available: Vec<usize> = fixture
            .state
            .portfolios
            .trains_in(PortfolioId::Ipo)
            .map(|t| fixture.state.train(t).kind)
            .collect();
        assert!(!available.is_empty());
        assert!(available.iter().all(|&k| k == 1));
        assert_eq!(fixture.state.next_train_release, 2);
    }

    #[test]
    fn test_emergency_buy_takes_president_cash() {
        let (mut fixture, company) = Fixture::floated();
        fixture.submit(0, ActionKind::Pass).unwrap();
        fixture.submit(0, ActionKind::Pass).unwrap();

        // Treasury far short of the train price.
        let cost = fixture.state.cheapest_bank_train().unwrap().1;
        let treasury = fixture.state.balance(HolderId::Company(company));
        fixture
            .state
            .cash
            .transfer(HolderId::Company(company), HolderId::Bank, treasury - cost / 2);

        let train = fixture.state.cheapest_bank_train().unwrap().0;
        let p0_before = fixture.state.balance(HolderId::Player(PlayerId(0)));
        fixture
            .submit(
                0,
                ActionKind::BuyTrain {
                    train,
                    from: PortfolioId::Ipo,
                    price: cost,
                    exchange: None,
                },
            )
            .unwrap();

        assert_eq!(
            fixture.state.balance(HolderId::Player(PlayerId(0))),
            p0_before - (cost - cost / 2)
        );
        assert_eq!(
            fixture
                .state
                .portfolios
                .train_count(PortfolioId::Company(company)),
            1
        );
    }

    #[test]
    fn test_emergency_short_of_cash_interrupts() {
        let (mut fixture, company) = Fixture::floated();
        fixture.submit(0, ActionKind::Pass).unwrap();
        fixture.submit(0, ActionKind::Pass).unwrap();

        let cost = fixture.state.cheapest_bank_train().unwrap().1;
        // Strip both treasuries.
        let treasury = fixture.state.balance(HolderId::Company(company));
        fixture
            .state
            .cash
            .transfer(HolderId::Company(company), HolderId::Bank, treasury);
        let personal = fixture.state.balance(HolderId::Player(PlayerId(0)));
        fixture
            .state
            .cash
            .transfer(HolderId::Player(PlayerId(0)), HolderId::Bank, personal - 10);

        let train = fixture.state.cheapest_bank_train().unwrap().0;
        let outcome = fixture
            .submit(
                0,
                ActionKind::BuyTrain {
                    train,
                    from: PortfolioId::Ipo,
                    price: cost,
                    exchange: None,
                },
            )
            .unwrap();

        assert_eq!(
            outcome,
            RoundOutcome::Interrupt(InterruptKind::ShareSelling {
                player: PlayerId(0),
                target: cost - 10,
            })
        );
        // Nothing was executed.
        assert!(fixture.state.portfolios.is_in(Holding::Train(train), PortfolioId::Ipo));
    }

    #[test]
    fn test_trainless_company_cannot_skip_affordable_train() {
        let (mut fixture, _company) = Fixture::floated();
        fixture.submit(0, ActionKind::Pass).unwrap();
        fixture.submit(0, ActionKind::Pass).unwrap();

        let err = fixture.submit(0, ActionKind::Pass).unwrap_err();
        assert_eq!(err, RulesError::Rule("a company without trains must buy one"));
    }

    #[test]
    fn test_tile_lay_pays_terrain_and_consumes_budget() {
        let (mut fixture, company) = Fixture::floated();
        let hex = fixture.state.hex_id("River Crossing").unwrap();
        let cost = fixture.state.hex(hex).cost;
        let tile = fixture
            .state
            .tiles
            .iter()
            .find(|t| t.colour == TileColour::Yellow)
            .unwrap()
            .id;
        let treasury_before = fixture.state.balance(HolderId::Company(company));

        fixture
            .submit(
                0,
                ActionKind::LayTile {
                    hex,
                    tile,
                    orientation: 2,
                    right: None,
                },
            )
            .unwrap();

        assert_eq!(fixture.state.hex(hex).tile, Some(tile));
        assert_eq!(fixture.state.hex(hex).orientation, 2);
        assert_eq!(
            fixture.state.balance(HolderId::Company(company)),
            treasury_before - cost
        );
        // One yellow lay per turn in the opening phase.
        let err = fixture
            .submit(
                0,
                ActionKind::LayTile {
                    hex,
                    tile,
                    orientation: 0,
                    right: None,
                },
            )
            .unwrap_err();
        assert_eq!(err, RulesError::WrongStep);
    }

    #[test]
    fn test_token_lay_costs_and_consumes_slot() {
        let (mut fixture, company) = Fixture::floated();
        let hex = fixture.state.hex_id("Junction City").unwrap();
        // Get past the track step.
        fixture.submit(0, ActionKind::Pass).unwrap();
        assert_eq!(fixture.round.step, Step::LayToken);

        let treasury_before = fixture.state.balance(HolderId::Company(company));
        fixture.submit(0, ActionKind::LayToken { hex }).unwrap();

        assert!(fixture.state.hex(hex).has_token_of(company));
        assert_eq!(
            fixture.state.balance(HolderId::Company(company)),
            treasury_before - fixture.state.company(company).base_token_cost
        );
        assert_eq!(
            fixture.state.company(company).base_tokens_free,
            fixture.state.company(company).base_token_count - 1
        );
    }

    #[test]
    fn test_free_extra_lay_right() {
        let (mut fixture, company) = Fixture::floated();
        let private = fixture.state.private_id("Harbor Branch").unwrap();
        fixture
            .state
            .portfolios
            .transfer(Holding::Private(private), PortfolioId::Player(PlayerId(0)))
            .unwrap();

        let hex = fixture.state.hex_id("River Crossing").unwrap();
        let tile = fixture
            .state
            .tiles
            .iter()
            .find(|t| t.colour == TileColour::Yellow)
            .unwrap()
            .id;
        let treasury_before = fixture.state.balance(HolderId::Company(company));

        fixture
            .submit(
                0,
                ActionKind::LayTile {
                    hex,
                    tile,
                    orientation: 0,
                    right: Some(private),
                },
            )
            .unwrap();

        // Free of terrain cost, and the normal lay budget is untouched.
        assert_eq!(
            fixture.state.balance(HolderId::Company(company)),
            treasury_before
        );
        assert!(fixture.state.private(private).right_used);
        assert_eq!(fixture.round.step, Step::LayTrack);
    }

    #[test]
    fn test_a_second_lay_may_use_another_colour() {
        let (mut fixture, _company) = Fixture::floated();
        // Move to a phase with one yellow and one green lay per turn.
        fixture.state.phase_index = 1;
        fixture.round.lays = fixture.state.phase().tile_lays.iter().copied().collect();

        let junction = fixture.state.hex_id("Junction City").unwrap();
        fixture
            .submit(
                0,
                ActionKind::LayTile {
                    hex: junction,
                    tile: TileId(7),
                    orientation: 0,
                    right: None,
                },
            )
            .unwrap();

        // The yellow allowance is spent, but not the green one.
        let halt = fixture.state.hex_id("Prairie Halt").unwrap();
        let err = fixture
            .submit(
                0,
                ActionKind::LayTile {
                    hex: halt,
                    tile: TileId(8),
                    orientation: 0,
                    right: None,
                },
            )
            .unwrap_err();
        assert_eq!(err, RulesError::Rule("no tile lay of that colour left"));

        let lakeside = fixture.state.hex_id("Lakeside").unwrap();
        fixture
            .submit(
                0,
                ActionKind::LayTile {
                    hex: lakeside,
                    tile: TileId(18),
                    orientation: 0,
                    right: None,
                },
            )
            .unwrap();
        assert_eq!(fixture.state.hex(lakeside).tile, Some(TileId(18)));
        assert_eq!(fixture.round.step, Step::LayToken);
    }

    #[test]
    fn test_right_lay_without_extra_spends_the_allowance() {
        let (mut fixture, _company) = Fixture::floated();
        let private = fixture.state.private_id("Harbor Branch").unwrap();
        fixture
            .state
            .portfolios
            .transfer(Holding::Private(private), PortfolioId::Player(PlayerId(0)))
            .unwrap();
        fixture.state.privates[private.index()]
            .right
            .as_mut()
            .unwrap()
            .extra = false;

        let hex = fixture.state.hex_id("River Crossing").unwrap();
        fixture
            .submit(
                0,
                ActionKind::LayTile {
                    hex,
                    tile: TileId(7),
                    orientation: 0,
                    right: Some(private),
                },
            )
            .unwrap();

        // One yellow lay per turn in this phase, and the right used it up.
        assert!(fixture.state.private(private).right_used);
        assert_eq!(fixture.round.step, Step::LayToken);
    }

    #[test]
    fn test_forced_discard_goes_to_the_scrap_heap() {
        let (mut fixture, company) = Fixture::floated();
        fixture.give_train(company);
        fixture.give_train(company);
        fixture.round.pending_discards = vec![company];

        let train = fixture
            .state
            .portfolios
            .trains_in(PortfolioId::Company(company))
            .next()
            .unwrap();
        fixture
            .submit(0, ActionKind::DiscardTrain { train })
            .unwrap();

        assert!(fixture
            .state
            .portfolios
            .is_in(Holding::Train(train), PortfolioId::ScrapHeap));
        assert!(fixture.round.pending_discards.is_empty());
    }

    #[test]
    fn test_exchange_replaces_a_train_at_the_limit() {
        let (mut fixture, company) = Fixture::floated();
        let limit = fixture.state.phase().train_limit as usize;
        for _ in 0..limit {
            fixture.give_train(company);
        }
        fixture.submit(0, ActionKind::Pass).unwrap();
        fixture.submit(0, ActionKind::Pass).unwrap();
        fixture
            .submit(
                0,
                ActionKind::SetRevenue {
                    amount: 0,
                    allocation: Allocation::Withhold,
                },
            )
            .unwrap();
        assert_eq!(fixture.round.step, Step::BuyTrain);

        let (train, cost) = fixture.state.cheapest_bank_train().unwrap();
        let err = fixture
            .submit(
                0,
                ActionKind::BuyTrain {
                    train,
                    from: PortfolioId::Ipo,
                    price: cost,
                    exchange: None,
                },
            )
            .unwrap_err();
        assert!(matches!(err, RulesError::TrainLimitReached { .. }));

        // The menu offers the purchase as a trade-in instead.
        let menu = fixture.round.possible_actions(&fixture.state);
        assert!(menu
            .iter()
            .any(|p| matches!(p.kind, PossibleKind::BuyTrain { exchange: Some(_), .. })));

        let old = fixture
            .state
            .portfolios
            .trains_in(PortfolioId::Company(company))
            .next()
            .unwrap();
        fixture
            .submit(
                0,
                ActionKind::BuyTrain {
                    train,
                    from: PortfolioId::Ipo,
                    price: cost,
                    exchange: Some(old),
                },
            )
            .unwrap();

        assert!(fixture
            .state
            .portfolios
            .is_in(Holding::Train(old), PortfolioId::ScrapHeap));
        assert!(fixture
            .state
            .portfolios
            .is_in(Holding::Train(train), PortfolioId::Company(company)));
        assert_eq!(
            fixture
                .state
                .portfolios
                .train_count(PortfolioId::Company(company)),
            limit
        );
    }

    #[test]
    fn test_forced_buy_counts_sellable_shares() {
        let (mut fixture, company) = Fixture::floated();
        fixture.submit(0, ActionKind::Pass).unwrap();
        fixture.submit(0, ActionKind::Pass).unwrap();
        assert_eq!(fixture.round.step, Step::BuyTrain);

        // Empty both the treasury and the president's pocket; the
        // president's own shares could still pay for the train.
        let treasury = fixture.state.balance(HolderId::Company(company));
        fixture
            .state
            .cash
            .transfer(HolderId::Company(company), HolderId::Bank, treasury);
        let personal = fixture.state.balance(HolderId::Player(PlayerId(0)));
        fixture
            .state
            .cash
            .transfer(HolderId::Player(PlayerId(0)), HolderId::Bank, personal);

        let err = fixture.submit(0, ActionKind::Pass).unwrap_err();
        assert_eq!(
            err,
            RulesError::Rule("a company without trains must buy one")
        );
    }
}
