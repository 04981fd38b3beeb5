//! The initial sale round.
//!
//! The start packet is sold in order: the first unsold item may be bought
//! outright at its current price, later items are bid on. Bid money is
//! blocked, not paid, until the item resolves. When the item in front of a
//! bid-carrying item sells, that item resolves: a lone bid wins at once, two
//! or more bids trigger an auction among the bidders.
//!
//! An all-pass turn knocks the asking price of the first item down by the
//! configured decrement; at zero the item is handed to the player whose
//! turn it is, for free. With no decrement configured an all-pass turn
//! ends the round instead.
//!
//! Items can carry a bundled certificate. A president certificate of a
//! company with no preset par price suspends everything until the new
//! president picks one.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::actions::{ActionKind, GameAction, PossibleAction};
use crate::actions::possible::PossibleKind;
use crate::core::{Cash, CompanyId, HolderId, PlayerId, PortfolioId, RulesError, StartItemId};
use crate::ledger::Holding;
use crate::rounds::{shares, Ctx, Round, RoundOutcome};
use crate::state::GameState;

#[derive(Clone, Debug)]
struct Auction {
    item: StartItemId,
    /// Bidders still in, in bidding order.
    bidders: Vec<PlayerId>,
    /// Index into `bidders` of whoever must raise or drop out.
    turn: usize,
}

#[derive(Default)]
pub struct StartRound {
    /// Consecutive passes outside an auction.
    passes: usize,
    /// Blocked bids per item, in arrival order. One entry per player.
    bids: FxHashMap<StartItemId, Vec<(PlayerId, Cash)>>,
    auction: Option<Auction>,
    /// Set while a bundled president certificate waits for its par price.
    pending_par: Option<(PlayerId, CompanyId)>,
    done: bool,
}

impl StartRound {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn high_bid(&self, item: StartItemId) -> Option<(PlayerId, Cash)> {
        self.bids
            .get(&item)
            .and_then(|bids| bids.iter().max_by_key(|(_, amount)| amount))
            .copied()
    }

    fn bid_of(&self, item: StartItemId, player: PlayerId) -> Cash {
        self.bids
            .get(&item)
            .and_then(|bids| bids.iter().find(|(p, _)| *p == player))
            .map_or(0, |(_, amount)| *amount)
    }

    fn minimum_bid(&self, state: &GameState, item: StartItemId) -> Cash {
        let base = state.start_item(item).price;
        let high = self.high_bid(item).map_or(0, |(_, amount)| amount);
        base.max(high) + state.options.bid_increment
    }

    fn next_player(state: &GameState, player: PlayerId) -> PlayerId {
        PlayerId(((player.index() + 1) % state.player_count()) as u8)
    }

    fn advance_turn(&mut self, state: &mut GameState) {
        state.current_player = Self::next_player(state, state.current_player);
    }

    /// Release a player's blocked bid on an item, if any.
    fn release_bid(&mut self, ctx: &mut Ctx, item: StartItemId, player: PlayerId) {
        let amount = self.bid_of(item, player);
        if amount > 0 {
            ctx.block_cash(player, -amount);
            if let Some(bids) = self.bids.get_mut(&item) {
                bids.retain(|(p, _)| *p != player);
            }
        }
    }

    /// Hand `item` to `player` for `price` and deal with its contents.
    fn award(
        &mut self,
        ctx: &mut Ctx,
        item: StartItemId,
        player: PlayerId,
        price: Cash,
    ) -> Result<(), RulesError> {
        self.release_bid(ctx, item, player);
        ctx.cash(HolderId::Player(player), HolderId::Bank, price);

        let private = ctx.state.start_item(item).private;
        ctx.move_holding(Holding::Private(private), PortfolioId::Player(player))?;
        ctx.state.start_item_mut(item).mark_sold();

        let name = ctx.state.private(private).name.clone();
        let buyer = ctx.state.player(player).name.clone();
        ctx.say(format!("{buyer} buys {name} for {price}"));

        if let Some(cert) = ctx.state.start_item(item).extra_cert {
            ctx.move_holding(Holding::Certificate(cert), PortfolioId::Player(player))?;
            let company = ctx.state.certificate(cert).company;
            let is_president = ctx.state.certificate(cert).president;

            if is_president && !ctx.state.company(company).has_started() {
                match ctx.state.company(company).fixed_par {
                    Some(par) => self.start_company(ctx, company, par)?,
                    // Everything waits until the par price is chosen.
                    None => self.pending_par = Some((player, company)),
                }
            }
        }

        // The next player opens the next turn of the round.
        ctx.state.priority_player = Self::next_player(ctx.state, player);
        Ok(())
    }

    fn start_company(&mut self, ctx: &mut Ctx, company: CompanyId, par: Cash) -> Result<(), RulesError> {
        let index = ctx
            .state
            .market
            .par_space_at(par)
            .ok_or(RulesError::InvalidParPrice(par))?;
        ctx.state.company_mut(company).start(par, index);
        let name = ctx.state.company(company).name.clone();
        ctx.say(format!("{name} starts at a par of {par}"));
        shares::check_flotation(ctx, company);
        Ok(())
    }

    /// Resolve bid-carrying items now at the front of the packet. Stops
    /// when an auction opens, a par price is owed, or the front item has
    /// no bids.
    fn resolve_front(&mut self, ctx: &mut Ctx) -> Result<(), RulesError> {
        while self.pending_par.is_none() && self.auction.is_none() {
            let Some(item) = ctx.state.first_unsold_item() else {
                break;
            };
            let bids = self.bids.get(&item).cloned().unwrap_or_default();
            match bids.len() {
                0 => break,
                1 => {
                    let (player, amount) = bids[0];
                    self.award(ctx, item, player, amount)?;
                }
                _ => {
                    let high = self.high_bid(item).map(|(p, _)| p);
                    let bidders: Vec<PlayerId> = bids.iter().map(|(p, _)| *p).collect();
                    // The bidder after the current high opens the auction.
                    let turn = high
                        .and_then(|p| bidders.iter().position(|&b| b == p))
                        .map_or(0, |i| (i + 1) % bidders.len());
                    ctx.state.current_player = bidders[turn];
                    self.auction = Some(Auction {
                        item,
                        bidders,
                        turn,
                    });
                    let name = ctx
                        .state
                        .private(ctx.state.start_item(item).private)
                        .name
                        .clone();
                    ctx.say(format!("auction for {name}"));
                }
            }
        }
        Ok(())
    }

    /// Decide whose turn it is after a resolution cascade.
    fn post_resolution(&mut self, state: &mut GameState) {
        if let Some((owner, _)) = self.pending_par {
            state.current_player = owner;
        } else if self.auction.is_none() {
            state.current_player = state.priority_player;
        }
    }

    fn outcome(&mut self, ctx: &mut Ctx) -> RoundOutcome {
        if self.pending_par.is_none()
            && self.auction.is_none()
            && !ctx.state.unsold_start_items_remain()
        {
            self.done = true;
            ctx.state.current_player = ctx.state.priority_player;
            return RoundOutcome::Finished;
        }
        RoundOutcome::Continue
    }

    fn process_bid(
        &mut self,
        ctx: &mut Ctx,
        player: PlayerId,
        item: StartItemId,
        amount: Cash,
    ) -> Result<(), RulesError> {
        if ctx.state.start_item(item).is_sold() {
            return Err(RulesError::NotAllowed);
        }
        let unit = ctx.state.options.bid_increment;
        if amount % unit != 0 {
            return Err(RulesError::BidNotMultiple { bid: amount, unit });
        }
        let min = self.minimum_bid(ctx.state, item);
        if amount < min {
            return Err(RulesError::BidTooLow { bid: amount, min });
        }
        let previous = self.bid_of(item, player);
        let extra = amount - previous;
        let free = ctx.state.free_cash(player);
        if free < extra {
            return Err(RulesError::InsufficientCash {
                have: free,
                need: extra,
            });
        }

        ctx.block_cash(player, extra);
        let bids = self.bids.entry(item).or_default();
        bids.retain(|(p, _)| *p != player);
        bids.push((player, amount));

        let name = ctx
            .state
            .private(ctx.state.start_item(item).private)
            .name
            .clone();
        let bidder = ctx.state.player(player).name.clone();
        ctx.say(format!("{bidder} bids {amount} for {name}"));
        Ok(())
    }

    /// An all-pass turn outside an auction.
    fn all_passed(&mut self, ctx: &mut Ctx) -> Result<(), RulesError> {
        self.passes = 0;
        let Some(item) = ctx.state.first_unsold_item() else {
            return Ok(());
        };
        let decrement = ctx.state.options.buy_price_decrement;
        if decrement == 0 {
            // Nothing moves; the round gives up on the rest of the packet.
            self.done = true;
            return Ok(());
        }

        let price = (ctx.state.start_item(item).price - decrement).max(0);
        ctx.state.start_item_mut(item).price = price;
        let name = ctx
            .state
            .private(ctx.state.start_item(item).private)
            .name
            .clone();
        ctx.say(format!("nobody wants {name}; price falls to {price}"));

        if price == 0 {
            let player = ctx.state.current_player;
            self.award(ctx, item, player, 0)?;
            self.resolve_front(ctx)?;
            self.post_resolution(ctx.state);
        }
        Ok(())
    }
}

impl Round for StartRound {
    fn name(&self) -> &'static str {
        "start round"
    }

    fn start(&mut self, ctx: &mut Ctx) -> RoundOutcome {
        ctx.say("start round begins");
        if !ctx.state.unsold_start_items_remain() {
            self.done = true;
            return RoundOutcome::Finished;
        }
        RoundOutcome::Continue
    }

    fn process(&mut self, ctx: &mut Ctx, action: &GameAction) -> Result<RoundOutcome, RulesError> {
        let player = action.player;

        // A pending par price blocks every other action.
        if let Some((owner, company)) = self.pending_par {
            return match action.kind {
                ActionKind::SetSharePrice {
                    company: a_company,
                    par,
                } if a_company == company && player == owner => {
                    self.start_company(ctx, company, par)?;
                    self.pending_par = None;
                    self.resolve_front(ctx)?;
                    self.post_resolution(ctx.state);
                    Ok(self.outcome(ctx))
                }
                _ => Err(RulesError::WrongStep),
            };
        }

        if let Some(auction) = self.auction.clone() {
            match action.kind {
                ActionKind::Bid { item, amount } if item == auction.item => {
                    self.process_bid(ctx, player, item, amount)?;
                    let mut auction = self.auction.take().unwrap_or(auction);
                    auction.turn = (auction.turn + 1) % auction.bidders.len();
                    ctx.state.current_player = auction.bidders[auction.turn];
                    self.auction = Some(auction);
                    Ok(RoundOutcome::Continue)
                }
                ActionKind::Pass => {
                    let mut auction = self.auction.take().unwrap_or(auction);
                    self.release_bid(ctx, auction.item, player);
                    auction.bidders.retain(|&b| b != player);
                    if auction.bidders.len() == 1 {
                        let winner = auction.bidders[0];
                        let amount = self.bid_of(auction.item, winner);
                        self.award(ctx, auction.item, winner, amount)?;
                        self.resolve_front(ctx)?;
                        self.post_resolution(ctx.state);
                    } else {
                        auction.turn %= auction.bidders.len();
                        ctx.state.current_player = auction.bidders[auction.turn];
                        self.auction = Some(auction);
                    }
                    Ok(self.outcome(ctx))
                }
                _ => Err(RulesError::WrongStep),
            }
        } else {
            match action.kind {
                ActionKind::BuyStartItem { item } => {
                    let front = ctx.state.first_unsold_item();
                    if front != Some(item) {
                        return Err(RulesError::NotAllowed);
                    }
                    let price = ctx.state.start_item(item).price;
                    let free = ctx.state.free_cash(player);
                    if free < price {
                        return Err(RulesError::InsufficientCash {
                            have: free,
                            need: price,
                        });
                    }
                    self.passes = 0;
                    self.award(ctx, item, player, price)?;
                    self.resolve_front(ctx)?;
                    self.post_resolution(ctx.state);
                    Ok(self.outcome(ctx))
                }
                ActionKind::Bid { item, amount } => {
                    // Only items behind the front one take bids.
                    if ctx.state.first_unsold_item() == Some(item) {
                        return Err(RulesError::NotAllowed);
                    }
                    self.process_bid(ctx, player, item, amount)?;
                    self.passes = 0;
                    self.advance_turn(ctx.state);
                    Ok(RoundOutcome::Continue)
                }
                ActionKind::Pass => {
                    self.passes += 1;
                    self.advance_turn(ctx.state);
                    if self.passes == ctx.state.player_count() {
                        self.all_passed(ctx)?;
                        if self.done {
                            return Ok(RoundOutcome::Finished);
                        }
                    }
                    Ok(self.outcome(ctx))
                }
                _ => Err(RulesError::WrongStep),
            }
        }
    }

    fn possible_actions(&self, state: &GameState) -> Vec<PossibleAction> {
        let mut actions = Vec::new();

        if let Some((player, company)) = self.pending_par {
            actions.push(PossibleAction::new(
                player,
                PossibleKind::SetSharePrice {
                    company,
                    prices: shares::par_prices(state),
                },
            ));
            return actions;
        }

        if let Some(auction) = &self.auction {
            let player = auction.bidders[auction.turn];
            let min = self.minimum_bid(state, auction.item);
            if state.free_cash(player) + self.bid_of(auction.item, player) >= min {
                actions.push(PossibleAction::new(
                    player,
                    PossibleKind::Bid {
                        item: auction.item,
                        min,
                        unit: state.options.bid_increment,
                    },
                ));
            }
            actions.push(PossibleAction::new(player, PossibleKind::Pass));
            return actions;
        }

        let player = state.current_player;
        let unsold: SmallVec<[StartItemId; 8]> = state
            .start_items
            .iter()
            .filter(|i| !i.is_sold())
            .map(|i| i.id)
            .collect();

        for (position, &item) in unsold.iter().enumerate() {
            if position == 0 {
                let price = state.start_item(item).price;
                if state.free_cash(player) >= price {
                    actions.push(PossibleAction::new(
                        player,
                        PossibleKind::BuyStartItem { item, price },
                    ));
                }
            } else {
                let min = self.minimum_bid(state, item);
                if state.free_cash(player) + self.bid_of(item, player) >= min {
                    actions.push(PossibleAction::new(
                        player,
                        PossibleKind::Bid {
                            item,
                            min,
                            unit: state.options.bid_increment,
                        },
                    ));
                }
            }
        }

        actions.push(PossibleAction::new(player, PossibleKind::Pass));
        actions
    }
}
