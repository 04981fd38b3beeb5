//! Share-dealing helpers shared by the stock, share-selling and treasury
//! rounds.
//!
//! All certificate purchases and sales funnel through here so pricing,
//! payee routing, flotation checks and presidency transfers behave the
//! same in every round.

use smallvec::SmallVec;

use crate::core::{Cash, CertId, CompanyId, HolderId, PlayerId, PortfolioId, RulesError};
use crate::entities::Capitalization;
use crate::ledger::Holding;
use crate::rounds::Ctx;
use crate::state::GameState;

/// Par prices a newly started company may choose from.
#[must_use]
pub fn par_prices(state: &GameState) -> SmallVec<[Cash; 8]> {
    state
        .market
        .par_spaces()
        .map(|i| state.market.price(i))
        .collect()
}

/// What a certificate costs when bought from `from`.
///
/// IPO purchases are at par; everything else is at market price. Both
/// scale with the certificate's share count.
#[must_use]
pub fn cert_price(state: &GameState, cert: CertId, from: PortfolioId) -> Cash {
    let cert = state.certificate(cert);
    let per_share = if from == PortfolioId::Ipo {
        state.company(cert.company).par_price.unwrap_or(0)
    } else {
        state.market_price(cert.company).unwrap_or(0)
    };
    per_share * cert.shares as Cash
}

/// Who receives the purchase price of a certificate bought from `from`.
#[must_use]
pub fn buy_payee(state: &GameState, company: CompanyId, from: PortfolioId) -> HolderId {
    match from {
        PortfolioId::Company(c) => HolderId::Company(c),
        PortfolioId::Ipo => {
            let company = state.company(company);
            let to_treasury = match company.capitalization {
                Capitalization::Full => false,
                Capitalization::Incremental => company.has_floated(),
                Capitalization::WhenBought => company.has_started(),
            };
            if to_treasury {
                HolderId::Company(company.id)
            } else {
                HolderId::Bank
            }
        }
        _ => HolderId::Bank,
    }
}

/// Share units of `company` sold out of the IPO so far.
#[must_use]
fn units_sold(state: &GameState, company: CompanyId) -> u8 {
    let total = state.company(company).share_count();
    total - state.share_units(PortfolioId::Ipo, company)
}

/// Float the company if enough of it has been sold, and capitalize the
/// treasury according to its capitalization rule.
pub fn check_flotation(ctx: &mut Ctx, company: CompanyId) {
    let c = ctx.state.company(company);
    if !c.has_started() || c.has_floated() {
        return;
    }
    let sold_percent = units_sold(ctx.state, company) * c.share_unit;
    if sold_percent < c.float_percent {
        return;
    }

    let c = ctx.state.company(company);
    let par = c.par_price.unwrap_or(0);
    let capital = match c.capitalization {
        Capitalization::Full => par * c.share_count() as Cash,
        Capitalization::Incremental => par * units_sold(ctx.state, company) as Cash,
        Capitalization::WhenBought => 0,
    };

    ctx.state.company_mut(company).float();
    if capital > 0 {
        ctx.cash(HolderId::Bank, HolderId::Company(company), capital);
    }
    let name = ctx.state.company(company).name.clone();
    ctx.say(format!("{name} floats and receives {capital}"));
}

/// Buy one certificate into `buyer`, paying whoever is owed.
pub fn execute_cert_buy(
    ctx: &mut Ctx,
    buyer: PortfolioId,
    cert: CertId,
    from: PortfolioId,
) -> Result<(), RulesError> {
    let company = ctx.state.certificate(cert).company;
    let price = cert_price(ctx.state, cert, from);
    let payer = buyer.owner();
    let payee = buy_payee(ctx.state, company, from);

    ctx.move_holding(Holding::Certificate(cert), buyer)?;
    ctx.cash(payer, payee, price);

    let percent = ctx
        .state
        .certificate(cert)
        .percent(ctx.state.company(company).share_unit);
    let name = ctx.state.company(company).name.clone();
    ctx.say(format!("{payer} buys {percent}% of {name} for {price}"));

    check_flotation(ctx, company);
    presidency_check(ctx, company);
    Ok(())
}

/// Sell `count` share units from `seller` into the pool, with the price
/// dropping one space per unit sold.
///
/// If the sale would take a president below the president certificate's
/// size, the certificate is first swapped for an equal number of common
/// shares with a player who can hold it; with no such player the sale is
/// rejected as a dump.
pub fn execute_share_sale(
    ctx: &mut Ctx,
    seller: PortfolioId,
    company: CompanyId,
    count: u8,
) -> Result<Cash, RulesError> {
    let unit = ctx.state.company(company).share_unit;
    let pool_percent = ctx.state.percent_of(PortfolioId::Pool, company);
    if pool_percent + count * unit > ctx.state.options.pool_share_limit {
        return Err(RulesError::PoolLimitExceeded {
            limit: ctx.state.options.pool_share_limit,
        });
    }

    let held = ctx.state.share_units(seller, company);
    if held < count {
        return Err(RulesError::InsufficientShares {
            have: held,
            need: count,
        });
    }

    // A selling president may need to hand over the president certificate
    // first.
    if let (PortfolioId::Player(player), Some(pres_cert)) =
        (seller, ctx.state.president_cert(company))
    {
        if ctx.state.portfolios.is_in(Holding::Certificate(pres_cert), seller) {
            let pres_shares = ctx.state.certificate(pres_cert).shares;
            if held - count < pres_shares {
                let successor = presidency_candidate(ctx.state, company, player, pres_shares)
                    .ok_or_else(|| {
                        RulesError::CannotDump(ctx.state.company(company).name.clone())
                    })?;
                swap_presidency(ctx, company, seller, PortfolioId::Player(successor))?;
            }
        }
    }

    let price = ctx
        .state
        .market_price(company)
        .ok_or_else(|| RulesError::NotStarted(ctx.state.company(company).name.clone()))?;
    let proceeds = price * count as Cash;

    let certs = ctx
        .state
        .common_certs_for_units(seller, company, count)
        .ok_or(RulesError::InsufficientShares {
            have: held,
            need: count,
        })?;
    for cert in certs {
        ctx.move_holding(Holding::Certificate(cert), PortfolioId::Pool)?;
    }
    ctx.cash(HolderId::Bank, seller.owner(), proceeds);

    if let Some(index) = ctx.state.company(company).market_index {
        let dropped = ctx.state.market.down_by(index, count as usize);
        ctx.move_price(company, dropped);
    }

    let name = ctx.state.company(company).name.clone();
    let owner = seller.owner();
    ctx.say(format!(
        "{owner} sells {}% of {name} for {proceeds}",
        count * unit
    ));

    presidency_check(ctx, company);
    Ok(proceeds)
}

/// How many share units of `company` the player could legally sell right
/// now, considering pool room and the presidency.
#[must_use]
pub fn max_sellable(state: &GameState, player: PlayerId, company: CompanyId) -> u8 {
    let c = state.company(company);
    if !c.has_started() {
        return 0;
    }
    let held = state.share_units(PortfolioId::Player(player), company);
    if held == 0 {
        return 0;
    }
    let pool_room =
        (state.options.pool_share_limit - state.percent_of(PortfolioId::Pool, company)) / c.share_unit;

    let mut max = held;
    if let Some(pres_cert) = state.president_cert(company) {
        if state
            .portfolios
            .is_in(Holding::Certificate(pres_cert), PortfolioId::Player(player))
        {
            let pres_shares = state.certificate(pres_cert).shares;
            if presidency_candidate(state, company, player, pres_shares).is_none() {
                // Nobody can take the presidency, so the president
                // certificate stays put.
                max = held - pres_shares;
            }
        }
    }
    max.min(pool_room)
}

/// The player best placed to receive the president certificate, starting
/// from the seat after `from` and requiring at least `minimum` units.
fn presidency_candidate(
    state: &GameState,
    company: CompanyId,
    from: PlayerId,
    minimum: u8,
) -> Option<PlayerId> {
    let mut best: Option<(PlayerId, u8)> = None;
    let count = state.player_count();
    for offset in 1..count {
        let player = PlayerId(((from.index() + offset) % count) as u8);
        let units = state.share_units(PortfolioId::Player(player), company);
        if units >= minimum && best.is_none_or(|(_, b)| units > b) {
            best = Some((player, units));
        }
    }
    best.map(|(p, _)| p)
}

/// Exchange the president certificate for an equal number of common
/// shares between two portfolios.
fn swap_presidency(
    ctx: &mut Ctx,
    company: CompanyId,
    from: PortfolioId,
    to: PortfolioId,
) -> Result<(), RulesError> {
    let pres_cert = ctx
        .state
        .president_cert(company)
        .ok_or_else(|| RulesError::Internal(format!("no president certificate: {company}")))?;
    let pres_shares = ctx.state.certificate(pres_cert).shares;

    let commons = ctx
        .state
        .common_certs_for_units(to, company, pres_shares)
        .ok_or(RulesError::Internal(
            "presidency successor lacks exchangeable shares".into(),
        ))?;

    ctx.move_holding(Holding::Certificate(pres_cert), to)?;
    for cert in commons {
        ctx.move_holding(Holding::Certificate(cert), from)?;
    }

    let name = ctx.state.company(company).name.clone();
    let owner = to.owner();
    ctx.say(format!("{owner} becomes president of {name}"));
    Ok(())
}

/// Hand the presidency to whichever player holds strictly more shares
/// than the current president.
pub fn presidency_check(ctx: &mut Ctx, company: CompanyId) {
    let Some(pres_cert) = ctx.state.president_cert(company) else {
        return;
    };
    let Some(current) = ctx.state.president_player(company) else {
        return;
    };
    let pres_shares = ctx.state.certificate(pres_cert).shares;
    let current_units = ctx
        .state
        .share_units(PortfolioId::Player(current), company);

    if let Some(candidate) =
        presidency_candidate(ctx.state, company, current, pres_shares)
    {
        let candidate_units = ctx
            .state
            .share_units(PortfolioId::Player(candidate), company);
        if candidate_units > current_units {
            // Transfer can only fail if the ledger is corrupt.
            if let Err(e) = swap_presidency(
                ctx,
                company,
                PortfolioId::Player(current),
                PortfolioId::Player(candidate),
            ) {
                log::error!("presidency transfer failed: {e}");
            }
        }
    }
}
