//! Public (share-issuing) companies.
//!
//! A company's life-cycle flags are strictly one-way: not started, then
//! started, then (once enough shares have sold) floated. `close` is
//! likewise irreversible. The setters enforce the direction; callers
//! validate *when* a transition is legal.

use serde::{Deserialize, Serialize};

use crate::core::{Cash, CompanyId};

/// How a company's treasury is capitalized when it floats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Capitalization {
    /// The full share total is paid at par the moment the company floats.
    Full,
    /// Par times the shares actually sold so far is paid at flotation, and
    /// later IPO sales are credited to the treasury as they happen.
    Incremental,
    /// No lump sum; every IPO purchase pays the company directly once it
    /// has started.
    WhenBought,
}

/// How declared revenue is distributed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Allocation {
    /// All to the treasury; stock price moves down.
    Withhold,
    /// Full per-share distribution; stock price moves up.
    Payout,
    /// Half to the treasury (rounded in the treasury's favour), half
    /// distributed; stock price moves up.
    Split,
}

impl std::fmt::Display for Allocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Allocation::Withhold => write!(f, "withholds"),
            Allocation::Payout => write!(f, "pays out"),
            Allocation::Split => write!(f, "splits"),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PublicCompany {
    pub id: CompanyId,
    pub name: String,

    // Configured once at setup.
    /// Percent per share unit (usually 10).
    pub share_unit: u8,
    /// The company floats once sold percentage reaches this.
    pub float_percent: u8,
    pub capitalization: Capitalization,
    /// A preset par price; if absent the starting player chooses one.
    pub fixed_par: Option<Cash>,
    pub base_token_count: u8,
    pub base_token_cost: Cash,
    /// May trade its own treasury shares during its operating turn.
    pub may_trade_shares: bool,
    /// Revenue on IPO-held shares is paid to the company instead of nobody.
    pub ipo_pays_out: bool,
    /// Revenue on pool-held shares is paid to the company instead of nobody.
    pub pool_pays_out: bool,

    // Mutated during play.
    started: bool,
    floated: bool,
    closed: bool,
    /// Set once, after the company's first completed operating turn.
    has_operated: bool,
    pub par_price: Option<Cash>,
    /// Index into the stock market ladder, set when the company starts.
    pub market_index: Option<usize>,
    pub base_tokens_free: u8,
    pub loans: u32,
    pub last_revenue: Cash,
    pub last_allocation: Option<Allocation>,
}

impl PublicCompany {
    #[must_use]
    pub fn share_count(&self) -> u8 {
        100 / self.share_unit
    }

    #[must_use]
    pub fn has_started(&self) -> bool {
        self.started
    }

    #[must_use]
    pub fn has_floated(&self) -> bool {
        self.floated
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    #[must_use]
    pub fn has_operated(&self) -> bool {
        self.has_operated
    }

    /// Transition not-started to started. One-way.
    pub fn start(&mut self, par: Cash, market_index: usize) {
        debug_assert!(!self.started, "{} started twice", self.name);
        self.started = true;
        self.par_price = Some(par);
        self.market_index = Some(market_index);
    }

    /// Transition started to floated. One-way.
    pub fn float(&mut self) {
        debug_assert!(self.started && !self.floated);
        self.floated = true;
    }

    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn mark_operated(&mut self) {
        self.has_operated = true;
    }
}

/// Immutable configuration used to build a company instance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompanyDef {
    pub name: String,
    pub share_unit: u8,
    pub president_percent: u8,
    pub float_percent: u8,
    pub capitalization: Capitalization,
    pub fixed_par: Option<Cash>,
    pub base_token_count: u8,
    pub base_token_cost: Cash,
    pub may_trade_shares: bool,
    pub ipo_pays_out: bool,
    pub pool_pays_out: bool,
}

impl CompanyDef {
    /// A conventional 10-share company with a 20% president certificate.
    #[must_use]
    pub fn standard(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            share_unit: 10,
            president_percent: 20,
            float_percent: 60,
            capitalization: Capitalization::Full,
            fixed_par: None,
            base_token_count: 3,
            base_token_cost: 40,
            may_trade_shares: false,
            ipo_pays_out: false,
            pool_pays_out: false,
        }
    }

    #[must_use]
    pub fn build(&self, id: CompanyId) -> PublicCompany {
        PublicCompany {
            id,
            name: self.name.clone(),
            share_unit: self.share_unit,
            float_percent: self.float_percent,
            capitalization: self.capitalization,
            fixed_par: self.fixed_par,
            base_token_count: self.base_token_count,
            base_token_cost: self.base_token_cost,
            may_trade_shares: self.may_trade_shares,
            ipo_pays_out: self.ipo_pays_out,
            pool_pays_out: self.pool_pays_out,
            started: false,
            floated: false,
            closed: false,
            has_operated: false,
            par_price: None,
            market_index: None,
            base_tokens_free: self.base_token_count,
            loans: 0,
            last_revenue: 0,
            last_allocation: None,
        }
    }
}
