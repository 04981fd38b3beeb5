//! The portfolio ledger: who holds what.
//!
//! Every certificate, train and private company is a `Holding` located in
//! exactly one `PortfolioId` at any time. Moving a holding is always a
//! remove-from-source plus add-to-destination pair on the same ledger;
//! holdings are never copied and never destroyed.
//!
//! The ledger stores locations both ways: a holding-to-portfolio map for
//! ownership queries and per-portfolio lists for iteration. The two views
//! are kept consistent by construction; all mutation goes through `place`
//! and `transfer`.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::core::{CertId, PortfolioId, PrivateId, RulesError, TrainId};

/// Anything that lives in a portfolio.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Holding {
    Certificate(CertId),
    Train(TrainId),
    Private(PrivateId),
}

/// Tracks the location of every holding.
#[derive(Clone, Debug, Default)]
pub struct PortfolioLedger {
    locations: FxHashMap<Holding, PortfolioId>,
    contents: FxHashMap<PortfolioId, Vec<Holding>>,
}

impl PortfolioLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a holding for the first time. Setup only.
    ///
    /// Panics if the holding is already in the ledger; duplicates would
    /// break the one-owner invariant silently.
    pub fn place(&mut self, holding: Holding, portfolio: PortfolioId) {
        if self.locations.contains_key(&holding) {
            panic!("{holding:?} already placed in the ledger");
        }
        self.locations.insert(holding, portfolio);
        self.contents.entry(portfolio).or_default().push(holding);
    }

    /// Move a holding to another portfolio, returning its previous one.
    pub fn transfer(
        &mut self,
        holding: Holding,
        to: PortfolioId,
    ) -> Result<PortfolioId, RulesError> {
        let from = *self
            .locations
            .get(&holding)
            .ok_or_else(|| RulesError::Internal(format!("{holding:?} is not in the ledger")))?;

        if from == to {
            return Ok(from);
        }

        if let Some(list) = self.contents.get_mut(&from) {
            list.retain(|&h| h != holding);
        }
        self.locations.insert(holding, to);
        self.contents.entry(to).or_default().push(holding);

        Ok(from)
    }

    /// The portfolio currently holding this item.
    #[must_use]
    pub fn holder_of(&self, holding: Holding) -> Option<PortfolioId> {
        self.locations.get(&holding).copied()
    }

    #[must_use]
    pub fn is_in(&self, holding: Holding, portfolio: PortfolioId) -> bool {
        self.holder_of(holding) == Some(portfolio)
    }

    /// All holdings in a portfolio, in arrival order.
    #[must_use]
    pub fn holdings_in(&self, portfolio: PortfolioId) -> &[Holding] {
        self.contents.get(&portfolio).map_or(&[], Vec::as_slice)
    }

    pub fn certificates_in(&self, portfolio: PortfolioId) -> impl Iterator<Item = CertId> + '_ {
        self.holdings_in(portfolio).iter().filter_map(|h| match h {
            Holding::Certificate(c) => Some(*c),
            _ => None,
        })
    }

    pub fn trains_in(&self, portfolio: PortfolioId) -> impl Iterator<Item = TrainId> + '_ {
        self.holdings_in(portfolio).iter().filter_map(|h| match h {
            Holding::Train(t) => Some(*t),
            _ => None,
        })
    }

    pub fn privates_in(&self, portfolio: PortfolioId) -> impl Iterator<Item = PrivateId> + '_ {
        self.holdings_in(portfolio).iter().filter_map(|h| match h {
            Holding::Private(p) => Some(*p),
            _ => None,
        })
    }

    #[must_use]
    pub fn train_count(&self, portfolio: PortfolioId) -> usize {
        self.trains_in(portfolio).count()
    }

    /// Total holdings tracked across all portfolios.
    #[must_use]
    pub fn total(&self) -> usize {
        self.locations.len()
    }
}
