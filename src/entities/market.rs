//! The stock market price ladder.
//!
//! Modelled as a one-dimensional ladder of spaces in ascending price
//! order; "up" and "down" moves step the index. Price bands carry the
//! zone classification that relaxes the normal trading limits.

use serde::{Deserialize, Serialize};

use crate::core::Cash;

/// Price-band classification of a market space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceZone {
    Normal,
    /// Certificates here do not count against the certificate limit.
    Yellow,
    /// Yellow relaxations, plus the per-company holding limit is waived.
    Orange,
    /// Orange relaxations, plus repeat buys of the same company are
    /// allowed in one turn.
    Brown,
}

impl PriceZone {
    #[must_use]
    pub fn counts_for_cert_limit(self) -> bool {
        matches!(self, PriceZone::Normal)
    }

    #[must_use]
    pub fn ignores_hold_limit(self) -> bool {
        matches!(self, PriceZone::Orange | PriceZone::Brown)
    }

    #[must_use]
    pub fn unlimited_buys(self) -> bool {
        matches!(self, PriceZone::Brown)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StockSpace {
    pub price: Cash,
    pub zone: PriceZone,
    /// A company may be started at this price.
    pub par: bool,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StockMarket {
    spaces: Vec<StockSpace>,
}

impl StockMarket {
    #[must_use]
    pub fn new(spaces: Vec<StockSpace>) -> Self {
        Self { spaces }
    }

    #[must_use]
    pub fn space(&self, index: usize) -> &StockSpace {
        &self.spaces[index]
    }

    #[must_use]
    pub fn price(&self, index: usize) -> Cash {
        self.spaces[index].price
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.spaces.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spaces.is_empty()
    }

    /// One space up, pinned at the top.
    #[must_use]
    pub fn up(&self, index: usize) -> usize {
        (index + 1).min(self.spaces.len().saturating_sub(1))
    }

    /// One space down, pinned at the bottom.
    #[must_use]
    pub fn down(&self, index: usize) -> usize {
        index.saturating_sub(1)
    }

    /// `steps` spaces down.
    #[must_use]
    pub fn down_by(&self, index: usize, steps: usize) -> usize {
        index.saturating_sub(steps)
    }

    /// Indices of all par spaces, ascending.
    pub fn par_spaces(&self) -> impl Iterator<Item = usize> + '_ {
        self.spaces
            .iter()
            .enumerate()
            .filter(|(_, s)| s.par)
            .map(|(i, _)| i)
    }

    /// The par space with exactly this price, if any.
    #[must_use]
    pub fn par_space_at(&self, price: Cash) -> Option<usize> {
        self.par_spaces().find(|&i| self.spaces[i].price == price)
    }

    /// The space with exactly this price, par or not.
    #[must_use]
    pub fn space_at(&self, price: Cash) -> Option<usize> {
        self.spaces.iter().position(|s| s.price == price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ladder() -> StockMarket {
        let zone = |i: usize| match i {
            0 | 1 => PriceZone::Brown,
            2 => PriceZone::Orange,
            3 => PriceZone::Yellow,
            _ => PriceZone::Normal,
        };
        StockMarket::new(
            [30, 40, 50, 60, 67, 71, 76, 82, 90, 100, 112]
                .iter()
                .enumerate()
                .map(|(i, &price)| StockSpace {
                    price,
                    zone: zone(i),
                    par: (4..=9).contains(&i),
                })
                .collect(),
        )
    }

    #[test]
    fn test_up_down_pinned() {
        let market = ladder();
        assert_eq!(market.up(3), 4);
        assert_eq!(market.down(3), 2);
        assert_eq!(market.down(0), 0);
        assert_eq!(market.up(10), 10);
        assert_eq!(market.down_by(5, 3), 2);
        assert_eq!(market.down_by(2, 5), 0);
    }

    #[test]
    fn test_par_lookup() {
        let market = ladder();
        let pars: Vec<_> = market.par_spaces().map(|i| market.price(i)).collect();
        assert_eq!(pars, vec![67, 71, 76, 82, 90, 100]);
        assert_eq!(market.par_space_at(76), Some(6));
        assert_eq!(market.par_space_at(30), None);
    }

    #[test]
    fn test_zone_relaxations() {
        assert!(PriceZone::Normal.counts_for_cert_limit());
        assert!(!PriceZone::Yellow.counts_for_cert_limit());
        assert!(!PriceZone::Yellow.ignores_hold_limit());
        assert!(PriceZone::Orange.ignores_hold_limit());
        assert!(!PriceZone::Orange.unlimited_buys());
        assert!(PriceZone::Brown.unlimited_buys());
    }
}
