//! Share certificates.
//!
//! Certificates are created once at setup and never destroyed; ownership
//! changes are moves between portfolios in the `PortfolioLedger`. Exactly
//! one certificate per company carries the president flag.

use serde::{Deserialize, Serialize};

use crate::core::{CertId, CompanyId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    pub id: CertId,
    pub company: CompanyId,
    /// Number of share units this certificate represents. With a 10% share
    /// unit, a president certificate of 2 units is 20%.
    pub shares: u8,
    pub president: bool,
}

impl Certificate {
    #[must_use]
    pub fn new(id: CertId, company: CompanyId, shares: u8, president: bool) -> Self {
        Self {
            id,
            company,
            shares,
            president,
        }
    }

    /// Percentage of the company this certificate represents.
    #[must_use]
    pub fn percent(&self, share_unit: u8) -> u8 {
        self.shares * share_unit
    }
}
