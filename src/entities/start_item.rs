//! Items in the initial sale packet.
//!
//! Each item is a private company, optionally bundled with a certificate
//! of a public company. "Sold" is the terminal per-item state. The asking
//! price can be driven down (to zero) by repeated all-pass turns.

use serde::{Deserialize, Serialize};

use crate::core::{Cash, CertId, PrivateId, StartItemId};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StartItem {
    pub id: StartItemId,
    pub private: PrivateId,
    /// A bundled public-company certificate, often a president share.
    pub extra_cert: Option<CertId>,
    pub base_price: Cash,
    /// Current asking price; reduced by all-pass decrements.
    pub price: Cash,
    sold: bool,
}

impl StartItem {
    #[must_use]
    pub fn new(id: StartItemId, private: PrivateId, base_price: Cash) -> Self {
        Self {
            id,
            private,
            extra_cert: None,
            base_price,
            price: base_price,
            sold: false,
        }
    }

    #[must_use]
    pub fn is_sold(&self) -> bool {
        self.sold
    }

    /// Terminal; an item is never unsold.
    pub fn mark_sold(&mut self) {
        self.sold = true;
    }
}
