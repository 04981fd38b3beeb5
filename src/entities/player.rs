//! Player entity.
//!
//! Cash lives in the `CashLedger` and holdings in the `PortfolioLedger`;
//! the player struct itself only carries identity and auction bookkeeping.
//! Worth is a derived quantity computed by `GameState::player_worth`,
//! never stored here.

use serde::{Deserialize, Serialize};

use crate::core::{Cash, PlayerId};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    /// Cash committed to live auction bids; unavailable for other spending
    /// until the bid is resolved or outbid.
    pub blocked_cash: Cash,
    /// Set when the player goes bankrupt; a terminal per-player condition.
    pub bankrupt: bool,
}

impl Player {
    #[must_use]
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            blocked_cash: 0,
            bankrupt: false,
        }
    }
}
