//! Player actions.
//!
//! A `GameAction` is the only way anything enters the engine: a player id
//! plus a fully parameterised `ActionKind`. Actions are validated against
//! the advertised possible-action menu before any round logic runs, then
//! against the round's own rules, and only then executed.
//!
//! Meta actions (undo, redo, save) are routed by the game manager and
//! never reach a round.

use serde::{Deserialize, Serialize};

use crate::core::{Cash, CertId, CompanyId, HexId, PlayerId, PortfolioId, PrivateId, StartItemId, TileId, TrainId};
use crate::entities::Allocation;

pub mod possible;

pub use possible::{PossibleAction, PossibleKind};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameAction {
    pub player: PlayerId,
    pub kind: ActionKind,
}

impl GameAction {
    #[must_use]
    pub fn new(player: PlayerId, kind: ActionKind) -> Self {
        Self { player, kind }
    }

    /// True for actions the manager handles itself.
    #[must_use]
    pub fn is_meta(&self) -> bool {
        matches!(
            self.kind,
            ActionKind::Undo | ActionKind::ForcedUndo | ActionKind::Redo | ActionKind::Save
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ActionKind {
    // Start round
    Bid {
        item: StartItemId,
        amount: Cash,
    },
    BuyStartItem {
        item: StartItemId,
    },
    /// Set the par price of a company whose president certificate arrived
    /// without one.
    SetSharePrice {
        company: CompanyId,
        par: Cash,
    },

    // Stock round
    StartCompany {
        company: CompanyId,
        par: Cash,
    },
    BuyCertificate {
        cert: CertId,
        from: PortfolioId,
    },
    SellShares {
        company: CompanyId,
        count: u8,
    },

    // Operating round
    LayTile {
        hex: HexId,
        tile: TileId,
        orientation: u8,
        /// Private-company right funding the lay, if any.
        right: Option<PrivateId>,
    },
    LayToken {
        hex: HexId,
    },
    SetRevenue {
        amount: Cash,
        allocation: Allocation,
    },
    BuyTrain {
        train: TrainId,
        from: PortfolioId,
        price: Cash,
        /// Train traded in on a discounted purchase.
        exchange: Option<TrainId>,
    },
    DiscardTrain {
        train: TrainId,
    },

    // Treasury share round
    BuyTreasuryShare {
        company: CompanyId,
    },
    SellTreasuryShares {
        company: CompanyId,
        count: u8,
    },

    Pass,

    // Meta
    Undo,
    /// Undo past turn boundaries; any player may submit it.
    ForcedUndo,
    Redo,
    Save,
}
