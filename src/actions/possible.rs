//! The advertised action menu.
//!
//! After every processed action the engine publishes the complete set of
//! `PossibleAction` entries for the current player. Each entry describes a
//! family of concrete actions by its parameter ranges; `matches` decides
//! whether a submitted `GameAction` falls inside one. A submission that
//! matches no entry is rejected before any round logic runs.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::actions::{ActionKind, GameAction};
use crate::core::{Cash, CertId, CompanyId, HexId, PlayerId, PortfolioId, PrivateId, StartItemId, TrainId};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PossibleAction {
    pub player: PlayerId,
    pub kind: PossibleKind,
}

impl PossibleAction {
    #[must_use]
    pub fn new(player: PlayerId, kind: PossibleKind) -> Self {
        Self { player, kind }
    }

    /// Does this menu entry cover the submitted action?
    #[must_use]
    pub fn matches(&self, action: &GameAction) -> bool {
        // Forced undo is deliberately open to every player.
        if !matches!(self.kind, PossibleKind::ForcedUndo) && self.player != action.player {
            return false;
        }
        self.kind.matches(&action.kind)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PossibleKind {
    /// Bid at least `min`, in multiples of `unit`.
    Bid {
        item: StartItemId,
        min: Cash,
        unit: Cash,
    },
    BuyStartItem {
        item: StartItemId,
        price: Cash,
    },
    SetSharePrice {
        company: CompanyId,
        prices: SmallVec<[Cash; 8]>,
    },
    StartCompany {
        company: CompanyId,
        prices: SmallVec<[Cash; 8]>,
    },
    BuyCertificate {
        cert: CertId,
        from: PortfolioId,
        price: Cash,
    },
    /// Sell between one and `max` shares of the company.
    SellShares {
        company: CompanyId,
        max: u8,
    },
    LayTile {
        hexes: SmallVec<[HexId; 8]>,
        right: Option<PrivateId>,
    },
    LayToken {
        hexes: SmallVec<[HexId; 8]>,
    },
    SetRevenue {
        max: Cash,
        may_distribute: bool,
    },
    BuyTrain {
        train: TrainId,
        from: PortfolioId,
        min: Cash,
        max: Cash,
        exchange: Option<TrainId>,
    },
    DiscardTrain {
        train: TrainId,
    },
    BuyTreasuryShare {
        company: CompanyId,
        price: Cash,
    },
    SellTreasuryShares {
        company: CompanyId,
        max: u8,
    },
    Pass,
    Undo,
    ForcedUndo,
    Redo,
    Save,
}

impl PossibleKind {
    #[must_use]
    pub fn matches(&self, action: &ActionKind) -> bool {
        match (self, action) {
            (
                PossibleKind::Bid { item, min, unit },
                ActionKind::Bid {
                    item: a_item,
                    amount,
                },
            ) => item == a_item && amount >= min && amount % unit == 0,
            (PossibleKind::BuyStartItem { item, .. }, ActionKind::BuyStartItem { item: a_item }) => {
                item == a_item
            }
            (
                PossibleKind::SetSharePrice { company, prices },
                ActionKind::SetSharePrice {
                    company: a_company,
                    par,
                },
            ) => company == a_company && prices.contains(par),
            (
                PossibleKind::StartCompany { company, prices },
                ActionKind::StartCompany {
                    company: a_company,
                    par,
                },
            ) => company == a_company && prices.contains(par),
            (
                PossibleKind::BuyCertificate { cert, from, .. },
                ActionKind::BuyCertificate {
                    cert: a_cert,
                    from: a_from,
                },
            ) => cert == a_cert && from == a_from,
            (
                PossibleKind::SellShares { company, max },
                ActionKind::SellShares {
                    company: a_company,
                    count,
                },
            ) => company == a_company && *count >= 1 && count <= max,
            (
                PossibleKind::LayTile { hexes, right },
                ActionKind::LayTile {
                    hex,
                    right: a_right,
                    ..
                },
            ) => hexes.contains(hex) && right == a_right,
            (PossibleKind::LayToken { hexes }, ActionKind::LayToken { hex }) => hexes.contains(hex),
            (
                PossibleKind::SetRevenue {
                    max,
                    may_distribute,
                },
                ActionKind::SetRevenue { amount, allocation },
            ) => {
                *amount >= 0
                    && amount <= max
                    && amount % 10 == 0
                    && (*may_distribute || *allocation == crate::entities::Allocation::Withhold)
            }
            (
                PossibleKind::BuyTrain {
                    train,
                    from,
                    min,
                    max,
                    exchange,
                },
                ActionKind::BuyTrain {
                    train: a_train,
                    from: a_from,
                    price,
                    exchange: a_exchange,
                },
            ) => {
                train == a_train
                    && from == a_from
                    && price >= min
                    && price <= max
                    && exchange == a_exchange
            }
            (PossibleKind::DiscardTrain { train }, ActionKind::DiscardTrain { train: a_train }) => {
                train == a_train
            }
            (
                PossibleKind::BuyTreasuryShare { company, .. },
                ActionKind::BuyTreasuryShare { company: a_company },
            ) => company == a_company,
            (
                PossibleKind::SellTreasuryShares { company, max },
                ActionKind::SellTreasuryShares {
                    company: a_company,
                    count,
                },
            ) => company == a_company && *count >= 1 && count <= max,
            (PossibleKind::Pass, ActionKind::Pass) => true,
            (PossibleKind::Undo, ActionKind::Undo) => true,
            (PossibleKind::ForcedUndo, ActionKind::ForcedUndo) => true,
            (PossibleKind::Redo, ActionKind::Redo) => true,
            (PossibleKind::Save, ActionKind::Save) => true,
            _ => false,
        }
    }
}
