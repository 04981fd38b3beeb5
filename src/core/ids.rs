//! Typed identifiers for every entity the engine tracks.
//!
//! All cross-references between entities are ids into arenas owned by
//! `GameState`; entities never hold pointers to each other. `PortfolioId`
//! and `HolderId` are the two addressing schemes for ownership: a
//! `PortfolioId` names a container of holdings, a `HolderId` names a cash
//! balance. Every portfolio has exactly one owning cash holder.

use serde::{Deserialize, Serialize};

/// Player identifier, 0-based seat order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u8);

impl PlayerId {
    #[must_use]
    pub const fn new(id: u8) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Iterate over all player ids for a game with `player_count` seats.
    pub fn all(player_count: usize) -> impl Iterator<Item = PlayerId> {
        (0..player_count as u8).map(PlayerId)
    }

    /// The player seated clockwise after this one.
    #[must_use]
    pub fn next(self, player_count: usize) -> PlayerId {
        PlayerId(((self.index() + 1) % player_count) as u8)
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Player {}", self.0)
    }
}

macro_rules! arena_id {
    ($(#[$doc:meta])* $name:ident, $raw:ty) => {
        $(#[$doc])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub $raw);

        impl $name {
            #[must_use]
            pub const fn new(id: $raw) -> Self {
                Self(id)
            }

            #[must_use]
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

arena_id!(
    /// A public (share-issuing) company.
    CompanyId,
    u16
);
arena_id!(
    /// A private company.
    PrivateId,
    u16
);
arena_id!(
    /// A single share certificate. Certificates are created at setup and
    /// never destroyed, only moved between portfolios.
    CertId,
    u32
);
arena_id!(
    /// A physical train.
    TrainId,
    u32
);
arena_id!(
    /// A map hex.
    HexId,
    u16
);
arena_id!(
    /// A track tile design.
    TileId,
    u16
);
arena_id!(
    /// An item in the initial sale packet.
    StartItemId,
    u16
);

/// A cash-owning entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HolderId {
    Bank,
    Player(PlayerId),
    Company(CompanyId),
}

impl std::fmt::Display for HolderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HolderId::Bank => write!(f, "Bank"),
            HolderId::Player(p) => write!(f, "{p}"),
            HolderId::Company(c) => write!(f, "{c}"),
        }
    }
}

/// An ownership container for certificates, trains and privates.
///
/// The four bank portfolios are fixed: IPO holds certificates (and trains)
/// not yet issued, the pool holds shares bought back from players,
/// unavailable holds items not yet released, and the scrap heap holds
/// rusted trains and closed privates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortfolioId {
    Ipo,
    Pool,
    Unavailable,
    ScrapHeap,
    Player(PlayerId),
    Company(CompanyId),
}

impl PortfolioId {
    /// The cash holder that owns this portfolio.
    #[must_use]
    pub fn owner(self) -> HolderId {
        match self {
            PortfolioId::Ipo
            | PortfolioId::Pool
            | PortfolioId::Unavailable
            | PortfolioId::ScrapHeap => HolderId::Bank,
            PortfolioId::Player(p) => HolderId::Player(p),
            PortfolioId::Company(c) => HolderId::Company(c),
        }
    }

    /// Whether this is one of the bank's portfolios.
    #[must_use]
    pub fn is_bank(self) -> bool {
        self.owner() == HolderId::Bank
    }
}

impl std::fmt::Display for PortfolioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PortfolioId::Ipo => write!(f, "IPO"),
            PortfolioId::Pool => write!(f, "Pool"),
            PortfolioId::Unavailable => write!(f, "Unavailable"),
            PortfolioId::ScrapHeap => write!(f, "ScrapHeap"),
            PortfolioId::Player(p) => write!(f, "{p}"),
            PortfolioId::Company(c) => write!(f, "treasury of {c}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_id_rotation() {
        let p = PlayerId::new(3);
        assert_eq!(p.next(4), PlayerId::new(0));
        assert_eq!(PlayerId::new(0).next(4), PlayerId::new(1));
    }

    #[test]
    fn test_player_id_all() {
        let players: Vec<_> = PlayerId::all(3).collect();
        assert_eq!(players, vec![PlayerId(0), PlayerId(1), PlayerId(2)]);
    }

    #[test]
    fn test_portfolio_owner() {
        assert_eq!(PortfolioId::Ipo.owner(), HolderId::Bank);
        assert_eq!(PortfolioId::ScrapHeap.owner(), HolderId::Bank);
        assert_eq!(
            PortfolioId::Player(PlayerId(2)).owner(),
            HolderId::Player(PlayerId(2))
        );
        assert_eq!(
            PortfolioId::Company(CompanyId(1)).owner(),
            HolderId::Company(CompanyId(1))
        );
        assert!(PortfolioId::Pool.is_bank());
        assert!(!PortfolioId::Player(PlayerId(0)).is_bank());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", PlayerId(1)), "Player 1");
        assert_eq!(format!("{}", PortfolioId::Ipo), "IPO");
        assert_eq!(format!("{}", HolderId::Bank), "Bank");
    }
}
