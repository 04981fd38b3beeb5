//! Tiles and map hexes.
//!
//! Geometry and adjacency are out of scope: a hex is just an upgradeable
//! slot with a terrain cost and token spaces. Tile legality here is colour
//! progression plus phase permission; route questions belong to an
//! external revenue calculator.

use serde::{Deserialize, Serialize};

use crate::core::{Cash, CompanyId, HexId, TileId};

/// Track tile colour, in upgrade order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TileColour {
    Yellow,
    Green,
    Brown,
    Grey,
}

impl TileColour {
    /// The colour a tile of this colour may be upgraded to.
    #[must_use]
    pub fn upgrade(self) -> Option<TileColour> {
        match self {
            TileColour::Yellow => Some(TileColour::Green),
            TileColour::Green => Some(TileColour::Brown),
            TileColour::Brown => Some(TileColour::Grey),
            TileColour::Grey => None,
        }
    }
}

impl std::fmt::Display for TileColour {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TileColour::Yellow => "yellow",
            TileColour::Green => "green",
            TileColour::Brown => "brown",
            TileColour::Grey => "grey",
        };
        write!(f, "{name}")
    }
}

/// A tile design. Supply is treated as unlimited.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub id: TileId,
    pub colour: TileColour,
}

/// A map hex: current tile, terrain cost, token spaces.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MapHex {
    pub id: HexId,
    pub name: String,
    /// Currently laid tile; empty hexes take a yellow tile first.
    pub tile: Option<TileId>,
    pub orientation: u8,
    /// Terrain cost charged on the first lay.
    pub cost: Cash,
    /// Base token spaces on this hex once a tile is present.
    pub token_slots: u8,
    /// Companies with a base token here, in lay order.
    pub tokens: Vec<CompanyId>,
}

impl MapHex {
    #[must_use]
    pub fn has_token_of(&self, company: CompanyId) -> bool {
        self.tokens.contains(&company)
    }

    #[must_use]
    pub fn open_token_slots(&self) -> u8 {
        self.token_slots.saturating_sub(self.tokens.len() as u8)
    }
}
