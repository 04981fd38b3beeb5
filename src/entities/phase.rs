//! Game phases.
//!
//! The phase ladder is advanced by train purchases and controls train
//! limits, permitted tile colours, per-turn lay allowances and the number
//! of operating rounds per set.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::map::TileColour;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub name: String,
    /// Maximum trains a company may own.
    pub train_limit: u8,
    /// Tile colours that may be laid.
    pub tile_colours: SmallVec<[TileColour; 4]>,
    /// Normal tile lays per company turn, per colour.
    pub tile_lays: SmallVec<[(TileColour, u8); 4]>,
    /// Operating rounds in each set between stock rounds.
    pub ors_per_set: u8,
}

impl Phase {
    #[must_use]
    pub fn allows_colour(&self, colour: TileColour) -> bool {
        self.tile_colours.contains(&colour)
    }

    #[must_use]
    pub fn lays_for(&self, colour: TileColour) -> u8 {
        self.tile_lays
            .iter()
            .find(|(c, _)| *c == colour)
            .map_or(0, |(_, n)| *n)
    }
}
