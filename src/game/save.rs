//! Saving and restoring games.
//!
//! A save is not a state snapshot; it is the executed-action log plus
//! enough header data to refuse a replay that cannot work: the engine
//! version, the player list and the rule options. Restoring rebuilds the
//! initial state from the definition and replays the log.

use serde::{Deserialize, Serialize};

use crate::actions::GameAction;
use crate::core::ReplayError;
use crate::definition::{GameDefinition, GameOptions};
use crate::game::GameManager;

const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SavedGame {
    pub version: String,
    pub players: Vec<String>,
    pub options: GameOptions,
    pub actions: Vec<GameAction>,
}

impl GameManager {
    #[must_use]
    pub fn to_saved(&self) -> SavedGame {
        SavedGame {
            version: ENGINE_VERSION.to_string(),
            players: self.definition().players.clone(),
            options: self.definition().options.clone(),
            actions: self.executed_actions().to_vec(),
        }
    }

    pub fn from_saved(
        definition: GameDefinition,
        saved: &SavedGame,
    ) -> Result<Self, ReplayError> {
        if saved.version != ENGINE_VERSION {
            return Err(ReplayError::VersionMismatch {
                saved: saved.version.clone(),
                engine: ENGINE_VERSION.to_string(),
            });
        }
        if saved.players != definition.players {
            return Err(ReplayError::PlayerMismatch);
        }
        if saved.options != definition.options {
            return Err(ReplayError::OptionsMismatch);
        }

        let mut manager = Self::new(definition)?;
        manager.replay(saved.actions.clone())?;
        Ok(manager)
    }

    pub fn save_bytes(&self) -> Result<Vec<u8>, ReplayError> {
        bincode::serialize(&self.to_saved()).map_err(|e| ReplayError::Corrupt(e.to_string()))
    }

    pub fn from_bytes(definition: GameDefinition, bytes: &[u8]) -> Result<Self, ReplayError> {
        let saved: SavedGame =
            bincode::deserialize(bytes).map_err(|e| ReplayError::Corrupt(e.to_string()))?;
        Self::from_saved(definition, &saved)
    }
}
