//! The game driver: round dispatch, the action log, undo, and saves.

pub mod manager;
pub mod save;

pub use manager::GameManager;
pub use save::SavedGame;
