//! # rust-18xx
//!
//! A rules engine for 18xx-style railway stock and operating games.
//!
//! ## Design Principles
//!
//! 1. **Title-Agnostic**: No hardcoded companies, trains, phases, or map.
//!    A [`GameDefinition`] configures everything at startup.
//!
//! 2. **Validate, Then Execute**: Every submitted action is checked against
//!    the published [`PossibleAction`] menu and the round's own rules before
//!    a single coin moves. A rejected action leaves the state untouched.
//!
//! 3. **The Log Is the Truth**: The executed-action log fully determines
//!    the state. Undo truncates the log and replays; a save is the log plus
//!    a header, never a state snapshot.
//!
//! ## Architecture
//!
//! - **Double-Entry Ledgers**: All cash and holdings live in ledgers that
//!   conserve their totals; transfers are the only mutation.
//!
//! - **Reversible Move Sets**: Round logic records primitive moves as it
//!   executes them, so a mid-action failure unwinds cleanly.
//!
//! - **Persistent Data Structures**: O(1) cloning via `im-rs` keeps replay
//!   and undo cheap.
//!
//! ## Modules
//!
//! - `core`: Ids, money, errors, the game report
//! - `ledger`: Cash and holding ledgers
//! - `entities`: Players, companies, certificates, trains, market, map
//! - `definition`: The immutable rule set and its validation
//! - `state`: The compiled, mutable game state
//! - `moves`: Primitive reversible moves and move sets
//! - `actions`: Player actions and the possible-action menu
//! - `rounds`: Start, stock, operating, and interrupt rounds
//! - `game`: The driver: round dispatch, the action log, undo, saves
//! - `games`: Ready-made game definitions

pub mod actions;
pub mod core;
pub mod definition;
pub mod entities;
pub mod game;
pub mod games;
pub mod ledger;
pub mod moves;
pub mod rounds;
pub mod state;

// Re-export commonly used types
pub use crate::core::{
    Cash, CertId, CompanyId, ConfigError, HexId, HolderId, PlayerId, PortfolioId, PrivateId,
    ReplayError, ReportLog, RulesError, StartItemId, TileId, TrainId,
};

pub use crate::definition::{
    GameDefinition, GameEndTiming, GameOptions, PrivateDef, SellBuyOrder, StartItemDef,
};

pub use crate::entities::{Allocation, Capitalization, CompanyDef, PriceZone, TileColour};

pub use crate::actions::{ActionKind, GameAction, PossibleAction, PossibleKind};

pub use crate::state::GameState;

pub use crate::game::{GameManager, SavedGame};

pub use crate::games::DemoGameBuilder;
