//! Error taxonomy.
//!
//! Three disjoint classes, matching how they propagate:
//!
//! - `RulesError`: expected, frequent validation rejections. Reported to
//!   the player and swallowed by the dispatcher; no state is mutated.
//! - `ConfigError`: startup-only. A malformed `GameDefinition` aborts game
//!   construction before any round starts.
//! - `ReplayError`: reload failures. A version tag mismatch or a rejected
//!   logged action is fatal to the reload, never to a running game.
//!
//! Invariant violations (states that should be unreachable) surface as
//! `RulesError::Internal` and are additionally logged at error level.

use thiserror::Error;

use super::money::Cash;

/// A player action failed validation. The action is rejected, nothing is
/// mutated, and the previously published possible-action set remains valid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RulesError {
    #[error("it is not {0}'s turn")]
    NotYourTurn(String),

    #[error("action is not among the currently possible actions")]
    NotAllowed,

    #[error("action does not belong to the current step")]
    WrongStep,

    #[error("the game is over")]
    GameOver,

    #[error("insufficient cash: have {have}, need {need}")]
    InsufficientCash { have: Cash, need: Cash },

    #[error("bid of {bid} is below the minimum of {min}")]
    BidTooLow { bid: Cash, min: Cash },

    #[error("bid of {bid} is not a multiple of {unit}")]
    BidNotMultiple { bid: Cash, unit: Cash },

    #[error("certificate limit of {limit} reached")]
    CertLimitReached { limit: u32 },

    #[error("holding limit of {limit}% of one company reached")]
    HoldLimitReached { limit: u8 },

    #[error("sale would push pool holdings over the {limit}% limit")]
    PoolLimitExceeded { limit: u8 },

    #[error("insufficient shares: have {have}, need {need}")]
    InsufficientShares { have: u8, need: u8 },

    #[error("president of {0} cannot dump: no player can take over the presidency")]
    CannotDump(String),

    #[error("company {0} has already been started")]
    AlreadyStarted(String),

    #[error("company {0} has not been started")]
    NotStarted(String),

    #[error("{0} is not a valid par price")]
    InvalidParPrice(Cash),

    #[error("revenue of {0} is not a non-negative multiple of 10")]
    InvalidRevenue(Cash),

    #[error("train limit of {limit} reached")]
    TrainLimitReached { limit: u8 },

    #[error("no undo is available")]
    NothingToUndo,

    #[error("no redo is available")]
    NothingToRedo,

    /// Catch-all for one-off rule checks; the message is the rule.
    #[error("{0}")]
    Rule(&'static str),

    /// An invariant that should be unreachable was violated. Treated as a
    /// hard rejection rather than silently continuing.
    #[error("internal error: {0}")]
    Internal(String),
}

/// The game definition is inconsistent. Fatal at setup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("game requires 2-8 players, got {0}")]
    PlayerCount(usize),

    #[error("duplicate name: {0}")]
    DuplicateName(String),

    #[error("unknown reference to {kind} {name}")]
    UnknownReference { kind: &'static str, name: String },

    #[error("company {company}: shares total {total}%, expected 100%")]
    SharesNotWhole { company: String, total: u32 },

    #[error("company {company}: share unit {unit}% does not divide evenly")]
    BadShareUnit { company: String, unit: u8 },

    #[error("company {company}: float percentage {percent} out of range")]
    BadFloatPercent { company: String, percent: u8 },

    #[error("no par price spaces on the stock market, but {0} has no fixed par")]
    NoParSpaces(String),

    #[error("{0} must not be empty")]
    Empty(&'static str),
}

/// Reloading a saved game failed. Fatal to the reload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplayError {
    #[error("save version {saved} does not match engine version {engine}")]
    VersionMismatch { saved: String, engine: String },

    #[error("saved player list does not match the game definition")]
    PlayerMismatch,

    #[error("saved options do not match the game definition")]
    OptionsMismatch,

    #[error("game definition rejected: {0}")]
    Config(#[from] ConfigError),

    #[error("replayed action {index} was rejected: {reason}")]
    ActionRejected { index: usize, reason: RulesError },

    #[error("save data is corrupt: {0}")]
    Corrupt(String),
}
