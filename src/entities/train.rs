//! Trains and train kinds.
//!
//! Kinds are released to the bank's IPO portfolio sequentially: the next
//! kind becomes buyable when the previous kind sells out. Buying the first
//! train of a kind can advance the game phase, which in turn can rust
//! older kinds onto the scrap heap.

use serde::{Deserialize, Serialize};

use crate::core::{Cash, TrainId};

/// Immutable description of a train kind ("2", "3", ...).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainKind {
    pub name: String,
    /// List price when bought from the bank.
    pub cost: Cash,
    /// How many exist.
    pub count: u8,
    /// Phase index entered when the first train of this kind is bought.
    pub phase: usize,
    /// Kind index whose purchase rusts these trains, if any.
    pub rusted_by: Option<usize>,
}

/// A physical train. Location is tracked by the portfolio ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Train {
    pub id: TrainId,
    /// Index into the train-kind table.
    pub kind: usize,
}
