//! Private companies and the special rights they can carry.

use serde::{Deserialize, Serialize};

use crate::core::{Cash, HexId, PrivateId};

/// A right a private confers on the public company whose president owns it
/// (or on the company holding the private directly).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialRight {
    pub kind: RightKind,
    /// Restrict the right to one hex, if set.
    pub hex: Option<HexId>,
    /// The lay does not count against the normal per-turn allowance.
    pub extra: bool,
    /// No terrain cost is charged.
    pub free: bool,
    /// Exercising the right closes the private.
    pub close_on_use: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RightKind {
    TileLay,
    TokenLay,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PrivateCompany {
    pub id: PrivateId,
    pub name: String,
    pub base_price: Cash,
    /// Fixed revenue paid from the bank at the start of every operating
    /// round while open.
    pub revenue: Cash,
    /// Phase index at which the private closes, if any.
    pub closes_at_phase: Option<usize>,
    pub right: Option<SpecialRight>,
    closed: bool,
    /// The right has been exercised; a right is usable at most once.
    pub right_used: bool,
}

impl PrivateCompany {
    #[must_use]
    pub fn new(id: PrivateId, name: impl Into<String>, base_price: Cash, revenue: Cash) -> Self {
        Self {
            id,
            name: name.into(),
            base_price,
            revenue,
            closes_at_phase: None,
            right: None,
            closed: false,
            right_used: false,
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// One-way, like the company flags.
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// The right, if it is still exercisable.
    #[must_use]
    pub fn usable_right(&self) -> Option<&SpecialRight> {
        if self.closed || self.right_used {
            None
        } else {
            self.right.as_ref()
        }
    }
}
