//! Core primitives: typed ids, money, the error taxonomy, and narration.
//!
//! Everything here is rules-agnostic; the round machinery and entities are
//! built on top of these types.

pub mod error;
pub mod ids;
pub mod money;
pub mod report;

pub use error::{ConfigError, ReplayError, RulesError};
pub use ids::{
    CertId, CompanyId, HexId, HolderId, PlayerId, PortfolioId, PrivateId, StartItemId, TileId,
    TrainId,
};
pub use money::{Cash, CashLedger};
pub use report::ReportLog;
