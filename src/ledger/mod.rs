//! Ownership tracking for certificates, trains and privates.

pub mod portfolio;

pub use portfolio::{Holding, PortfolioLedger};
