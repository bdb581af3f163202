//! Smelting mix calculator
//!
//! Finds how many of each mineral to melt down for an exact amount of a
//! metal or alloy, keeping every component inside its percentage window.

pub mod calculation;
pub mod catalog;
pub mod db;
pub mod error;
pub mod models;
pub mod parse;
pub mod summary;

pub use calculation::{CalculationService, SearchMode, SmeltingResult};
pub use error::{CatalogError, Result};
