//! Smelting mix calculation: entry checks, flag validation and the
//! combination search.

mod constraint_checker;
mod search;
mod service;
mod strategy_selector;

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::models::normalize_key;

pub use constraint_checker::{ConstraintChecker, EntryConstraintChecker, MAX_TARGET_MB};
pub use service::{CalculationService, MAX_FALLBACK_CANDIDATES};
pub use strategy_selector::{FlagStrategySelector, StrategySelector};

/// Context attached to a success found by the closest alternative fallback
pub const CLOSEST_ALTERNATIVE_CONTEXT: &str = "closest_alternative";

/// Context of every search that ends without a valid combination
pub const UNFEASIBLE_CONTEXT: &str = "Could not find valid combination of materials";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutputCode {
    Success,
    BadRequest,
    InsufficientTotalMb,
    InsufficientSpecificMineralMb,
    Unfeasible,
}

impl OutputCode {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputCode::Success => "SUCCESS",
            OutputCode::BadRequest => "BAD_REQUEST",
            OutputCode::InsufficientTotalMb => "INSUFFICIENT_TOTAL_MB",
            OutputCode::InsufficientSpecificMineralMb => "INSUFFICIENT_SPECIFIC_MINERAL_MB",
            OutputCode::Unfeasible => "UNFEASIBLE",
        }
    }
}

impl fmt::Display for OutputCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How to proceed when the exact target cannot be reached
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchMode {
    #[default]
    Exact,
    /// Step the target down by `interval_mb` until a combination exists.
    ClosestAlternative,
}

/// Companion parameters for a [`SearchMode`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlagValues {
    pub interval_mb: Option<i64>,
}

impl FlagValues {
    pub fn interval(interval_mb: i64) -> Self {
        Self {
            interval_mb: Some(interval_mb),
        }
    }
}

/// A rejected request or a search that found nothing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {context}")]
pub struct Failure {
    pub code: OutputCode,
    pub context: String,
}

impl Failure {
    pub fn new(code: OutputCode, context: impl Into<String>) -> Self {
        Self {
            code,
            context: context.into(),
        }
    }

    pub fn bad_request(context: impl Into<String>) -> Self {
        Self::new(OutputCode::BadRequest, context)
    }

    pub fn unfeasible() -> Self {
        Self::new(OutputCode::Unfeasible, UNFEASIBLE_CONTEXT)
    }
}

/// Units of one inventory mineral consumed by a plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsedMineral {
    pub name: String,
    pub produces: String,
    pub yield_mb: u32,
    pub quantity: u32,
}

impl UsedMineral {
    pub fn total_mb(&self) -> u64 {
        u64::from(self.yield_mb) * u64::from(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmeltingPlan {
    pub amount_mb: u64,
    pub used_minerals: Vec<UsedMineral>,
    /// Set when the plan is a fallback below the requested target.
    pub status_context: Option<String>,
}

impl SmeltingPlan {
    /// mB contributed by minerals producing `key` (case-insensitive).
    pub fn produced_mb(&self, key: &str) -> u64 {
        let key = normalize_key(key);
        self.used_minerals
            .iter()
            .filter(|m| normalize_key(&m.produces) == key)
            .map(UsedMineral::total_mb)
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmeltingResult {
    Success(SmeltingPlan),
    Failure(Failure),
}

impl SmeltingResult {
    pub fn status(&self) -> OutputCode {
        match self {
            SmeltingResult::Success(_) => OutputCode::Success,
            SmeltingResult::Failure(failure) => failure.code,
        }
    }

    pub fn status_context(&self) -> Option<&str> {
        match self {
            SmeltingResult::Success(plan) => plan.status_context.as_deref(),
            SmeltingResult::Failure(failure) => Some(&failure.context),
        }
    }

    pub fn amount_mb(&self) -> Option<u64> {
        match self {
            SmeltingResult::Success(plan) => Some(plan.amount_mb),
            SmeltingResult::Failure(_) => None,
        }
    }

    pub fn used_minerals(&self) -> &[UsedMineral] {
        match self {
            SmeltingResult::Success(plan) => &plan.used_minerals,
            SmeltingResult::Failure(_) => &[],
        }
    }

    pub fn plan(&self) -> Option<&SmeltingPlan> {
        match self {
            SmeltingResult::Success(plan) => Some(plan),
            SmeltingResult::Failure(_) => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SmeltingResult::Success(_))
    }

    pub fn report(&self) -> ResultReport<'_> {
        ResultReport {
            status: self.status(),
            status_context: self.status_context(),
            amount_mb: self.amount_mb(),
            used_minerals: self.plan().map(|plan| plan.used_minerals.as_slice()),
        }
    }
}

impl From<Failure> for SmeltingResult {
    fn from(failure: Failure) -> Self {
        SmeltingResult::Failure(failure)
    }
}

/// Flat, serializable view of a [`SmeltingResult`]
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultReport<'a> {
    pub status: OutputCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_context: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_mb: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_minerals: Option<&'a [UsedMineral]>,
}
