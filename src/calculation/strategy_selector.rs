use crate::calculation::{Failure, FlagValues, SearchMode};

pub trait StrategySelector {
    /// Checks that the companion values required by `mode` are present and
    /// well formed. Says nothing about whether a search will succeed.
    fn validate_flags(&self, mode: Option<SearchMode>, values: Option<&FlagValues>) -> Result<(), Failure>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FlagStrategySelector;

impl StrategySelector for FlagStrategySelector {
    fn validate_flags(&self, mode: Option<SearchMode>, values: Option<&FlagValues>) -> Result<(), Failure> {
        match mode.unwrap_or_default() {
            SearchMode::Exact => Ok(()),
            SearchMode::ClosestAlternative => match values.and_then(|v| v.interval_mb) {
                Some(interval) if interval > 0 => Ok(()),
                _ => Err(Failure::bad_request("Parameter intervalMb must be a positive integer")),
            },
        }
    }
}
