//! Calculation entry point tying the checks and the search together

use tracing::{debug, info_span, warn};

use crate::calculation::constraint_checker::{MAX_TARGET_MB, target_too_large, total_available_mb};
use crate::calculation::search::ExactSearch;
use crate::calculation::{
    CLOSEST_ALTERNATIVE_CONTEXT, ConstraintChecker, EntryConstraintChecker, Failure, FlagStrategySelector,
    FlagValues, OutputCode, SearchMode, SmeltingPlan, SmeltingResult, StrategySelector,
};
use crate::models::{Inventory, SmeltingComponent};

/// Most candidate targets the closest alternative fallback will try
pub const MAX_FALLBACK_CANDIDATES: u64 = 100_000;

#[derive(Debug, Clone, Default)]
pub struct CalculationService<C = EntryConstraintChecker, S = FlagStrategySelector> {
    constraint_checker: C,
    strategy_selector: S,
}

impl<C: ConstraintChecker, S: StrategySelector> CalculationService<C, S> {
    pub fn new(constraint_checker: C, strategy_selector: S) -> Self {
        Self {
            constraint_checker,
            strategy_selector,
        }
    }

    /// Finds how many of each inventory mineral to smelt for exactly
    /// `target_mb` of output with every component inside its window.
    ///
    /// With [`SearchMode::ClosestAlternative`] a failed exact search falls
    /// back to the largest multiple of `interval_mb` below the target that
    /// works; that also covers inventories too small for the target itself.
    pub fn calculate_smelting_output(
        &self,
        target_mb: i64,
        components: &[SmeltingComponent],
        inventory: &Inventory,
        mode: Option<SearchMode>,
        values: Option<&FlagValues>,
    ) -> SmeltingResult {
        let span = info_span!("calculate", target_mb, components = components.len());
        let _guard = span.enter();

        let closest = mode == Some(SearchMode::ClosestAlternative);

        let exact_possible = match self
            .constraint_checker
            .check_entry_constraints(target_mb, components, inventory)
        {
            Ok(()) => true,
            Err(failure) if closest && failure.code != OutputCode::BadRequest => {
                debug!(status = %failure.code, "exact target ruled out, going straight to fallback");
                false
            }
            Err(failure) => return failure.into(),
        };

        let target_mb = match u64::try_from(target_mb) {
            Ok(target) if target > 0 => target,
            _ => return Failure::bad_request("Parameter targetMb must be a positive integer").into(),
        };
        if target_mb > MAX_TARGET_MB {
            return target_too_large().into();
        }
        let search = ExactSearch::prepare(components, inventory, target_mb);

        if exact_possible {
            if let Some(used_minerals) = search.solve(target_mb) {
                debug!(minerals = used_minerals.len(), "exact combination found");
                return SmeltingResult::Success(SmeltingPlan {
                    amount_mb: target_mb,
                    used_minerals,
                    status_context: None,
                });
            }
        }

        if !closest {
            return Failure::unfeasible().into();
        }

        if let Err(failure) = self.strategy_selector.validate_flags(mode, values) {
            return failure.into();
        }
        let interval_mb = match values.and_then(|v| v.interval_mb).and_then(|i| u64::try_from(i).ok()) {
            Some(interval) if interval > 0 => interval,
            _ => return Failure::bad_request("Parameter intervalMb must be a positive integer").into(),
        };

        let available_mb = total_available_mb(components, inventory);
        closest_alternative(&search, target_mb, interval_mb, available_mb)
    }
}

/// Walks the multiples of `interval_mb` below `target_mb`, largest first,
/// and returns the first one with an exact combination.
fn closest_alternative(search: &ExactSearch<'_>, target_mb: u64, interval_mb: u64, available_mb: u64) -> SmeltingResult {
    let highest = (target_mb - 1) / interval_mb;
    // Candidates above the whole stock cannot work
    let start = highest.min(available_mb / interval_mb);
    if start < highest {
        debug!(skipped = highest - start, available_mb, "skipping candidates above available stock");
    }

    for (tried, step) in (1..=start).rev().enumerate() {
        if tried as u64 >= MAX_FALLBACK_CANDIDATES {
            warn!(
                target_mb,
                interval_mb,
                tried,
                "closest alternative search hit its candidate limit"
            );
            break;
        }

        let candidate = step * interval_mb;
        if let Some(used_minerals) = search.solve(candidate) {
            debug!(candidate, tried, "closest alternative found");
            return SmeltingResult::Success(SmeltingPlan {
                amount_mb: candidate,
                used_minerals,
                status_context: Some(CLOSEST_ALTERNATIVE_CONTEXT.to_string()),
            });
        }
    }

    Failure::unfeasible().into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculation::UNFEASIBLE_CONTEXT;

    fn bronze() -> Vec<SmeltingComponent> {
        vec![
            SmeltingComponent::new("copper", 88, 92),
            SmeltingComponent::new("tin", 8, 12),
        ]
    }

    fn short_inventory() -> Inventory {
        Inventory::new()
            .with_mineral("tin", 16, 2)
            .with_mineral("copper", 24, 8)
            .with_mineral("copper", 36, 4)
    }

    struct RejectEverything;

    impl ConstraintChecker for RejectEverything {
        fn check_entry_constraints(&self, _: i64, _: &[SmeltingComponent], _: &Inventory) -> Result<(), Failure> {
            Err(Failure::new(OutputCode::InsufficientTotalMb, "stubbed"))
        }
    }

    struct NeverValid;

    impl StrategySelector for NeverValid {
        fn validate_flags(&self, _: Option<SearchMode>, _: Option<&FlagValues>) -> Result<(), Failure> {
            Err(Failure::bad_request("stubbed flags"))
        }
    }

    #[test]
    fn checker_failure_is_passed_through() {
        let service = CalculationService::new(RejectEverything, FlagStrategySelector);
        let result = service.calculate_smelting_output(432, &bronze(), &short_inventory(), None, None);

        assert_eq!(result.status(), OutputCode::InsufficientTotalMb);
        assert_eq!(result.status_context(), Some("stubbed"));
    }

    #[test]
    fn selector_is_not_consulted_when_exact_succeeds() {
        let service = CalculationService::new(EntryConstraintChecker, NeverValid);
        let inventory = Inventory::new()
            .with_mineral("tin", 16, 3)
            .with_mineral("copper", 24, 7)
            .with_mineral("copper", 36, 6);
        let result =
            service.calculate_smelting_output(432, &bronze(), &inventory, Some(SearchMode::ClosestAlternative), None);

        assert_eq!(result.amount_mb(), Some(432));
    }

    #[test]
    fn selector_failure_is_passed_through_when_fallback_is_needed() {
        let service = CalculationService::new(EntryConstraintChecker, NeverValid);
        let result = service.calculate_smelting_output(
            432,
            &bronze(),
            &short_inventory(),
            Some(SearchMode::ClosestAlternative),
            Some(&FlagValues::interval(16)),
        );

        assert_eq!(result.status(), OutputCode::BadRequest);
        assert_eq!(result.status_context(), Some("stubbed flags"));
    }

    #[test]
    fn bad_request_is_never_rescued_by_fallback() {
        let service = CalculationService::<EntryConstraintChecker, FlagStrategySelector>::default();
        let result = service.calculate_smelting_output(
            0,
            &bronze(),
            &short_inventory(),
            Some(SearchMode::ClosestAlternative),
            Some(&FlagValues::interval(16)),
        );

        assert_eq!(result.status(), OutputCode::BadRequest);
    }

    #[test]
    fn oversized_target_is_rejected_even_when_checks_are_skipped() {
        struct AcceptEverything;

        impl ConstraintChecker for AcceptEverything {
            fn check_entry_constraints(&self, _: i64, _: &[SmeltingComponent], _: &Inventory) -> Result<(), Failure> {
                Ok(())
            }
        }

        let service = CalculationService::new(AcceptEverything, FlagStrategySelector);
        let inventory = Inventory::new()
            .with_mineral("copper", u32::MAX, u32::MAX)
            .with_mineral("tin", u32::MAX, u32::MAX);
        let result = service.calculate_smelting_output(i64::MAX, &bronze(), &inventory, None, None);

        assert_eq!(result.status(), OutputCode::BadRequest);
        assert!(result.status_context().unwrap().contains("targetMb"));
    }

    #[test]
    fn fallback_candidates_follow_the_interval_grid() {
        let inventory = short_inventory();
        let search = ExactSearch::prepare(&bronze(), &inventory, 432);

        let result = closest_alternative(&search, 432, 16, 368);
        assert_eq!(result.amount_mb(), Some(368));
        assert_eq!(result.status_context(), Some(CLOSEST_ALTERNATIVE_CONTEXT));

        // 400, 300, 200 and 100 all miss
        let result = closest_alternative(&search, 432, 100, 368);
        assert_eq!(result.status(), OutputCode::Unfeasible);
        assert_eq!(result.status_context(), Some(UNFEASIBLE_CONTEXT));
    }

    #[test]
    fn fallback_never_tries_the_target_itself() {
        let inventory = Inventory::new().with_mineral("copper", 10, 10);
        let components = vec![SmeltingComponent::new("copper", 100, 100)];
        let search = ExactSearch::prepare(&components, &inventory, 100);

        let result = closest_alternative(&search, 100, 10, 100);
        assert_eq!(result.amount_mb(), Some(90));
    }

    #[test]
    fn fallback_with_interval_above_target_has_no_candidates() {
        let inventory = Inventory::new().with_mineral("copper", 10, 10);
        let components = vec![SmeltingComponent::new("copper", 100, 100)];
        let search = ExactSearch::prepare(&components, &inventory, 50);

        let result = closest_alternative(&search, 50, 64, 100);
        assert_eq!(result.status(), OutputCode::Unfeasible);
    }
}
