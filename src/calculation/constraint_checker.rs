//! Cheap pre-screen run before any combination search

use std::collections::BTreeSet;

use crate::calculation::{Failure, OutputCode};
use crate::models::{Inventory, SmeltingComponent};

pub trait ConstraintChecker {
    /// Rejects requests that are malformed or that the inventory provably
    /// cannot satisfy. Passing does not guarantee a combination exists.
    fn check_entry_constraints(
        &self,
        target_mb: i64,
        components: &[SmeltingComponent],
        inventory: &Inventory,
    ) -> Result<(), Failure>;
}

/// Largest target accepted; subtotal tables are sized by the target.
pub const MAX_TARGET_MB: u64 = 1_000_000;

#[derive(Debug, Clone, Copy, Default)]
pub struct EntryConstraintChecker;

impl ConstraintChecker for EntryConstraintChecker {
    fn check_entry_constraints(
        &self,
        target_mb: i64,
        components: &[SmeltingComponent],
        inventory: &Inventory,
    ) -> Result<(), Failure> {
        let target_mb = match u64::try_from(target_mb) {
            Ok(target) if target > 0 => target,
            _ => {
                return Err(Failure::bad_request(
                    "Parameter targetMb must be a positive integer",
                ));
            }
        };
        if target_mb > MAX_TARGET_MB {
            return Err(target_too_large());
        }

        if components.is_empty() {
            return Err(Failure::bad_request("No components have been provided"));
        }

        if total_available_mb(components, inventory) < target_mb {
            return Err(Failure::new(
                OutputCode::InsufficientTotalMb,
                "Not enough total material available",
            ));
        }

        // Each component must at least be able to cover its own minimum
        for component in components {
            let available = inventory.available_mb(&component.mineral);
            if available < min_required_mb(component.min, target_mb) {
                return Err(Failure::new(
                    OutputCode::InsufficientSpecificMineralMb,
                    format!("Not enough {} for minimum requirement", component.mineral),
                ));
            }
        }

        Ok(())
    }
}

/// Total mB across every group some component draws from, counting each
/// group once even if two components name it.
pub(crate) fn total_available_mb(components: &[SmeltingComponent], inventory: &Inventory) -> u64 {
    components
        .iter()
        .map(SmeltingComponent::key)
        .collect::<BTreeSet<_>>()
        .iter()
        .map(|key| inventory.available_mb(key))
        .fold(0, u64::saturating_add)
}

pub(crate) fn target_too_large() -> Failure {
    Failure::bad_request(format!("Parameter targetMb must not exceed {MAX_TARGET_MB}"))
}

/// `ceil(percent / 100 * target_mb)` in integer arithmetic.
pub(crate) fn min_required_mb(percent: u32, target_mb: u64) -> u64 {
    let mb = (u128::from(percent) * u128::from(target_mb)).div_ceil(100);
    u64::try_from(mb).unwrap_or(u64::MAX)
}

/// `floor(percent / 100 * target_mb)` in integer arithmetic.
pub(crate) fn max_allowed_mb(percent: u32, target_mb: u64) -> u64 {
    let mb = u128::from(percent) * u128::from(target_mb) / 100;
    u64::try_from(mb).unwrap_or(u64::MAX)
}
