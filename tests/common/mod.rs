//! Shared fixtures for the integration tests

#![allow(dead_code)]

use smelting_calculator::calculation::{CalculationService, FlagValues, SearchMode, SmeltingResult};
use smelting_calculator::models::{Inventory, QuantifiedMineral, SmeltingComponent};

pub fn bronze() -> Vec<SmeltingComponent> {
    vec![
        SmeltingComponent::new("copper", 88, 92),
        SmeltingComponent::new("tin", 8, 12),
    ]
}

pub fn piece(name: &str, produces: &str, yield_mb: u32, quantity: u32) -> QuantifiedMineral {
    QuantifiedMineral::new(name, produces, yield_mb, quantity)
}

/// tin 16x3, copper 24x7 + 36x6: enough for 432 mB of bronze
pub fn bronze_stock() -> Inventory {
    Inventory::from_iter([
        piece("Small Cassiterite", "tin", 16, 3),
        piece("Medium Copper", "copper", 24, 7),
        piece("Rich Copper", "copper", 36, 6),
    ])
}

/// tin 16x2, copper 24x8 + 36x4: 368 mB in total
pub fn short_bronze_stock() -> Inventory {
    Inventory::from_iter([
        piece("Small Cassiterite", "tin", 16, 2),
        piece("Medium Copper", "copper", 24, 8),
        piece("Rich Copper", "copper", 36, 4),
    ])
}

pub fn service() -> CalculationService {
    CalculationService::default()
}

pub fn exact(target_mb: i64, components: &[SmeltingComponent], inventory: &Inventory) -> SmeltingResult {
    service().calculate_smelting_output(target_mb, components, inventory, None, None)
}

pub fn closest(
    target_mb: i64,
    components: &[SmeltingComponent],
    inventory: &Inventory,
    interval_mb: Option<i64>,
) -> SmeltingResult {
    let values = FlagValues { interval_mb };
    service().calculate_smelting_output(
        target_mb,
        components,
        inventory,
        Some(SearchMode::ClosestAlternative),
        Some(&values),
    )
}

/// Panics unless `result` is a plan whose pieces add up and whose
/// components all sit inside their windows.
pub fn assert_valid_plan(result: &SmeltingResult, components: &[SmeltingComponent]) {
    let plan = result
        .plan()
        .unwrap_or_else(|| panic!("expected a plan, got {:?}", result));

    let total: u64 = plan.used_minerals.iter().map(|m| m.total_mb()).sum();
    assert_eq!(total, plan.amount_mb, "pieces must add up to the amount");

    for component in components {
        let produced = plan.produced_mb(&component.mineral);
        assert!(
            produced * 100 >= u64::from(component.min) * plan.amount_mb,
            "{} below {}% with {produced} of {}",
            component.mineral,
            component.min,
            plan.amount_mb
        );
        assert!(
            produced * 100 <= u64::from(component.max) * plan.amount_mb,
            "{} above {}% with {produced} of {}",
            component.mineral,
            component.max,
            plan.amount_mb
        );
    }
}

/// Panics if `result` uses more of any piece than `inventory` holds.
pub fn assert_within_stock(result: &SmeltingResult, inventory: &Inventory) {
    for used in result.used_minerals() {
        let available = inventory
            .get(&used.produces)
            .iter()
            .find(|m| m.name == used.name && m.yield_mb == used.yield_mb)
            .map_or(0, |m| m.quantity);
        assert!(
            used.quantity <= available,
            "used {} of {} but only {available} available",
            used.quantity,
            used.name
        );
    }
}
