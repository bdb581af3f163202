//! Property-based tests for calculation results.

mod common;

use proptest::prelude::*;

use common::*;
use smelting_calculator::calculation::OutputCode;
use smelting_calculator::models::{Inventory, QuantifiedMineral};

fn arb_pieces(material: &'static str) -> impl Strategy<Value = Vec<QuantifiedMineral>> {
    prop::collection::vec((prop::sample::select(vec![8u32, 12, 16, 24, 36, 48]), 0u32..30), 1..4).prop_map(
        move |pieces| {
            pieces
                .into_iter()
                .enumerate()
                .map(|(i, (yield_mb, quantity))| piece(&format!("{material} {i}"), material, yield_mb, quantity))
                .collect::<Vec<_>>()
        },
    )
}

fn arb_inventory() -> impl Strategy<Value = Inventory> {
    (arb_pieces("tin"), arb_pieces("copper"))
        .prop_map(|(tin, copper)| tin.into_iter().chain(copper).collect::<Inventory>())
}

proptest! {
    #[test]
    fn success_respects_amount_windows_and_stock(inventory in arb_inventory(), target in 1i64..1500) {
        let result = exact(target, &bronze(), &inventory);

        if result.is_success() {
            prop_assert_eq!(result.amount_mb(), Some(target as u64));
            assert_valid_plan(&result, &bronze());
            assert_within_stock(&result, &inventory);
        } else {
            prop_assert!(result.used_minerals().is_empty());
            prop_assert_ne!(result.status(), OutputCode::BadRequest);
        }
    }

    #[test]
    fn fallback_lands_on_the_step_grid_below_target(
        inventory in arb_inventory(),
        target in 1i64..1500,
        interval in 1i64..100,
    ) {
        let result = closest(target, &bronze(), &inventory, Some(interval));

        if let Some(amount) = result.amount_mb() {
            assert_valid_plan(&result, &bronze());
            assert_within_stock(&result, &inventory);
            if result.status_context().is_some() {
                prop_assert!(amount < target as u64);
                prop_assert_eq!(amount % interval as u64, 0);
            } else {
                prop_assert_eq!(amount, target as u64);
            }
        } else {
            prop_assert_eq!(result.status(), OutputCode::Unfeasible);
        }
    }

    #[test]
    fn calculation_is_deterministic(inventory in arb_inventory(), target in 1i64..1500) {
        let first = closest(target, &bronze(), &inventory, Some(16));
        let second = closest(target, &bronze(), &inventory, Some(16));
        prop_assert_eq!(first, second);
    }
}
