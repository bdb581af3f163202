//! Exact combination search.
//!
//! Every component draws from its own group of inventory minerals, so the
//! search runs in two levels:
//!
//! 1. Per group, a bounded subset-sum table over every subtotal up to the
//!    group's cap (the largest window bound, or the group's stock if lower).
//!    Minerals sharing a yield are merged first, so the table is
//!    `distinct yields x cap` no matter how many pieces or variants there are.
//! 2. Per target, a small subset-sum picking one in-window subtotal per group
//!    that adds up to the target exactly.
//!
//! The tables only depend on the cap, so the fallback builds them once and
//! reruns level 2 for each candidate target.

use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::calculation::UsedMineral;
use crate::calculation::constraint_checker::{max_allowed_mb, min_required_mb};
use crate::models::{Inventory, QuantifiedMineral, SmeltingComponent};

const UNREACHABLE: u32 = u32::MAX;

/// Minerals of one group sharing the same yield
#[derive(Debug)]
struct YieldClass {
    yield_mb: u64,
    limit: u32,
    pieces: Vec<usize>, // indices into the group's minerals, inventory order
}

/// Bounded subset-sum table for one group of minerals.
///
/// `units[i][s]` is the fewest units of `classes[i]` in any way of reaching
/// exactly `s` mB with `classes[..=i]`, or `UNREACHABLE`. Classes are sorted by
/// descending yield, so backtracking from the last class spends as few small
/// pieces as possible and leaves the rest to the larger ones.
#[derive(Debug)]
pub(crate) struct GroupTable<'a> {
    minerals: &'a [QuantifiedMineral],
    classes: Vec<YieldClass>,
    units: Vec<Vec<u32>>,
    cap: u64,
}

impl<'a> GroupTable<'a> {
    pub(crate) fn build(minerals: &'a [QuantifiedMineral], cap: u64) -> Self {
        let mut by_yield: BTreeMap<u32, (u64, Vec<usize>)> = BTreeMap::new();
        for (index, mineral) in minerals.iter().enumerate() {
            if mineral.yield_mb == 0 || mineral.quantity == 0 {
                continue;
            }
            let entry = by_yield.entry(mineral.yield_mb).or_default();
            entry.0 += u64::from(mineral.quantity);
            entry.1.push(index);
        }

        let classes: Vec<YieldClass> = by_yield
            .into_iter()
            .rev()
            .map(|(yield_mb, (quantity, pieces))| {
                let yield_mb = u64::from(yield_mb);
                // More units than fit under the cap can never be used
                let usable = quantity.min(cap / yield_mb);
                YieldClass {
                    yield_mb,
                    limit: u32::try_from(usable).unwrap_or(UNREACHABLE - 1),
                    pieces,
                }
            })
            .collect();

        let width = cap as usize + 1;
        let mut units: Vec<Vec<u32>> = Vec::with_capacity(classes.len());
        for (i, class) in classes.iter().enumerate() {
            let step = class.yield_mb as usize;
            let mut layer = vec![UNREACHABLE; width];
            for sum in 0..width {
                let reachable_before = match units.last() {
                    Some(previous) => previous[sum] != UNREACHABLE,
                    None => sum == 0,
                };
                if reachable_before {
                    layer[sum] = 0;
                } else if sum >= step {
                    let used = layer[sum - step];
                    if used != UNREACHABLE && used < class.limit {
                        layer[sum] = used + 1;
                    }
                }
            }
            trace!(class = i, yield_mb = class.yield_mb, limit = class.limit, "filled yield class");
            units.push(layer);
        }

        GroupTable {
            minerals,
            classes,
            units,
            cap,
        }
    }

    pub(crate) fn cap(&self) -> u64 {
        self.cap
    }

    pub(crate) fn reachable(&self, sum: u64) -> bool {
        if sum > self.cap {
            return false;
        }
        match self.units.last() {
            Some(layer) => layer[sum as usize] != UNREACHABLE,
            None => sum == 0,
        }
    }

    /// Reachable subtotals within `[lo, hi]`, largest first.
    pub(crate) fn achievable(&self, lo: u64, hi: u64) -> Vec<u64> {
        let hi = hi.min(self.cap);
        if lo > hi {
            return Vec::new();
        }
        (lo..=hi).rev().filter(|&sum| self.reachable(sum)).collect()
    }

    /// Units per inventory mineral that make up `sum`, in inventory order.
    ///
    /// `sum` must be reachable.
    pub(crate) fn decompose(&self, sum: u64, produces: &str) -> Vec<UsedMineral> {
        debug_assert!(self.reachable(sum), "decomposing unreachable subtotal {sum}");

        let mut per_class = vec![0u32; self.classes.len()];
        let mut rest = sum as usize;
        for (i, class) in self.classes.iter().enumerate().rev() {
            let units = self.units[i][rest];
            per_class[i] = units;
            rest -= units as usize * class.yield_mb as usize;
        }
        debug_assert_eq!(rest, 0);

        // Spread each class's units over its minerals, first listed first
        let mut per_mineral = vec![0u32; self.minerals.len()];
        for (class, mut remaining) in self.classes.iter().zip(per_class) {
            for &index in &class.pieces {
                let take = remaining.min(self.minerals[index].quantity);
                per_mineral[index] = take;
                remaining -= take;
            }
        }

        self.minerals
            .iter()
            .zip(per_mineral)
            .filter(|(_, quantity)| *quantity > 0)
            .map(|(mineral, quantity)| UsedMineral {
                name: mineral.name.clone(),
                produces: produces.to_string(),
                yield_mb: mineral.yield_mb,
                quantity,
            })
            .collect()
    }
}

/// One inventory group and every percentage window that applies to it
#[derive(Debug)]
struct ComponentGroup<'a> {
    key: String,
    percents: Vec<(u32, u32)>,
    table: GroupTable<'a>,
}

/// Inclusive mB window at `target_mb` that satisfies every percentage pair.
fn window(percents: &[(u32, u32)], target_mb: u64) -> (u64, u64) {
    let lo = percents
        .iter()
        .map(|&(min, _)| min_required_mb(min, target_mb))
        .max()
        .unwrap_or(0);
    let hi = percents
        .iter()
        .map(|&(_, max)| max_allowed_mb(max, target_mb))
        .min()
        .unwrap_or(0)
        .min(target_mb);
    (lo, hi)
}

/// Prepared exact search for one set of components over one inventory
#[derive(Debug)]
pub(crate) struct ExactSearch<'a> {
    groups: Vec<ComponentGroup<'a>>,
}

impl<'a> ExactSearch<'a> {
    /// Builds the group tables large enough for any target up to
    /// `max_target_mb`.
    pub(crate) fn prepare(components: &[SmeltingComponent], inventory: &'a Inventory, max_target_mb: u64) -> Self {
        let mut percents_by_key: Vec<(String, Vec<(u32, u32)>)> = Vec::new();
        for component in components {
            let key = component.key();
            match percents_by_key.iter_mut().find(|(k, _)| *k == key) {
                Some((_, percents)) => percents.push((component.min, component.max)),
                None => percents_by_key.push((key, vec![(component.min, component.max)])),
            }
        }

        let groups = percents_by_key
            .into_iter()
            .map(|(key, percents)| {
                let (_, hi) = window(&percents, max_target_mb);
                let minerals = inventory.get(&key);
                let stock = minerals.iter().map(QuantifiedMineral::total_mb).fold(0, u64::saturating_add);
                let cap = hi.min(stock);
                let table = GroupTable::build(minerals, cap);
                debug!(mineral = %key, yields = table.classes.len(), cap, "built subtotal table");
                ComponentGroup { key, percents, table }
            })
            .collect();

        ExactSearch { groups }
    }

    /// Finds minerals adding up to exactly `target_mb` with every group
    /// inside its window. Targets above the prepared maximum may miss
    /// combinations that need larger subtotals.
    pub(crate) fn solve(&self, target_mb: u64) -> Option<Vec<UsedMineral>> {
        let count = self.groups.len();
        if count == 0 || target_mb == 0 {
            return None;
        }

        let mut windows = Vec::with_capacity(count);
        for group in &self.groups {
            let (lo, hi) = window(&group.percents, target_mb);
            let hi = hi.min(group.table.cap());
            if lo > hi {
                trace!(mineral = %group.key, target_mb, lo, hi, "empty window");
                return None;
            }
            windows.push((lo, hi));
        }

        // Bounds on what the groups after index i can still add
        let mut rest_lo = vec![0u64; count + 1];
        let mut rest_hi = vec![0u64; count + 1];
        for i in (0..count).rev() {
            rest_lo[i] = rest_lo[i + 1] + windows[i].0;
            rest_hi[i] = rest_hi[i + 1] + windows[i].1;
        }
        if rest_lo[0] > target_mb || rest_hi[0] < target_mb {
            return None;
        }

        // choices[g] maps a partial sum over groups[..=g] to groups[g]'s subtotal
        let mut frontier: Vec<u64> = vec![0];
        let mut choices: Vec<BTreeMap<u64, u64>> = Vec::with_capacity(count - 1);
        for (g, group) in self.groups[..count - 1].iter().enumerate() {
            let (lo, hi) = windows[g];
            let options = group.table.achievable(lo, hi);
            let mut next: BTreeMap<u64, u64> = BTreeMap::new();
            for &partial in &frontier {
                for &subtotal in &options {
                    let sum = partial + subtotal;
                    if sum + rest_lo[g + 1] > target_mb {
                        continue;
                    }
                    if sum + rest_hi[g + 1] < target_mb {
                        break;
                    }
                    next.entry(sum).or_insert(subtotal);
                }
            }
            if next.is_empty() {
                return None;
            }
            frontier = next.keys().rev().copied().collect();
            choices.push(next);
        }

        let last = &self.groups[count - 1];
        let (lo, hi) = windows[count - 1];
        let partial = frontier.into_iter().find(|&partial| {
            let needed = target_mb - partial;
            (lo..=hi).contains(&needed) && last.table.reachable(needed)
        })?;

        let mut subtotals = vec![0u64; count];
        subtotals[count - 1] = target_mb - partial;
        let mut sum = partial;
        for g in (0..count - 1).rev() {
            let subtotal = choices[g][&sum];
            subtotals[g] = subtotal;
            sum -= subtotal;
        }

        Some(
            self.groups
                .iter()
                .zip(subtotals)
                .flat_map(|(group, subtotal)| group.table.decompose(subtotal, &group.key))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minerals(pieces: &[(u32, u32)]) -> Vec<QuantifiedMineral> {
        pieces
            .iter()
            .enumerate()
            .map(|(i, &(yield_mb, quantity))| QuantifiedMineral::new(format!("m{i}"), "copper", yield_mb, quantity))
            .collect()
    }

    fn bronze() -> Vec<SmeltingComponent> {
        vec![
            SmeltingComponent::new("copper", 88, 92),
            SmeltingComponent::new("tin", 8, 12),
        ]
    }

    fn total(used: &[UsedMineral]) -> u64 {
        used.iter().map(UsedMineral::total_mb).sum()
    }

    #[test]
    fn table_respects_quantity_limits() {
        let minerals = minerals(&[(24, 2), (36, 1)]);
        let table = GroupTable::build(&minerals, 200);

        for sum in [0, 24, 36, 48, 60, 84] {
            assert!(table.reachable(sum), "{sum} should be reachable");
        }
        for sum in [12, 72, 96, 108] {
            assert!(!table.reachable(sum), "{sum} should not be reachable");
        }
    }

    #[test]
    fn table_without_minerals_only_reaches_zero() {
        let table = GroupTable::build(&[], 100);
        assert!(table.reachable(0));
        assert!(!table.reachable(1));
        assert_eq!(table.achievable(0, 100), vec![0]);
    }

    #[test]
    fn table_ignores_empty_stacks() {
        let minerals = minerals(&[(16, 0), (0, 5), (10, 1)]);
        let table = GroupTable::build(&minerals, 100);
        assert_eq!(table.achievable(0, 100), vec![10, 0]);
    }

    #[test]
    fn achievable_is_largest_first_and_capped() {
        let minerals = minerals(&[(10, 5)]);
        let table = GroupTable::build(&minerals, 30);
        assert_eq!(table.achievable(5, 100), vec![30, 20, 10]);
        assert!(table.achievable(31, 100).is_empty());
    }

    #[test]
    fn decompose_prefers_larger_yields() {
        // 72 is 3x24, 2x36 or 1x24 + 4x12; the largest yield should win
        let minerals = minerals(&[(12, 6), (24, 3), (36, 2)]);
        let table = GroupTable::build(&minerals, 72);
        let used = table.decompose(72, "copper");

        assert_eq!(used.len(), 1);
        assert_eq!(used[0].yield_mb, 36);
        assert_eq!(used[0].quantity, 2);
    }

    #[test]
    fn decompose_spreads_merged_yield_over_stacks_in_order() {
        let minerals = minerals(&[(16, 2), (16, 3), (16, 4)]);
        let table = GroupTable::build(&minerals, 112);
        let used = table.decompose(112, "copper");

        let quantities: Vec<_> = used.iter().map(|m| (m.name.as_str(), m.quantity)).collect();
        assert_eq!(quantities, [("m0", 2), ("m1", 3), ("m2", 2)]);
        assert_eq!(total(&used), 112);
    }

    #[test]
    fn huge_stacks_do_not_blow_up_the_table() {
        let minerals = minerals(&[(16, 1_000_000), (24, 1_000_000)]);
        let table = GroupTable::build(&minerals, 500);
        assert!(table.reachable(496));
        assert!(!table.reachable(501));
    }

    #[test]
    fn exact_bronze_combination() {
        let inventory = Inventory::new()
            .with_mineral("tin", 16, 3)
            .with_mineral("copper", 24, 7)
            .with_mineral("copper", 36, 6);
        let search = ExactSearch::prepare(&bronze(), &inventory, 432);
        let used = search.solve(432).unwrap();

        assert_eq!(total(&used), 432);
        let tin: u64 = used.iter().filter(|m| m.produces == "tin").map(UsedMineral::total_mb).sum();
        assert_eq!(tin, 48);
    }

    #[test]
    fn exact_boundary_percentages_are_inclusive() {
        let inventory = Inventory::new()
            .with_mineral("tin", 16, 2)
            .with_mineral("copper", 16, 23);
        let search = ExactSearch::prepare(&bronze(), &inventory, 400);
        let used = search.solve(400).unwrap();

        let tin: u64 = used.iter().filter(|m| m.produces == "tin").map(UsedMineral::total_mb).sum();
        assert_eq!(tin, 32);
        assert_eq!(total(&used), 400);
    }

    #[test]
    fn coarse_pieces_have_no_exact_combination() {
        let inventory = Inventory::new()
            .with_mineral("tin", 48, 4)
            .with_mineral("copper", 72, 6);
        let search = ExactSearch::prepare(&bronze(), &inventory, 432);
        assert_eq!(search.solve(432), None);
    }

    #[test]
    fn reused_tables_answer_smaller_targets() {
        let inventory = Inventory::new()
            .with_mineral("tin", 16, 2)
            .with_mineral("copper", 24, 8)
            .with_mineral("copper", 36, 4);
        let search = ExactSearch::prepare(&bronze(), &inventory, 432);

        for target in [416, 400, 384] {
            assert_eq!(search.solve(target), None, "{target} should be unfeasible");
        }
        let used = search.solve(368).unwrap();
        assert_eq!(total(&used), 368);
    }

    #[test]
    fn optional_component_without_stock_contributes_nothing() {
        let components = vec![
            SmeltingComponent::new("copper", 80, 100),
            SmeltingComponent::new("zinc", 0, 20),
        ];
        let inventory = Inventory::new().with_mineral("copper", 25, 8);
        let search = ExactSearch::prepare(&components, &inventory, 200);
        let used = search.solve(200).unwrap();

        assert_eq!(used.len(), 1);
        assert_eq!(used[0].produces, "copper");
        assert_eq!(used[0].quantity, 8);
    }

    #[test]
    fn repeated_component_uses_intersected_window() {
        let components = vec![
            SmeltingComponent::new("copper", 0, 100),
            SmeltingComponent::new("Copper", 50, 60),
            SmeltingComponent::new("tin", 0, 100),
        ];
        let inventory = Inventory::new()
            .with_mineral("copper", 10, 10)
            .with_mineral("tin", 10, 10);
        let search = ExactSearch::prepare(&components, &inventory, 100);
        let used = search.solve(100).unwrap();

        let copper: u64 = used.iter().filter(|m| m.produces == "copper").map(UsedMineral::total_mb).sum();
        assert!((50..=60).contains(&copper));
        assert_eq!(total(&used), 100);
    }

    #[test]
    fn inverted_window_is_unfeasible() {
        let components = vec![SmeltingComponent::new("copper", 60, 40)];
        let inventory = Inventory::new().with_mineral("copper", 1, 100);
        let search = ExactSearch::prepare(&components, &inventory, 100);
        assert_eq!(search.solve(100), None);
    }

    #[test]
    fn three_components_combine() {
        let components = vec![
            SmeltingComponent::new("copper", 50, 65),
            SmeltingComponent::new("zinc", 20, 30),
            SmeltingComponent::new("nickel", 10, 20),
        ];
        let inventory = Inventory::new()
            .with_mineral("copper", 24, 10)
            .with_mineral("zinc", 16, 5)
            .with_mineral("nickel", 8, 5);
        let search = ExactSearch::prepare(&components, &inventory, 200);
        let used = search.solve(200).unwrap();

        assert_eq!(total(&used), 200);
        for component in &components {
            let sum: u64 = used
                .iter()
                .filter(|m| m.produces == component.mineral)
                .map(UsedMineral::total_mb)
                .sum();
            assert!(sum >= min_required_mb(component.min, 200));
            assert!(sum <= max_allowed_mb(component.max, 200));
        }
    }
}
