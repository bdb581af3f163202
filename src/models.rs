//! Data models for smelting outputs, minerals and inventories

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// One ingredient of an output and the share of the final mass it may take.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmeltingComponent {
    pub mineral: String,
    pub min: u32, // percent, inclusive
    pub max: u32, // percent, inclusive
}

impl SmeltingComponent {
    pub fn new(mineral: impl Into<String>, min: u32, max: u32) -> Self {
        Self {
            mineral: mineral.into(),
            min,
            max,
        }
    }

    /// Lookup key for this component's mineral in an [`Inventory`].
    pub fn key(&self) -> String {
        normalize_key(&self.mineral)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    Metal,
    Alloy,
}

impl OutputKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputKind::Metal => "metal",
            OutputKind::Alloy => "alloy",
        }
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A smeltable output: a plain metal or an alloy of several components
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SmeltingOutput {
    pub name: String,
    pub kind: OutputKind,
    pub components: Vec<SmeltingComponent>,
    pub producible: bool,
}

impl SmeltingOutput {
    /// A metal is smelted from a single mineral making up all of the output.
    pub fn metal(name: impl Into<String>, producible: bool) -> Self {
        let name = name.into();
        Self {
            components: vec![SmeltingComponent::new(name.clone(), 100, 100)],
            name,
            kind: OutputKind::Metal,
            producible,
        }
    }

    pub fn alloy(name: impl Into<String>, components: Vec<SmeltingComponent>, producible: bool) -> Self {
        Self {
            name: name.into(),
            kind: OutputKind::Alloy,
            components,
            producible,
        }
    }
}

/// A mineral as listed in the catalog, without any stock attached
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mineral {
    pub name: String,
    pub produces: String,
    #[serde(rename = "yield")]
    pub yield_mb: u32,
}

/// A stack of identical mineral pieces available for smelting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuantifiedMineral {
    pub name: String,
    pub produces: String,
    pub yield_mb: u32,
    pub quantity: u32,
}

impl QuantifiedMineral {
    pub fn new(name: impl Into<String>, produces: impl Into<String>, yield_mb: u32, quantity: u32) -> Self {
        Self {
            name: name.into(),
            produces: produces.into(),
            yield_mb,
            quantity,
        }
    }

    pub fn from_mineral(mineral: Mineral, quantity: u32) -> Self {
        Self {
            name: mineral.name,
            produces: mineral.produces,
            yield_mb: mineral.yield_mb,
            quantity,
        }
    }

    pub fn total_mb(&self) -> u64 {
        u64::from(self.yield_mb) * u64::from(self.quantity)
    }
}

/// Available minerals grouped by the key of the material they produce.
///
/// Keys are lower-cased on the way in and on lookup, so `"Copper"` and
/// `"copper"` address the same group. Groups keep their insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    groups: BTreeMap<String, Vec<QuantifiedMineral>>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `minerals` to the group stored under `key`.
    pub fn insert(&mut self, key: &str, minerals: impl IntoIterator<Item = QuantifiedMineral>) {
        self.groups
            .entry(normalize_key(key))
            .or_default()
            .extend(minerals);
    }

    /// Adds a mineral to the group named by its `produces` key.
    pub fn push(&mut self, mineral: QuantifiedMineral) {
        let key = mineral.produces.clone();
        self.insert(&key, [mineral]);
    }

    pub fn with_mineral(mut self, produces: &str, yield_mb: u32, quantity: u32) -> Self {
        self.push(QuantifiedMineral::new("", produces, yield_mb, quantity));
        self
    }

    pub fn get(&self, key: &str) -> &[QuantifiedMineral] {
        self.groups
            .get(&normalize_key(key))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Total mB the group under `key` could contribute.
    pub fn available_mb(&self, key: &str) -> u64 {
        self.get(key)
            .iter()
            .map(QuantifiedMineral::total_mb)
            .fold(0, u64::saturating_add)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[QuantifiedMineral])> {
        self.groups.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.groups.values().all(Vec::is_empty)
    }
}

impl FromIterator<QuantifiedMineral> for Inventory {
    fn from_iter<T: IntoIterator<Item = QuantifiedMineral>>(iter: T) -> Self {
        let mut inventory = Inventory::new();
        for mineral in iter {
            inventory.push(mineral);
        }
        inventory
    }
}

/// Stock the user has recorded for one mineral
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockEntry {
    pub mineral: String,
    pub quantity: u32,
}

pub fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase()
}
