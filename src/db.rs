//! Database schema and operations

use std::collections::HashMap;

use rusqlite::{Connection, OptionalExtension};

use crate::error::{CatalogError, Result};
use crate::models::{
    Inventory, Mineral, OutputKind, QuantifiedMineral, SmeltingComponent, SmeltingOutput, StockEntry, normalize_key,
};

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Metals and alloys of each imported data set
        CREATE TABLE IF NOT EXISTS outputs (
            dataset TEXT NOT NULL,
            name TEXT NOT NULL,
            kind TEXT NOT NULL,
            producible INTEGER NOT NULL DEFAULT 1,
            PRIMARY KEY (dataset, name)
        );

        -- Percentage windows, in the order the data set lists them
        CREATE TABLE IF NOT EXISTS output_components (
            dataset TEXT NOT NULL,
            output TEXT NOT NULL,
            position INTEGER NOT NULL,
            mineral TEXT NOT NULL,
            min_percent INTEGER NOT NULL,
            max_percent INTEGER NOT NULL,
            PRIMARY KEY (dataset, output, position)
        );

        -- Minerals and the material they smelt into
        CREATE TABLE IF NOT EXISTS minerals (
            dataset TEXT NOT NULL,
            name TEXT NOT NULL,
            produces TEXT NOT NULL,
            yield_mb INTEGER NOT NULL,
            PRIMARY KEY (dataset, name)
        );

        -- What the user has on hand; survives re-imports
        CREATE TABLE IF NOT EXISTS stock (
            dataset TEXT NOT NULL,
            mineral TEXT NOT NULL,
            quantity INTEGER NOT NULL,
            PRIMARY KEY (dataset, mineral)
        );

        CREATE INDEX IF NOT EXISTS idx_minerals_produces ON minerals(dataset, produces);
        "#,
    )?;
    Ok(())
}

/// Remove a data set's catalog rows (for re-import). Stock is kept.
pub fn clear_dataset(conn: &Connection, dataset: &str) -> Result<()> {
    conn.execute("DELETE FROM output_components WHERE dataset = ?1", [dataset])?;
    conn.execute("DELETE FROM outputs WHERE dataset = ?1", [dataset])?;
    conn.execute("DELETE FROM minerals WHERE dataset = ?1", [dataset])?;
    Ok(())
}

/// Insert or replace an output together with its components
pub fn upsert_output(conn: &Connection, dataset: &str, output: &SmeltingOutput) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO outputs (dataset, name, kind, producible)
         VALUES (?1, ?2, ?3, ?4)",
        (dataset, &output.name, output.kind.as_str(), output.producible),
    )?;
    conn.execute(
        "DELETE FROM output_components WHERE dataset = ?1 AND output = ?2",
        (dataset, &output.name),
    )?;
    for (position, component) in output.components.iter().enumerate() {
        conn.execute(
            "INSERT INTO output_components (dataset, output, position, mineral, min_percent, max_percent)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            (
                dataset,
                &output.name,
                position as i64,
                &component.mineral,
                component.min,
                component.max,
            ),
        )?;
    }
    Ok(())
}

/// Insert or replace a mineral under the material key it produces
pub fn insert_mineral(conn: &Connection, dataset: &str, produces: &str, mineral: &Mineral) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO minerals (dataset, name, produces, yield_mb)
         VALUES (?1, ?2, ?3, ?4)",
        (dataset, &mineral.name, normalize_key(produces), mineral.yield_mb),
    )?;
    Ok(())
}

/// List every imported data set
pub fn list_datasets(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT DISTINCT dataset FROM outputs ORDER BY dataset")?;
    let rows = stmt.query_map([], |row| row.get(0))?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

/// Pick the data set to work on: the requested one, or the only one imported
pub fn resolve_dataset(conn: &Connection, requested: Option<&str>) -> Result<String> {
    let datasets = list_datasets(conn)?;
    match requested {
        Some(requested) => datasets
            .into_iter()
            .find(|d| d.eq_ignore_ascii_case(requested.trim_matches('/')))
            .ok_or_else(|| CatalogError::DatasetNotFound(requested.to_string())),
        None => match datasets.as_slice() {
            [] => Err(CatalogError::NoDatasets),
            [only] => Ok(only.clone()),
            _ => Err(CatalogError::DatasetRequired(datasets.join(", "))),
        },
    }
}

fn get_components(conn: &Connection, dataset: &str, output: &str) -> Result<Vec<SmeltingComponent>> {
    let mut stmt = conn.prepare(
        "SELECT mineral, min_percent, max_percent
         FROM output_components
         WHERE dataset = ?1 AND output = ?2
         ORDER BY position",
    )?;

    let rows = stmt.query_map((dataset, output), |row| {
        Ok(SmeltingComponent {
            mineral: row.get(0)?,
            min: row.get(1)?,
            max: row.get(2)?,
        })
    })?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

fn parse_kind(kind: &str) -> OutputKind {
    match kind {
        "metal" => OutputKind::Metal,
        _ => OutputKind::Alloy,
    }
}

/// List all outputs of a data set, metals first
pub fn list_outputs(conn: &Connection, dataset: &str) -> Result<Vec<SmeltingOutput>> {
    let mut stmt = conn.prepare(
        "SELECT name, kind, producible FROM outputs
         WHERE dataset = ?1
         ORDER BY kind DESC, name",
    )?;

    let rows = stmt.query_map([dataset], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, bool>(2)?,
        ))
    })?;

    let mut results = Vec::new();
    for row in rows {
        let (name, kind, producible) = row?;
        let components = get_components(conn, dataset, &name)?;
        results.push(SmeltingOutput {
            name,
            kind: parse_kind(&kind),
            components,
            producible,
        });
    }
    Ok(results)
}

/// Look up an output by name, ignoring case
pub fn get_output(conn: &Connection, dataset: &str, name: &str) -> Result<SmeltingOutput> {
    let row = conn
        .query_row(
            "SELECT name, kind, producible FROM outputs
             WHERE dataset = ?1 AND lower(name) = lower(?2)",
            (dataset, name.trim()),
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, bool>(2)?,
                ))
            },
        )
        .optional()?;

    let (name, kind, producible) = row.ok_or_else(|| CatalogError::OutputNotFound(name.to_string()))?;
    let components = get_components(conn, dataset, &name)?;
    Ok(SmeltingOutput {
        name,
        kind: parse_kind(&kind),
        components,
        producible,
    })
}

/// Get all minerals producing a material key
pub fn get_minerals(conn: &Connection, dataset: &str, produces: &str) -> Result<Vec<Mineral>> {
    let mut stmt = conn.prepare(
        "SELECT name, produces, yield_mb FROM minerals
         WHERE dataset = ?1 AND produces = ?2
         ORDER BY yield_mb, name",
    )?;

    let rows = stmt.query_map((dataset, normalize_key(produces)), |row| {
        Ok(Mineral {
            name: row.get(0)?,
            produces: row.get(1)?,
            yield_mb: row.get(2)?,
        })
    })?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

/// Minerals for every component of `output`, keyed by component mineral.
///
/// Components naming the same mineral share one entry. Fails if any
/// component has no mineral producing it.
pub fn minerals_for_output(conn: &Connection, dataset: &str, output: &SmeltingOutput) -> Result<Vec<(String, Vec<Mineral>)>> {
    let mut results: Vec<(String, Vec<Mineral>)> = Vec::new();
    for component in &output.components {
        let key = component.key();
        if results.iter().any(|(seen, _)| *seen == key) {
            continue;
        }
        let minerals = get_minerals(conn, dataset, &component.mineral)?;
        if minerals.is_empty() {
            return Err(CatalogError::MineralsNotFound {
                output: output.name.clone(),
                mineral: component.mineral.clone(),
            });
        }
        results.push((key, minerals));
    }
    Ok(results)
}

/// Record how many of a mineral are on hand; zero removes the entry
pub fn set_stock(conn: &Connection, dataset: &str, mineral: &str, quantity: u32) -> Result<String> {
    let name: String = conn
        .query_row(
            "SELECT name FROM minerals WHERE dataset = ?1 AND lower(name) = lower(?2)",
            (dataset, mineral.trim()),
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| CatalogError::MineralNotFound(mineral.to_string()))?;

    if quantity == 0 {
        conn.execute(
            "DELETE FROM stock WHERE dataset = ?1 AND mineral = ?2",
            (dataset, &name),
        )?;
    } else {
        conn.execute(
            "INSERT OR REPLACE INTO stock (dataset, mineral, quantity) VALUES (?1, ?2, ?3)",
            (dataset, &name, quantity),
        )?;
    }
    Ok(name)
}

/// List recorded stock for a data set
pub fn list_stock(conn: &Connection, dataset: &str) -> Result<Vec<StockEntry>> {
    let mut stmt = conn.prepare("SELECT mineral, quantity FROM stock WHERE dataset = ?1 ORDER BY mineral")?;
    let rows = stmt.query_map([dataset], |row| {
        Ok(StockEntry {
            mineral: row.get(0)?,
            quantity: row.get(1)?,
        })
    })?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

/// Forget all stock of a data set, returning how many entries were removed
pub fn clear_stock(conn: &Connection, dataset: &str) -> Result<usize> {
    Ok(conn.execute("DELETE FROM stock WHERE dataset = ?1", [dataset])?)
}

/// Build the inventory for `output` from its minerals and the recorded stock
pub fn load_inventory(conn: &Connection, dataset: &str, output: &SmeltingOutput) -> Result<Inventory> {
    let stock: HashMap<String, u32> = list_stock(conn, dataset)?
        .into_iter()
        .map(|entry| (entry.mineral, entry.quantity))
        .collect();

    let mut inventory = Inventory::new();
    for (key, minerals) in minerals_for_output(conn, dataset, output)? {
        let on_hand = minerals.into_iter().filter_map(|mineral| {
            let quantity = stock.get(&mineral.name).copied().unwrap_or(0);
            (quantity > 0).then(|| QuantifiedMineral::from_mineral(mineral, quantity))
        });
        inventory.insert(&key, on_hand);
    }
    Ok(inventory)
}
