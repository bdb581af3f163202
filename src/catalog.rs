//! Catalog data discovery and import
//!
//! A data root holds one directory per data set, laid out as
//! `<type>/<id>/<version>/` with an `outputs.json` listing metals and alloys
//! and a `minerals.json` listing the minerals producing each material.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::Connection;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::db;
use crate::error::{CatalogError, Result};
use crate::models::{Mineral, SmeltingComponent, SmeltingOutput, normalize_key};

pub const OUTPUTS_FILE: &str = "outputs.json";
pub const MINERALS_FILE: &str = "minerals.json";

/// Identifies one data set: `<type>/<id>/<gameVersion>_<resourceVersion>`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DatasetKey {
    pub kind: String,
    pub id: String,
    pub version: String,
}

impl DatasetKey {
    /// Build a key from a directory path relative to the data root.
    pub fn from_relative(path: &Path) -> Option<Self> {
        let parts: Vec<&str> = path.iter().filter_map(|p| p.to_str()).collect();
        match parts.as_slice() {
            [kind, id, version] => Some(Self {
                kind: kind.to_string(),
                id: id.to_string(),
                version: version.to_string(),
            }),
            _ => None,
        }
    }

    pub fn game_version(&self) -> &str {
        self.version.split_once('_').map_or(self.version.as_str(), |(game, _)| game)
    }

    pub fn resource_version(&self) -> Option<&str> {
        self.version.split_once('_').map(|(_, resource)| resource)
    }
}

impl fmt::Display for DatasetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.kind, self.id, self.version)
    }
}

fn default_producible() -> bool {
    true
}

#[derive(Deserialize)]
struct MetalEntry {
    name: String,
    #[serde(default = "default_producible")]
    producible: bool,
}

#[derive(Deserialize)]
struct AlloyEntry {
    name: String,
    #[serde(default)]
    components: Vec<SmeltingComponent>,
    #[serde(default = "default_producible")]
    producible: bool,
}

#[derive(Deserialize)]
struct OutputsFile {
    #[serde(default)]
    metals: Vec<MetalEntry>,
    #[serde(default)]
    alloys: Vec<AlloyEntry>,
}

/// Data set directories found under a data root
#[derive(Debug, Default)]
pub struct DatasetScan {
    pub found: Vec<(DatasetKey, PathBuf)>,
    pub skipped: usize,
}

/// Find every directory holding a complete data set
pub fn find_datasets(root: &Path) -> Result<DatasetScan> {
    if !root.is_dir() {
        return Err(CatalogError::Io {
            path: root.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "data root is not a directory"),
        });
    }

    let mut scan = DatasetScan::default();
    for entry in WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if entry.file_name() != OUTPUTS_FILE {
            continue;
        }
        let Some(dir) = entry.path().parent() else {
            continue;
        };

        if !dir.join(MINERALS_FILE).is_file() {
            warn!(dir = %dir.display(), "skipping data set without {MINERALS_FILE}");
            scan.skipped += 1;
            continue;
        }

        let key = dir
            .strip_prefix(root)
            .ok()
            .and_then(DatasetKey::from_relative);
        match key {
            Some(key) => scan.found.push((key, dir.to_path_buf())),
            None => {
                warn!(dir = %dir.display(), "skipping data set not laid out as <type>/<id>/<version>");
                scan.skipped += 1;
            }
        }
    }

    scan.found.sort();
    Ok(scan)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| CatalogError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse an `outputs.json`; metals become single-component outputs
pub fn load_outputs(path: &Path) -> Result<Vec<SmeltingOutput>> {
    let file: OutputsFile = read_json(path)?;

    let metals = file
        .metals
        .into_iter()
        .map(|metal| SmeltingOutput::metal(metal.name, metal.producible));
    let alloys = file
        .alloys
        .into_iter()
        .map(|alloy| SmeltingOutput::alloy(alloy.name, alloy.components, alloy.producible));

    Ok(metals.chain(alloys).collect())
}

/// Parse a `minerals.json`, keyed by lower-cased material
pub fn load_minerals(path: &Path) -> Result<BTreeMap<String, Vec<Mineral>>> {
    let raw: BTreeMap<String, Vec<Mineral>> = read_json(path)?;

    let mut minerals: BTreeMap<String, Vec<Mineral>> = BTreeMap::new();
    for (key, list) in raw {
        minerals.entry(normalize_key(&key)).or_default().extend(list);
    }
    Ok(minerals)
}

/// Import every data set under `root`, replacing previously imported copies
pub fn import_to_database(conn: &Connection, root: &Path) -> Result<ImportStats> {
    let scan = find_datasets(root)?;
    info!(root = %root.display(), found = scan.found.len(), "scanned for data sets");

    let mut stats = ImportStats {
        skipped: scan.skipped,
        ..ImportStats::default()
    };

    for (key, dir) in &scan.found {
        let loaded = load_outputs(&dir.join(OUTPUTS_FILE))
            .and_then(|outputs| Ok((outputs, load_minerals(&dir.join(MINERALS_FILE))?)));
        let (outputs, minerals) = match loaded {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!(dataset = %key, error = %e, "failed to load data set");
                stats.errors += 1;
                continue;
            }
        };

        let dataset = key.to_string();
        let tx = conn.unchecked_transaction()?;
        db::clear_dataset(&tx, &dataset)?;

        for output in &outputs {
            db::upsert_output(&tx, &dataset, output)?;
            stats.components += output.components.len();
        }
        let mut mineral_count = 0;
        for (produces, list) in &minerals {
            for mineral in list {
                db::insert_mineral(&tx, &dataset, produces, mineral)?;
                mineral_count += 1;
            }
        }
        tx.commit()?;

        stats.datasets += 1;
        stats.outputs += outputs.len();
        stats.minerals += mineral_count;

        debug!(
            dataset = %key,
            game_version = key.game_version(),
            outputs = outputs.len(),
            minerals = mineral_count,
            "imported data set"
        );
    }

    Ok(stats)
}

#[derive(Debug, Default)]
pub struct ImportStats {
    pub datasets: usize,
    pub outputs: usize,
    pub components: usize,
    pub minerals: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl fmt::Display for ImportStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Imported {} data sets ({} outputs, {} components, {} minerals). Skipped: {}, Errors: {}",
            self.datasets, self.outputs, self.components, self.minerals, self.skipped, self.errors
        )
    }
}
