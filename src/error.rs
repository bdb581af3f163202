use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Data set {0} not found")]
    DatasetNotFound(String),

    #[error("No data set imported yet, run 'import' first")]
    NoDatasets,

    #[error("Several data sets imported ({0}), pick one with --dataset")]
    DatasetRequired(String),

    #[error("Output {0} not found")]
    OutputNotFound(String),

    #[error("No minerals found for {output} with name {mineral}")]
    MineralsNotFound { output: String, mineral: String },

    #[error("Mineral {0} not found")]
    MineralNotFound(String),
}

pub type Result<T> = std::result::Result<T, CatalogError>;
