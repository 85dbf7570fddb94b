use std::path::PathBuf;

use thiserror::Error;

/// Failures raised by the table layer and every pipeline stage built on it.
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("input file not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("table '{table}' is missing required column '{column}'")]
    MissingColumn { table: String, column: String },

    #[error("cannot draw {requested} {population} records: only {available} available")]
    InsufficientPopulation {
        population: &'static str,
        requested: usize,
        available: usize,
    },

    #[error(
        "balanced bimodal target ({bimodal}) exceeds the audio ({audio}) or lyrics ({lyrics}) target"
    )]
    InvalidTargets {
        audio: usize,
        lyrics: usize,
        bimodal: usize,
    },

    #[error("Merge_id is not unique: {count} duplicated value(s), first '{first}'")]
    DuplicateIdentity { count: usize, first: String },

    #[error("unsupported table format: .{0}")]
    UnsupportedFormat(String),

    #[error("CSV error in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("JSON error in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DatasetError>;
