use std::path::PathBuf;
use thiserror::Error;

/// Failures raised while loading and validating source tables.
///
/// Everything here is fatal for the current run except `LayoutMismatch`,
/// which the statement loader recovers from once by retrying the file with
/// the alternate column layout.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no input file matching '*{suffix}' found under {dir}")]
    NoInputFiles { dir: PathBuf, suffix: String },

    #[error("no statement layout matched {path} ({tried} layouts tried)")]
    LayoutMismatch { path: PathBuf, tried: usize },

    #[error("missing required column '{column}' in {table}")]
    MissingColumn { table: String, column: String },

    #[error("malformed {table} row {row}: {reason}")]
    MalformedRow {
        table: String,
        row: usize,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}
