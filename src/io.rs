use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::LedgerEntry;
use crate::error::LoadError;

/// Recursively collects files under `base` whose name ends with `suffix`,
/// sorted by path so multi-file statements concatenate in a stable order.
pub fn list_files_by_suffix(base: &Path, suffix: &str) -> Result<Vec<PathBuf>, LoadError> {
    let mut found = Vec::new();
    walk(base, suffix, &mut found)?;
    found.sort();
    Ok(found)
}

fn walk(dir: &Path, suffix: &str, out: &mut Vec<PathBuf>) -> Result<(), LoadError> {
    if !dir.is_dir() {
        return Ok(());
    }
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            walk(&path, suffix, out)?;
        } else if path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(suffix))
        {
            out.push(path);
        }
    }
    Ok(())
}

/// One monthly income record from the application-account export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomeRecord {
    pub periodo: String,
    pub rendimento: String,
}

pub fn read_income_csv(path: &Path) -> Result<Vec<IncomeRecord>, LoadError> {
    check_required_columns(path, "application-account statement", &["periodo", "rendimento"])?;
    let mut reader = csv::Reader::from_path(path)?;
    let mut records = Vec::new();
    for row in reader.deserialize() {
        records.push(row?);
    }
    Ok(records)
}

/// Validates the header row before any aggregation touches the file.
pub fn check_required_columns(
    path: &Path,
    table: &str,
    required: &[&str],
) -> Result<(), LoadError> {
    if !path.exists() {
        return Err(LoadError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} not found", path.display()),
        )));
    }
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    for column in required {
        if !headers.iter().any(|h| h == *column) {
            return Err(LoadError::MissingColumn {
                table: format!("{table} ({})", path.display()),
                column: column.to_string(),
            });
        }
    }
    Ok(())
}

pub fn read_csv_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, LoadError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

/// Writes one table per file, keeping the per-stage folder convention
/// (interim/ for raw, processed/ for cleaned, output/ for final).
pub fn write_csv_records<T: serde::Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to open {} for writing", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to flush {}", path.display()))?;
    Ok(())
}

pub fn read_ledger_csv(path: &Path) -> Result<Vec<LedgerEntry>> {
    check_required_columns(
        path,
        "consolidated ledger",
        &["DATA", "HIST", "VALOR", "VALOR_APP", "INF", "SALDO"],
    )
    .with_context(|| format!("Invalid ledger file {}", path.display()))?;
    let rows = read_csv_records(path)
        .with_context(|| format!("Failed to read ledger {}", path.display()))?;
    Ok(rows)
}

/// Reads a CSV table whose column set is only known at runtime, such as
/// the state-by-month transfer grids, as a header row plus string cells.
pub fn read_csv_matrix(path: &Path) -> Result<(Vec<String>, Vec<Vec<String>>), LoadError> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(|c| c.to_string()).collect());
    }
    Ok((headers, rows))
}

pub fn read_text_file(path: &Path) -> Result<String, LoadError> {
    Ok(fs::read_to_string(path)?)
}
