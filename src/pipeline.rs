use anyhow::{Context, Result};
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};

use crate::config::Rulebook;
use crate::domain::LedgerEntry;
use crate::error::LoadError;
use crate::io::{self, IncomeRecord};
use crate::ledger::consolidate;
use crate::statement::{
    RawStatementRow, clean_application_account, clean_current_account, load_statement_file,
};

pub const CURRENT_ACCOUNT_SUFFIX: &str = "Extrato_Conta_Corrente.txt";
pub const APPLICATION_ACCOUNT_SUFFIX: &str = "Extrato_Conta_Aplicacoes.csv";

/// Consolidated ledger, as produced by `statement run`.
pub fn ledger_path(data_dir: &Path) -> PathBuf {
    data_dir.join("output").join("extrato_bancario.csv")
}

/// Runs the bank-statement stage chain for one fiscal year.
///
/// raw/ inputs are concatenated and snapshotted under interim/ exactly as
/// read, cleaned tables land under processed/, and the consolidated ledger
/// under output/. Any malformed input aborts the whole run.
pub fn run_statement_pipeline(
    data_dir: &Path,
    opening_balance: Decimal,
    year: i32,
    rules: &Rulebook,
) -> Result<Vec<LedgerEntry>> {
    let raw_dir = data_dir.join("raw");

    let current_raw = load_current_account_files(&raw_dir)?;
    let income_raw = load_application_account_files(&raw_dir)?;

    let interim = data_dir.join("interim");
    io::write_csv_records(&interim.join("extrato_conta_corrente_bruto.csv"), &current_raw)?;
    io::write_csv_records(&interim.join("extrato_conta_aplicacao_bruto.csv"), &income_raw)?;

    let current = clean_current_account(&current_raw, rules)
        .context("Failed to clean the current-account statement")?;
    let application = clean_application_account(&income_raw, rules)
        .context("Failed to clean the application-account statement")?;

    let processed = data_dir.join("processed");
    io::write_csv_records(&processed.join("extrato_conta_corrente_limpo.csv"), &current)?;
    io::write_csv_records(&processed.join("extrato_conta_aplicacao_limpo.csv"), &application)?;

    let ledger = consolidate(current, application, opening_balance, year, rules);
    io::write_csv_records(&ledger_path(data_dir), &ledger)?;

    Ok(ledger)
}

fn load_current_account_files(raw_dir: &Path) -> Result<Vec<RawStatementRow>> {
    let files = io::list_files_by_suffix(raw_dir, CURRENT_ACCOUNT_SUFFIX)?;
    if files.is_empty() {
        return Err(LoadError::NoInputFiles {
            dir: raw_dir.to_path_buf(),
            suffix: CURRENT_ACCOUNT_SUFFIX.to_string(),
        }
        .into());
    }

    let mut rows = Vec::new();
    for file in files {
        let parsed = load_statement_file(&file)
            .with_context(|| format!("Failed to load statement {}", file.display()))?;
        rows.extend(parsed);
    }
    Ok(rows)
}

fn load_application_account_files(raw_dir: &Path) -> Result<Vec<IncomeRecord>> {
    let files = io::list_files_by_suffix(raw_dir, APPLICATION_ACCOUNT_SUFFIX)?;
    if files.is_empty() {
        return Err(LoadError::NoInputFiles {
            dir: raw_dir.to_path_buf(),
            suffix: APPLICATION_ACCOUNT_SUFFIX.to_string(),
        }
        .into());
    }

    let mut records = Vec::new();
    for file in files {
        let parsed = io::read_income_csv(&file)
            .with_context(|| format!("Failed to load income export {}", file.display()))?;
        records.extend(parsed);
    }
    Ok(records)
}
