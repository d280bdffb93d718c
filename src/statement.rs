use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::Path;

use crate::config::Rulebook;
use crate::domain::{
    Direction, LedgerEntry, last_day_of_month, parse_day_first_date, parse_localized_decimal,
};
use crate::error::LoadError;
use crate::io::{IncomeRecord, read_text_file};

/// Character positions splitting a statement line into its nine columns:
/// DATA, AG_O, LOTE, COD_HIST, HIST, DOC, VALOR, INF, SALDO.
#[derive(Debug, Clone, Copy)]
pub struct ColumnLayout {
    pub cuts: [usize; 8],
}

/// The issuing bank printed statements in two layouts during the year.
/// The loader tries the primary one and falls back once to the alternate.
pub const LAYOUTS: [ColumnLayout; 2] = [
    ColumnLayout {
        cuts: [10, 17, 24, 28, 54, 66, 82, 85],
    },
    ColumnLayout {
        cuts: [10, 18, 26, 32, 58, 70, 86, 89],
    },
];

/// One statement line exactly as printed, with no semantic cleanup.
#[derive(Debug, Clone, Serialize)]
pub struct RawStatementRow {
    #[serde(rename = "DATA")]
    pub date: String,
    #[serde(rename = "AG_O")]
    pub agency: String,
    #[serde(rename = "LOTE")]
    pub lot: String,
    #[serde(rename = "COD_HIST")]
    pub history_code: String,
    #[serde(rename = "HIST")]
    pub history: String,
    #[serde(rename = "DOC")]
    pub document: String,
    #[serde(rename = "VALOR")]
    pub amount: String,
    #[serde(rename = "INF")]
    pub direction: String,
    #[serde(rename = "SALDO")]
    pub balance: String,
}

fn slice_columns(line: &str, layout: &ColumnLayout) -> RawStatementRow {
    let chars: Vec<char> = line.chars().collect();
    let slice = |from: usize, to: usize| -> String {
        if from >= chars.len() {
            return String::new();
        }
        let to = to.min(chars.len());
        chars[from..to].iter().collect::<String>().trim().to_string()
    };

    let c = &layout.cuts;
    RawStatementRow {
        date: slice(0, c[0]),
        agency: slice(c[0], c[1]),
        lot: slice(c[1], c[2]),
        history_code: slice(c[2], c[3]),
        history: slice(c[3], c[4]),
        document: slice(c[4], c[5]),
        amount: slice(c[5], c[6]),
        direction: slice(c[6], c[7]),
        balance: slice(c[7], usize::MAX),
    }
}

fn is_movement_row(row: &RawStatementRow) -> bool {
    parse_day_first_date(&row.date).is_some()
        && Direction::parse(&row.direction).is_some()
        && parse_localized_decimal(&row.amount).is_some()
}

/// Splits a statement text dump into raw rows under one layout.
///
/// Returns `None` when the layout yields no recognizable movement row,
/// meaning it did not match the file.
pub fn parse_statement_text(text: &str, layout: &ColumnLayout) -> Option<Vec<RawStatementRow>> {
    let rows: Vec<RawStatementRow> = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| slice_columns(l, layout))
        .collect();

    if rows.iter().any(is_movement_row) {
        Some(rows)
    } else {
        None
    }
}

/// Loads one current-account statement file, retrying with the alternate
/// column layout before giving up on the file.
pub fn load_statement_file(path: &Path) -> Result<Vec<RawStatementRow>, LoadError> {
    let text = read_text_file(path)?;
    for layout in &LAYOUTS {
        if let Some(rows) = parse_statement_text(&text, layout) {
            return Ok(rows);
        }
    }
    Err(LoadError::LayoutMismatch {
        path: path.to_path_buf(),
        tried: LAYOUTS.len(),
    })
}

/// Cleans raw current-account rows into standardized ledger entries.
///
/// Drops header/footer rows (no C/D flag), folds wrapped descriptions from
/// blank-date continuation rows into the preceding entry, drops the bank's
/// carry-over row, negates debits, zeroes the stated balance and routes
/// auto-application/auto-redemption amounts into the application column.
pub fn clean_current_account(
    rows: &[RawStatementRow],
    rules: &Rulebook,
) -> Result<Vec<LedgerEntry>, LoadError> {
    let mut entries: Vec<LedgerEntry> = Vec::new();
    let mut last_was_movement = false;

    for (i, row) in rows.iter().enumerate() {
        if row.date.trim().is_empty() {
            // Wrapped description printed on its own line below the movement.
            if last_was_movement && !row.history.trim().is_empty() {
                if let Some(prev) = entries.last_mut() {
                    prev.detail = Some(row.history.clone());
                }
            }
            last_was_movement = false;
            continue;
        }

        let Some(direction) = Direction::parse(&row.direction) else {
            last_was_movement = false;
            continue;
        };

        if row.history == rules.prior_balance_label {
            last_was_movement = false;
            continue;
        }

        let date = parse_day_first_date(&row.date).ok_or_else(|| LoadError::MalformedRow {
            table: "current-account statement".to_string(),
            row: i,
            reason: format!("unparseable date '{}'", row.date),
        })?;
        let amount =
            parse_localized_decimal(&row.amount).ok_or_else(|| LoadError::MalformedRow {
                table: "current-account statement".to_string(),
                row: i,
                reason: format!("unparseable amount '{}'", row.amount),
            })?;

        let amount = match direction {
            Direction::Debit => -amount,
            Direction::Credit => amount,
        };

        let is_sub_account_transfer = row.history == rules.auto_application_label
            || row.history == rules.auto_redemption_label;
        let (amount, app_amount) = if is_sub_account_transfer {
            (Decimal::ZERO, amount)
        } else {
            (amount, Decimal::ZERO)
        };

        entries.push(LedgerEntry {
            date,
            agency: row.agency.clone(),
            lot: row.lot.clone(),
            history_code: row.history_code.clone(),
            history: row.history.clone(),
            document: row.document.clone(),
            app_amount,
            amount,
            direction: Some(direction),
            // The stated balance is per-transaction and not additively
            // consistent with the consolidated ledger; recomputed later.
            balance: Decimal::ZERO,
            detail: None,
        });
        last_was_movement = true;
    }

    Ok(entries)
}

/// Standardizes application-account income records: one RENDIMENTOS credit
/// per month, dated the last calendar day of that month.
pub fn clean_application_account(
    records: &[IncomeRecord],
    rules: &Rulebook,
) -> Result<Vec<LedgerEntry>, LoadError> {
    let mut entries: Vec<LedgerEntry> = Vec::new();

    for (i, record) in records.iter().enumerate() {
        let malformed = |reason: String| LoadError::MalformedRow {
            table: "application-account statement".to_string(),
            row: i,
            reason,
        };

        let date = parse_period(&record.periodo)
            .ok_or_else(|| malformed(format!("unparseable period '{}'", record.periodo)))?;
        let amount = parse_localized_decimal(&record.rendimento)
            .ok_or_else(|| malformed(format!("unparseable income '{}'", record.rendimento)))?;

        entries.push(LedgerEntry {
            date,
            agency: "0000".to_string(),
            lot: "00000".to_string(),
            history_code: "000".to_string(),
            history: rules.income_label.clone(),
            document: "0".to_string(),
            app_amount: Decimal::ZERO,
            amount,
            direction: Some(Direction::Credit),
            balance: Decimal::ZERO,
            detail: Some(rules.income_label.clone()),
        });
    }

    entries.sort_by_key(|e| e.date);
    Ok(entries)
}

/// Parses a `YY/MM` statement period into the month-end date.
fn parse_period(raw: &str) -> Option<NaiveDate> {
    let (yy, mm) = raw.trim().split_once('/')?;
    let year: i32 = yy.parse().ok()?;
    let month: u32 = mm.parse().ok()?;
    last_day_of_month(2000 + year, month)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn primary_line(
        date: &str,
        hist: &str,
        amount: &str,
        inf: &str,
        balance: &str,
    ) -> String {
        format!(
            "{date:<10}{agency:<7}{lot:<7}{code:<4}{hist:<26}{doc:<12}{amount:>16}{inf:>3}{balance:>16}",
            agency = "1234-5",
            lot = "00123",
            code = "110",
            doc = "900001",
        )
    }

    fn rules() -> Rulebook {
        Rulebook::default()
    }

    #[test]
    fn primary_layout_parses_movement_rows() {
        let text = format!(
            "{}\n{}\n",
            "EXTRATO DE CONTA CORRENTE - JANEIRO/2025",
            primary_line("02/01/2025", "RECEBIMENTO DE ICMS", "1.500,00", "C", "1.500,00")
        );
        let rows = parse_statement_text(&text, &LAYOUTS[0]).expect("layout match");
        let movement = rows.iter().find(|r| !r.date.is_empty() && r.date.contains('/'));
        let movement = movement.expect("movement row");
        assert_eq!(movement.history, "RECEBIMENTO DE ICMS");
        assert_eq!(movement.direction, "C");
    }

    #[test]
    fn loader_rejects_text_with_no_movement_rows() {
        let text = "EXTRATO\nSEM MOVIMENTO NO PERÍODO\n";
        assert!(parse_statement_text(text, &LAYOUTS[0]).is_none());
        assert!(parse_statement_text(text, &LAYOUTS[1]).is_none());
    }

    #[test]
    fn cleaning_negates_debits_and_routes_sub_account_transfers() {
        let text = [
            primary_line("02/01/2025", "RECEBIMENTO DE ICMS", "1.500,00", "C", "1.500,00"),
            primary_line("03/01/2025", "Impostos", "200,00", "D", "1.300,00"),
            primary_line("04/01/2025", "BB-APLIC C.PRZ-APL.AUT", "800,00", "D", "500,00"),
        ]
        .join("\n");
        let rows = parse_statement_text(&text, &LAYOUTS[0]).unwrap();
        let entries = clean_current_account(&rows, &rules()).unwrap();

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].amount, Decimal::new(150000, 2));
        assert_eq!(entries[1].amount, Decimal::new(-20000, 2));
        // Auto-application: ordinary amount zeroed, application column signed.
        assert_eq!(entries[2].amount, Decimal::ZERO);
        assert_eq!(entries[2].app_amount, Decimal::new(-80000, 2));
        assert!(entries.iter().all(|e| e.balance == Decimal::ZERO));
    }

    #[test]
    fn cleaning_folds_continuation_rows_and_drops_carry_over() {
        let text = [
            primary_line("02/01/2025", "Saldo Anterior", "100,00", "C", "100,00"),
            primary_line("02/01/2025", "TED-Crédito em Conta", "50,00", "C", "150,00"),
            primary_line("", "PREFEITURA MUNICIPAL", "", "", ""),
        ]
        .join("\n");
        let rows = parse_statement_text(&text, &LAYOUTS[0]).unwrap();
        let entries = clean_current_account(&rows, &rules()).unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].history, "TED-Crédito em Conta");
        assert_eq!(entries[0].detail.as_deref(), Some("PREFEITURA MUNICIPAL"));
    }

    #[test]
    fn application_records_land_on_month_end() {
        let records = vec![
            IncomeRecord {
                periodo: "25/02".to_string(),
                rendimento: "457.431,56".to_string(),
            },
            IncomeRecord {
                periodo: "25/01".to_string(),
                rendimento: "235.913,62".to_string(),
            },
        ];
        let entries = clean_application_account(&records, &rules()).unwrap();

        assert_eq!(entries.len(), 2);
        // Sorted by period, dated at month end (2025 is not a leap year).
        assert_eq!(entries[0].date, NaiveDate::from_ymd_opt(2025, 1, 31).unwrap());
        assert_eq!(entries[1].date, NaiveDate::from_ymd_opt(2025, 2, 28).unwrap());
        assert_eq!(entries[0].history, "RENDIMENTOS");
        assert_eq!(entries[0].direction, Some(Direction::Credit));
    }
}
