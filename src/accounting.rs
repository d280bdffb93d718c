use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::config::Rulebook;
use crate::domain::{AccountingLine, parse_localized_decimal};
use crate::error::LoadError;

/// One row of the exported expense report, verbatim. Hierarchical label
/// columns are only printed on the first row of each block.
#[derive(Debug, Clone, Deserialize)]
pub struct RawAccountingRow {
    #[serde(rename = "Unidade Gestora / Unidade Orçamentária / Ação")]
    pub management_unit: Option<String>,
    #[serde(rename = "Natureza")]
    pub nature: Option<String>,
    #[serde(rename = "Fonte")]
    pub source: Option<String>,
    #[serde(rename = "Nota de Empenho")]
    pub commitment_note: Option<String>,
    #[serde(rename = "Nota de Liquidação")]
    pub liquidation_note: Option<String>,
    #[serde(rename = "Credor")]
    pub creditor: Option<String>,
    #[serde(rename = "Dotação Inicial")]
    pub initial_allocation: Option<String>,
    #[serde(rename = "Dotação Atualizada")]
    pub updated_allocation: Option<String>,
    #[serde(rename = "Despesas Empenhadas")]
    pub committed: Option<String>,
    #[serde(rename = "Despesas Liquidadas")]
    pub liquidated: Option<String>,
    #[serde(rename = "Despesas do Exercício Pagas")]
    pub paid: Option<String>,
    #[serde(rename = "Despesas Pagas RAP")]
    pub rap_paid: Option<String>,
}

pub const REQUIRED_ACCOUNTING_COLUMNS: [&str; 12] = [
    "Unidade Gestora / Unidade Orçamentária / Ação",
    "Natureza",
    "Fonte",
    "Nota de Empenho",
    "Nota de Liquidação",
    "Credor",
    "Dotação Inicial",
    "Dotação Atualizada",
    "Despesas Empenhadas",
    "Despesas Liquidadas",
    "Despesas do Exercício Pagas",
    "Despesas Pagas RAP",
];

const CREDITOR_PLACEHOLDER: &str = " - - - ";

/// Cleans and enriches raw expense rows into accounting lines.
///
/// Forward-fills the hierarchical label columns, drops rows where every
/// monetary column is zero, derives the RAP decomposition and assigns the
/// classification from the nature lookup table.
pub fn transform_accounting(
    rows: &[RawAccountingRow],
    rules: &Rulebook,
) -> Result<Vec<AccountingLine>, LoadError> {
    let mut unit = String::new();
    let mut nature = String::new();
    let mut source = String::new();
    let mut commitment_note = String::new();
    let mut liquidation_note = String::new();

    let mut lines: Vec<AccountingLine> = Vec::new();

    for (i, row) in rows.iter().enumerate() {
        let fill = |carried: &mut String, value: &Option<String>| {
            if let Some(v) = value {
                if !v.trim().is_empty() {
                    *carried = v.clone();
                }
            }
        };
        fill(&mut unit, &row.management_unit);
        fill(&mut nature, &row.nature);
        fill(&mut source, &row.source);
        fill(&mut commitment_note, &row.commitment_note);
        fill(&mut liquidation_note, &row.liquidation_note);

        let money = |value: &Option<String>, column: &str| -> Result<Decimal, LoadError> {
            match value.as_deref().map(str::trim) {
                None | Some("") => Ok(Decimal::ZERO),
                Some(raw) => {
                    parse_localized_decimal(raw).ok_or_else(|| LoadError::MalformedRow {
                        table: "accounting report".to_string(),
                        row: i,
                        reason: format!("unparseable '{column}' value '{raw}'"),
                    })
                }
            }
        };

        let initial_allocation = money(&row.initial_allocation, "Dotação Inicial")?;
        let updated_allocation = money(&row.updated_allocation, "Dotação Atualizada")?;
        let committed = money(&row.committed, "Despesas Empenhadas")?;
        let liquidated = money(&row.liquidated, "Despesas Liquidadas")?;
        let paid = money(&row.paid, "Despesas do Exercício Pagas")?;
        let rap_paid = money(&row.rap_paid, "Despesas Pagas RAP")?;

        // Header/footer noise and alignment rows carry no money at all.
        let all_zero = initial_allocation.is_zero()
            && updated_allocation.is_zero()
            && committed.is_zero()
            && liquidated.is_zero()
            && paid.is_zero()
            && rap_paid.is_zero();
        if all_zero {
            continue;
        }

        let creditor = row
            .creditor
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty() && *c != CREDITOR_PLACEHOLDER.trim())
            .map(str::to_string);

        lines.push(AccountingLine {
            management_unit: unit.clone(),
            nature: nature.clone(),
            source: source.clone(),
            commitment_note: commitment_note.clone(),
            liquidation_note: liquidation_note.clone(),
            creditor,
            initial_allocation,
            updated_allocation,
            committed,
            liquidated,
            paid,
            rap_paid,
            rap_total: committed - paid,
            rap_processed: liquidated - paid,
            rap_unprocessed: committed - liquidated,
            classification: rules.classify_nature(&nature).map(str::to_string),
        });
    }

    // Creditor names also print once per block, but only surviving rows
    // participate in the fill.
    let mut carried_creditor: Option<String> = None;
    for line in &mut lines {
        match &line.creditor {
            Some(c) => carried_creditor = Some(c.clone()),
            None => line.creditor = carried_creditor.clone(),
        }
    }

    Ok(lines)
}

/// The nine monetary columns summarized per budget phase, in report order.
pub const BUDGET_PHASES: [&str; 9] = [
    "Dotação Inicial",
    "Dotação Atualizada",
    "Despesas Empenhadas",
    "Despesas Liquidadas",
    "Despesas do Exercício Pagas",
    "Despesas Pagas RAP",
    "Restos a Pagar do Exercício",
    "RAP do Exercício Processados",
    "RAP do Exercício Não Processados",
];

/// Fixed ordinal index of the presentation rows; RAP sub-breakdowns get the
/// fractional sub-indices.
pub const PHASE_ORDINALS: [&str; 9] = ["0", "1", "2", "3", "4", "5", "6", "6.1", "6.2"];

fn phase_value(line: &AccountingLine, phase: usize) -> Decimal {
    match phase {
        0 => line.initial_allocation,
        1 => line.updated_allocation,
        2 => line.committed,
        3 => line.liquidated,
        4 => line.paid,
        5 => line.rap_paid,
        6 => line.rap_total,
        7 => line.rap_processed,
        8 => line.rap_unprocessed,
        _ => unreachable!("phase index out of range"),
    }
}

/// One presentation row of the budget summary: a phase with per-class totals
/// and the grand-total margin.
#[derive(Debug, Clone)]
pub struct BudgetSummaryRow {
    pub ordinal: &'static str,
    pub phase: &'static str,
    pub payroll: Decimal,
    pub other: Decimal,
    pub total: Decimal,
}

/// Pivot-aggregates the nine monetary columns by classification, with a
/// grand-total margin, transposed so phases become rows.
///
/// Unclassified lines (unknown nature codes) do not participate, matching
/// the report's classification contract.
pub fn budget_summary(lines: &[AccountingLine], rules: &Rulebook) -> Vec<BudgetSummaryRow> {
    BUDGET_PHASES
        .iter()
        .enumerate()
        .map(|(idx, phase)| {
            let sum_class = |class: &str| {
                lines
                    .iter()
                    .filter(|l| l.classification.as_deref() == Some(class))
                    .map(|l| phase_value(l, idx))
                    .sum::<Decimal>()
            };
            let payroll = sum_class(&rules.payroll_classification);
            let other = sum_class(&rules.other_classification);
            BudgetSummaryRow {
                ordinal: PHASE_ORDINALS[idx],
                phase,
                payroll,
                other,
                total: payroll + other,
            }
        })
        .collect()
}

/// Finer-grained variant keyed by classification + nature, without the
/// ordinal relabeling. The trailing row carries the grand totals.
#[derive(Debug, Clone)]
pub struct NatureSummaryRow {
    pub classification: String,
    pub nature: String,
    pub values: [Decimal; 9],
}

pub fn budget_nature_summary(lines: &[AccountingLine]) -> Vec<NatureSummaryRow> {
    let mut groups: BTreeMap<(String, String), [Decimal; 9]> = BTreeMap::new();
    for line in lines {
        let Some(class) = line.classification.clone() else {
            continue;
        };
        let values = groups
            .entry((class, line.nature.clone()))
            .or_insert([Decimal::ZERO; 9]);
        for (idx, value) in values.iter_mut().enumerate() {
            *value += phase_value(line, idx);
        }
    }

    let mut rows: Vec<NatureSummaryRow> = groups
        .into_iter()
        .map(|((classification, nature), values)| NatureSummaryRow {
            classification,
            nature,
            values,
        })
        .collect();

    let mut totals = [Decimal::ZERO; 9];
    for row in &rows {
        for (idx, total) in totals.iter_mut().enumerate() {
            *total += row.values[idx];
        }
    }
    rows.push(NatureSummaryRow {
        classification: "TOTAL".to_string(),
        nature: String::new(),
        values: totals,
    });

    rows
}
