use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Movement direction as flagged by the bank (INF column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "C")]
    Credit,
    #[serde(rename = "D")]
    Debit,
}

impl Direction {
    pub fn parse(raw: &str) -> Option<Direction> {
        match raw.trim() {
            "C" | "c" => Some(Direction::Credit),
            "D" | "d" => Some(Direction::Debit),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Direction::Credit => "C",
            Direction::Debit => "D",
        }
    }
}

/// One bank-statement transaction in the standardized project schema.
///
/// Debit amounts are stored negated. For auto-application/auto-redemption
/// entries `amount` is zero and `app_amount` carries the value, so sub-account
/// transfers never double-count as ordinary income or expense. The synthetic
/// opening-balance row is the only entry without a direction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    #[serde(rename = "DATA")]
    pub date: NaiveDate,
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
    #[serde(rename = "VALOR_APP")]
    pub app_amount: Decimal,
    #[serde(rename = "VALOR")]
    pub amount: Decimal,
    #[serde(rename = "INF")]
    pub direction: Option<Direction>,
    #[serde(rename = "SALDO")]
    pub balance: Decimal,
    #[serde(rename = "DET_HIST")]
    pub detail: Option<String>,
}

/// One budget/expense record after cleaning, with the derived RAP columns
/// and the classification assigned from the nature lookup table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountingLine {
    #[serde(rename = "Unidade Gestora / Unidade Orçamentária / Ação")]
    pub management_unit: String,
    #[serde(rename = "Natureza")]
    pub nature: String,
    #[serde(rename = "Fonte")]
    pub source: String,
    #[serde(rename = "Nota de Empenho")]
    pub commitment_note: String,
    #[serde(rename = "Nota de Liquidação")]
    pub liquidation_note: String,
    #[serde(rename = "Credor")]
    pub creditor: Option<String>,
    #[serde(rename = "Dotação Inicial")]
    pub initial_allocation: Decimal,
    #[serde(rename = "Dotação Atualizada")]
    pub updated_allocation: Decimal,
    #[serde(rename = "Despesas Empenhadas")]
    pub committed: Decimal,
    #[serde(rename = "Despesas Liquidadas")]
    pub liquidated: Decimal,
    #[serde(rename = "Despesas do Exercício Pagas")]
    pub paid: Decimal,
    #[serde(rename = "Despesas Pagas RAP")]
    pub rap_paid: Decimal,
    #[serde(rename = "Restos a Pagar do Exercício")]
    pub rap_total: Decimal,
    #[serde(rename = "RAP do Exercício Processados")]
    pub rap_processed: Decimal,
    #[serde(rename = "RAP do Exercício Não Processados")]
    pub rap_unprocessed: Decimal,
    #[serde(rename = "Classificação")]
    pub classification: Option<String>,
}

/// Parses a Brazilian-formatted monetary string ("1.234,56" / "-12,30").
///
/// Thousands separator is a period, decimal separator a comma.
pub fn parse_localized_decimal(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| *c != '.')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<Decimal>().ok()
}

/// Formats a value as Brazilian currency, e.g. `R$ 1.234,56`.
pub fn format_brl(value: Decimal) -> String {
    let rounded = value.round_dp(2);
    let raw = format!("{rounded:.2}");
    let (sign, raw) = match raw.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", raw.as_str()),
    };
    let (int_part, frac_part) = raw.split_once('.').unwrap_or((raw, "00"));

    let mut grouped = String::new();
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    format!("R$ {sign}{grouped},{frac_part}")
}

/// Last calendar day of `year`/`month`, accounting for leap years.
pub fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1).and_then(|d| d.pred_opt())
}

/// Parses a day-first date as printed on the statements ("31/01/2025").
pub fn parse_day_first_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%d/%m/%Y").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn localized_decimal_handles_thousands_and_sign() {
        assert_eq!(
            parse_localized_decimal("1.234,56"),
            Some(Decimal::new(123456, 2))
        );
        assert_eq!(
            parse_localized_decimal("-12,30"),
            Some(Decimal::new(-1230, 2))
        );
        assert_eq!(parse_localized_decimal("  "), None);
        assert_eq!(parse_localized_decimal("abc"), None);
    }

    #[test]
    fn brl_formatting_groups_digits() {
        assert_eq!(format_brl(Decimal::new(123456789, 2)), "R$ 1.234.567,89");
        assert_eq!(format_brl(Decimal::new(-50, 1)), "R$ -5,00");
        assert_eq!(format_brl(Decimal::ZERO), "R$ 0,00");
    }

    #[test]
    fn month_end_respects_leap_years() {
        assert_eq!(
            last_day_of_month(2025, 2),
            NaiveDate::from_ymd_opt(2025, 2, 28)
        );
        assert_eq!(
            last_day_of_month(2024, 2),
            NaiveDate::from_ymd_opt(2024, 2, 29)
        );
        assert_eq!(
            last_day_of_month(2025, 12),
            NaiveDate::from_ymd_opt(2025, 12, 31)
        );
    }
}
