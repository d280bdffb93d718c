use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::config::Rulebook;
use crate::domain::LedgerEntry;

/// Consolidates the current-account and application-account statements into
/// the canonical ledger for one fiscal year.
///
/// A synthetic opening-balance row is prepended, dated December 31 of the
/// prior year. Entries are stable-sorted by date (same-date entries keep
/// their original relative order) and the running balance is recomputed as
/// the cumulative sum of the amount column.
pub fn consolidate(
    current: Vec<LedgerEntry>,
    application: Vec<LedgerEntry>,
    opening_balance: Decimal,
    year: i32,
    rules: &Rulebook,
) -> Vec<LedgerEntry> {
    let mut entries: Vec<LedgerEntry> = Vec::with_capacity(current.len() + application.len() + 1);
    entries.extend(current);
    entries.extend(application);
    entries.push(opening_entry(opening_balance, year, rules));

    entries.sort_by_key(|e| e.date);

    let mut running = Decimal::ZERO;
    for entry in &mut entries {
        running += entry.amount;
        entry.balance = running;
    }

    entries
}

fn opening_entry(opening_balance: Decimal, year: i32, rules: &Rulebook) -> LedgerEntry {
    let date = NaiveDate::from_ymd_opt(year - 1, 12, 31).unwrap();
    LedgerEntry {
        date,
        agency: String::new(),
        lot: String::new(),
        history_code: String::new(),
        history: rules.opening_label.clone(),
        document: String::new(),
        app_amount: Decimal::ZERO,
        amount: opening_balance,
        direction: None,
        balance: Decimal::ZERO,
        detail: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Direction;
    use chrono::NaiveDate;

    fn entry(
        date: NaiveDate,
        history: &str,
        amount: Decimal,
        direction: Option<Direction>,
    ) -> LedgerEntry {
        LedgerEntry {
            date,
            agency: "0001".to_string(),
            lot: "00001".to_string(),
            history_code: "100".to_string(),
            history: history.to_string(),
            document: "1".to_string(),
            app_amount: Decimal::ZERO,
            amount,
            direction,
            balance: Decimal::ZERO,
            detail: None,
        }
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn balance_is_cumulative_sum_seeded_by_opening() {
        let current = vec![
            entry(d(2025, 1, 5), "RENDIMENTOS", Decimal::new(500, 0), Some(Direction::Credit)),
            entry(d(2025, 1, 10), "Impostos", Decimal::new(-200, 0), Some(Direction::Debit)),
        ];
        let ledger = consolidate(
            current,
            Vec::new(),
            Decimal::new(1000, 0),
            2025,
            &Rulebook::default(),
        );

        let balances: Vec<Decimal> = ledger.iter().map(|e| e.balance).collect();
        assert_eq!(
            balances,
            vec![
                Decimal::new(1000, 0),
                Decimal::new(1500, 0),
                Decimal::new(1300, 0)
            ]
        );
    }

    #[test]
    fn opening_row_sorts_first_and_is_dated_prior_year_end() {
        let current = vec![entry(
            d(2025, 1, 2),
            "FPE/FPM",
            Decimal::new(100, 0),
            Some(Direction::Credit),
        )];
        let ledger = consolidate(current, Vec::new(), Decimal::ZERO, 2025, &Rulebook::default());

        assert_eq!(ledger[0].history, "SALDO INICIAL");
        assert_eq!(ledger[0].date, d(2024, 12, 31));
        assert!(ledger[0].direction.is_none());
    }

    #[test]
    fn same_date_entries_keep_their_relative_order() {
        let current = vec![
            entry(d(2025, 3, 1), "first", Decimal::ONE, Some(Direction::Credit)),
            entry(d(2025, 3, 1), "second", Decimal::ONE, Some(Direction::Credit)),
        ];
        let application = vec![entry(
            d(2025, 3, 1),
            "third",
            Decimal::ONE,
            Some(Direction::Credit),
        )];
        let ledger = consolidate(current, application, Decimal::ZERO, 2025, &Rulebook::default());

        let histories: Vec<&str> = ledger.iter().map(|e| e.history.as_str()).collect();
        assert_eq!(histories, vec!["SALDO INICIAL", "first", "second", "third"]);
    }
}
