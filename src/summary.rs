use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::config::Rulebook;
use crate::domain::{Direction, LedgerEntry, last_day_of_month};

/// Per-direction breakdown of ledger movements by bank history label.
#[derive(Debug, Clone)]
pub struct MovementSummary {
    pub rows: Vec<(String, Decimal)>,
    pub total: Decimal,
}

/// Groups ledger movements of one direction by history label.
///
/// The sub-account counterpart label is excluded (auto-redemption from
/// credits, auto-application from debits) since it would double-count the
/// transfer. Credits are sorted descending by accumulated value, debits
/// ascending, so the largest credit sources and smallest debit lines surface
/// first for review.
pub fn movement_summary(
    ledger: &[LedgerEntry],
    direction: Direction,
    rules: &Rulebook,
) -> MovementSummary {
    let excluded = match direction {
        Direction::Credit => rules.auto_redemption_label.as_str(),
        Direction::Debit => rules.auto_application_label.as_str(),
    };

    let mut groups: BTreeMap<String, Decimal> = BTreeMap::new();
    for entry in ledger {
        if entry.direction != Some(direction) || entry.history == excluded {
            continue;
        }
        *groups.entry(entry.history.clone()).or_insert(Decimal::ZERO) += entry.amount;
    }

    let mut rows: Vec<(String, Decimal)> = groups.into_iter().collect();
    match direction {
        Direction::Credit => rows.sort_by(|a, b| b.1.cmp(&a.1)),
        Direction::Debit => rows.sort_by(|a, b| a.1.cmp(&b.1)),
    }

    let total = rows.iter().map(|(_, v)| *v).sum();
    MovementSummary { rows, total }
}

/// One line of the period report: an indented label and an optional value
/// (separator lines carry no value).
#[derive(Debug, Clone)]
pub struct SummaryLine {
    pub label: String,
    pub value: Option<Decimal>,
}

/// Hierarchical waterfall of ledger totals for a year/month cutoff.
#[derive(Debug, Clone)]
pub struct PeriodSummary {
    pub opening_balance: Decimal,
    pub total_inflows: Decimal,
    pub current_inflows: Decimal,
    pub total_repasses: Decimal,
    pub fnde_repasses: Decimal,
    pub daf_quota: Decimal,
    pub union_complement: Decimal,
    pub vaaf: Decimal,
    pub vaat: Decimal,
    pub vaar: Decimal,
    pub vaar_adjustment: Decimal,
    pub income: Decimal,
    pub other_inflows: Decimal,
    pub canceled_orders: Decimal,
    pub received_transfers: Decimal,
    pub total_outflows: Decimal,
    pub canceled_expenses: Decimal,
    pub effective_expenses: Decimal,
    pub closing_balance: Decimal,
    pub total_applied: Decimal,
    pub total_redeemed: Decimal,
}

/// Computes the period summary over entries dated on or before the last
/// calendar day of `year`/`month` (leap-aware).
pub fn period_summary(
    ledger: &[LedgerEntry],
    year: i32,
    month: u32,
    rules: &Rulebook,
) -> Option<PeriodSummary> {
    let cutoff = last_day_of_month(year, month)?;
    let entries: Vec<&LedgerEntry> = ledger.iter().filter(|e| e.date <= cutoff).collect();

    let opening_balance = entries.first().map(|e| e.balance).unwrap_or(Decimal::ZERO);

    let sum_amount = |pred: &dyn Fn(&LedgerEntry) -> bool| -> Decimal {
        entries
            .iter()
            .filter(|e| pred(e))
            .map(|e| e.amount)
            .sum::<Decimal>()
            .round_dp(2)
    };
    let sum_by_hist = |label: &str| sum_amount(&|e| e.history == label);

    let total_applied = entries
        .iter()
        .filter(|e| e.history == rules.auto_application_label)
        .map(|e| e.app_amount)
        .sum::<Decimal>()
        .round_dp(2);
    let total_redeemed = entries
        .iter()
        .filter(|e| e.history == rules.auto_redemption_label)
        .map(|e| e.app_amount)
        .sum::<Decimal>()
        .round_dp(2);

    let income = sum_by_hist(&rules.income_label);
    let total_inflows = sum_amount(&|e| e.direction == Some(Direction::Credit));
    let total_outflows = sum_amount(&|e| e.direction == Some(Direction::Debit));

    let fnde_repasses =
        sum_amount(&|e| rules.fnde_repasse_labels.iter().any(|l| *l == e.history));
    let vaaf = sum_by_hist(&rules.vaaf_label);
    let vaat = sum_by_hist(&rules.vaat_label);
    let vaar = sum_by_hist(&rules.vaar_label);
    let vaar_adjustment = sum_by_hist(&rules.vaar_adjustment_label);

    let canceled_orders = sum_by_hist(&rules.canceled_orders_label);
    let received_transfers =
        sum_amount(&|e| rules.received_transfer_labels.iter().any(|l| *l == e.history));
    let daf_quota = sum_by_hist(&rules.daf_quota_label);

    // Other inflows carry the sign-flip convention on the DAF quota and the
    // VAAR adjustment: both are added into the repasse block and subtracted
    // here, so current + other always reconstructs the direction total.
    let other_inflows = canceled_orders + received_transfers - daf_quota - vaar_adjustment;
    let current_inflows = total_inflows - other_inflows;
    let total_repasses = fnde_repasses + vaaf + vaat + vaar + daf_quota + vaar_adjustment;
    let union_complement = vaaf + vaat + vaar + vaar_adjustment;

    let canceled_expenses = -(canceled_orders + received_transfers);
    let effective_expenses =
        -(-total_outflows - (canceled_orders + received_transfers) + daf_quota + vaar_adjustment);

    // Outflows are stored negated, so this is a plain sum.
    let closing_balance = opening_balance + total_inflows + total_outflows;

    Some(PeriodSummary {
        opening_balance,
        total_inflows,
        current_inflows,
        total_repasses,
        fnde_repasses,
        daf_quota,
        union_complement,
        vaaf,
        vaat,
        vaar,
        vaar_adjustment,
        income,
        other_inflows,
        canceled_orders,
        received_transfers,
        total_outflows,
        canceled_expenses,
        effective_expenses,
        closing_balance,
        total_applied,
        total_redeemed,
    })
}

impl PeriodSummary {
    /// Ordered report lines with the fixed indentation hierarchy and blank
    /// separator rows for presentation.
    pub fn lines(&self) -> Vec<SummaryLine> {
        let row = |label: &str, value: Decimal| SummaryLine {
            label: label.to_string(),
            value: Some(value),
        };
        let sep = |label: &str| SummaryLine {
            label: label.to_string(),
            value: None,
        };

        vec![
            row("1. SALDO INICIAL", self.opening_balance),
            sep(""),
            row("2. TOTAL DE ENTRADAS", self.total_inflows),
            row("   2.1. ENTRADAS CORRENTES", self.current_inflows),
            row("       2.1.1. TOTAL DE REPASSES", self.total_repasses),
            row(
                "           2.1.1.1. FUNDEB - Impostos e Transferências de Impostos (FNDE)",
                self.fnde_repasses + self.daf_quota,
            ),
            row("               2.1.1.1.1. PRINCIPAL", self.fnde_repasses),
            row("               2.1.1.1.2. Ajustes (COTA DAF)", self.daf_quota),
            row(
                "           2.1.1.2. COMPLEMENTAÇÃO DA UNIÃO",
                self.union_complement,
            ),
            row("               2.1.1.2.1. VAAF", self.vaaf),
            row("               2.1.1.2.2. VAAT", self.vaat),
            row("               2.1.1.2.3. VAAR", self.vaar),
            row(
                "               2.1.1.2.4. Ajustes de complementação da União",
                self.vaar_adjustment,
            ),
            row(
                "       2.1.2. RENDIMENTOS DE APLICAÇÕES FINANCEIRAS",
                self.income,
            ),
            row("   2.2. OUTRAS ENTRADAS", self.other_inflows),
            row(
                "       2.2.1. ORDENS CANCELADAS (ENTRADAS)",
                self.canceled_orders,
            ),
            row(
                "       2.2.2. TRANSFERÊNCIAS RECEBIDAS (ENTRADAS)",
                self.received_transfers,
            ),
            row("       2.2.3. Ajustes (COTA DAF)", -self.daf_quota),
            row(
                "       2.2.4. Ajustes de complementação da União",
                -self.vaar_adjustment,
            ),
            sep(" "),
            row("3. TOTAL DE SAÍDAS", self.total_outflows),
            row(
                "   3.1. DESPESAS CANCELADAS/ANULADAS",
                self.canceled_expenses,
            ),
            row("   3.2. Ajustes (COTA DAF)", self.daf_quota),
            row(
                "   3.3. Ajustes de complementação da União",
                self.vaar_adjustment,
            ),
            row(
                "   3.4. DESPESAS EFETIVAMENTE PAGAS",
                self.effective_expenses,
            ),
            sep("  "),
            row("4. SALDO FINAL", self.closing_balance),
            sep("   "),
            row("5. TOTAL APLICADO", self.total_applied),
            row("6. TOTAL RESGATADO", self.total_redeemed),
        ]
    }
}
