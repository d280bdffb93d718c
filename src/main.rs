mod accounting;
mod cli;
mod config;
mod domain;
mod error;
mod io;
mod ledger;
mod pipeline;
mod statement;
mod summary;
mod transfers;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};

use crate::accounting::{
    BUDGET_PHASES, REQUIRED_ACCOUNTING_COLUMNS, RawAccountingRow, budget_nature_summary,
    budget_summary, transform_accounting,
};
use crate::cli::{AccountingCmd, Cli, Command, StatementCmd, TransfersCmd};
use crate::config::{AppConfig, app_paths, load_or_init_config};
use crate::domain::{Direction, LedgerEntry, format_brl};
use crate::summary::{movement_summary, period_summary};
use crate::transfers::{fetch_transfers, filter_uf_series, transfers_summary};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let paths = app_paths(cli.home.clone())?;
    let (cfg, _cfg_path) = load_or_init_config(&paths)?;

    match cli.command {
        Command::Statement(args) => handle_statement(args.cmd, &cfg),
        Command::Accounting(args) => handle_accounting(args.cmd, &cfg),
        Command::Transfers(args) => handle_transfers(args.cmd, &cfg),
    }
}

fn handle_statement(cmd: StatementCmd, cfg: &AppConfig) -> Result<()> {
    let rules = &cfg.rulebook;
    match cmd {
        StatementCmd::Run {
            data_dir,
            opening_balance,
            year,
        } => {
            let opening_balance = parse_decimal(opening_balance, "opening-balance")?;
            let ledger =
                pipeline::run_statement_pipeline(&data_dir, opening_balance, year, rules)?;
            let closing = ledger.last().map(|e| e.balance).unwrap_or(Decimal::ZERO);
            println!(
                "Consolidated {} entries into {}",
                ledger.len(),
                pipeline::ledger_path(&data_dir).display()
            );
            println!("Closing balance: {}", format_brl(closing));
        }
        StatementCmd::Movements {
            data_dir,
            direction,
        } => {
            let direction = Direction::parse(&direction)
                .ok_or_else(|| anyhow!("Invalid direction (expected C or D): {direction}"))?;
            let ledger = read_ledger(&data_dir)?;
            let summary = movement_summary(&ledger, direction, rules);

            let mut rows: Vec<Vec<String>> = summary
                .rows
                .iter()
                .map(|(hist, value)| vec![hist.clone(), format_brl(*value)])
                .collect();
            rows.push(vec!["TOTAL".to_string(), format_brl(summary.total)]);
            print_table(&["HIST", "VALOR"], &rows);
        }
        StatementCmd::Summary {
            data_dir,
            year,
            month,
        } => {
            let ledger = read_ledger(&data_dir)?;
            let summary = period_summary(&ledger, year, month, rules)
                .ok_or_else(|| anyhow!("Invalid month: {month}"))?;

            for line in summary.lines() {
                match line.value {
                    Some(value) => println!("{:<60}{:>20}", line.label, format_brl(value)),
                    None => println!("{}", line.label),
                }
            }
        }
    }
    Ok(())
}

fn handle_accounting(cmd: AccountingCmd, cfg: &AppConfig) -> Result<()> {
    let rules = &cfg.rulebook;
    match cmd {
        AccountingCmd::Summary { input, by_nature } => {
            io::check_required_columns(&input, "accounting export", &REQUIRED_ACCOUNTING_COLUMNS)?;
            let raw: Vec<RawAccountingRow> = io::read_csv_records(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let lines = transform_accounting(&raw, rules)?;

            if by_nature {
                let mut headers = vec!["Classificação", "Natureza"];
                headers.extend(BUDGET_PHASES);
                let rows: Vec<Vec<String>> = budget_nature_summary(&lines)
                    .iter()
                    .map(|row| {
                        let mut cells = vec![row.classification.clone(), row.nature.clone()];
                        cells.extend(row.values.iter().map(|v| format_brl(*v)));
                        cells
                    })
                    .collect();
                print_table(&headers, &rows);
            } else {
                let headers = [
                    "Ordem",
                    "Fase Orçamentária",
                    rules.payroll_classification.as_str(),
                    rules.other_classification.as_str(),
                    "TOTAL",
                ];
                let rows: Vec<Vec<String>> = budget_summary(&lines, rules)
                    .iter()
                    .map(|row| {
                        vec![
                            row.ordinal.to_string(),
                            row.phase.to_string(),
                            format_brl(row.payroll),
                            format_brl(row.other),
                            format_brl(row.total),
                        ]
                    })
                    .collect();
                print_table(&headers, &rows);
            }
        }
    }
    Ok(())
}

fn handle_transfers(cmd: TransfersCmd, cfg: &AppConfig) -> Result<()> {
    let rules = &cfg.rulebook;
    match cmd {
        TransfersCmd::Summary {
            transfers,
            adjustments,
            uf,
            year,
        } => {
            let (net_headers, net_records) = io::read_csv_matrix(&transfers)
                .with_context(|| format!("Failed to read {}", transfers.display()))?;
            let (adj_headers, adj_records) = io::read_csv_matrix(&adjustments)
                .with_context(|| format!("Failed to read {}", adjustments.display()))?;

            let net = filter_uf_series(&net_headers, &net_records, &uf, year, rules, "transfers")?;
            let adj = filter_uf_series(
                &adj_headers,
                &adj_records,
                &uf,
                year,
                rules,
                "adjustments",
            )?;

            let rows: Vec<Vec<String>> = transfers_summary(&net, &adj)
                .iter()
                .map(|row| {
                    vec![
                        row.month.clone(),
                        format_brl(row.gross),
                        format_brl(row.adjustments),
                        format_brl(row.net),
                        format_brl(row.accumulated),
                    ]
                })
                .collect();
            print_table(
                &["MÊS", "REPASSE BRUTO", "AJUSTES", "REPASSE LÍQUIDO", "ACUMULADO"],
                &rows,
            );
        }
        TransfersCmd::Fetch { year, dest } => {
            let dest = dest.unwrap_or_else(|| PathBuf::from("data").join("raw").join("fundeb"));
            let path = fetch_transfers(year, &dest)?;
            println!("Saved {}", path.display());
        }
    }
    Ok(())
}

fn read_ledger(data_dir: &Path) -> Result<Vec<LedgerEntry>> {
    let path = pipeline::ledger_path(data_dir);
    io::read_ledger_csv(&path)
        .with_context(|| "Run `statement run` first to build the ledger".to_string())
}

fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    if headers.is_empty() {
        println!("(no columns)");
        return;
    }

    let cols = headers.len();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();

    for row in rows {
        for (i, cell) in row.iter().take(cols).enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    fn print_row(cells: &[String], widths: &[usize]) {
        print!("|");
        for (i, w) in widths.iter().enumerate() {
            let cell = cells.get(i).map(String::as_str).unwrap_or("");
            let pad = w.saturating_sub(cell.chars().count());
            print!(" {}{} |", cell, " ".repeat(pad));
        }
        println!();
    }

    fn print_sep(widths: &[usize]) {
        print!("|");
        for w in widths {
            print!("{}|", "-".repeat(w + 2));
        }
        println!();
    }

    let header_cells: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    print_row(&header_cells, &widths);
    print_sep(&widths);
    for row in rows {
        print_row(row, &widths);
    }
}

fn parse_decimal(raw: String, field: &'static str) -> Result<Decimal> {
    raw.parse::<Decimal>()
        .with_context(|| format!("Invalid decimal for {field}: {raw}"))
}
