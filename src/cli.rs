use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "fundeb-recon")]
#[command(about = "FUNDEB bank-statement reconciliation and reporting", long_about = None)]
pub struct Cli {
    /// Override the config home directory.
    #[arg(long, env = "FUNDEB_RECON_HOME")]
    pub home: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Bank-statement ingestion and ledger reports.
    Statement(StatementArgs),
    /// Budget-execution reports from the accounting export.
    Accounting(AccountingArgs),
    /// FNDE state-transfer reports.
    Transfers(TransfersArgs),
}

#[derive(Debug, Args)]
pub struct StatementArgs {
    #[command(subcommand)]
    pub cmd: StatementCmd,
}

#[derive(Debug, Subcommand)]
pub enum StatementCmd {
    /// Ingests raw statements and writes the consolidated ledger.
    Run {
        /// Project data directory holding raw/, interim/, processed/, output/.
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        /// Balance carried into January 1, e.g. "1234.56".
        #[arg(long)]
        opening_balance: String,

        /// Fiscal year being reconciled.
        #[arg(long)]
        year: i32,
    },
    /// Aggregates ledger movements by history label.
    Movements {
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        /// C for credits, D for debits.
        #[arg(long)]
        direction: String,
    },
    /// Prints the period waterfall summary through a cut-off month.
    Summary {
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        #[arg(long)]
        year: i32,

        /// Cut-off month (the summary covers January through this month).
        #[arg(long, default_value_t = 12)]
        month: u32,
    },
}

#[derive(Debug, Args)]
pub struct AccountingArgs {
    #[command(subcommand)]
    pub cmd: AccountingCmd,
}

#[derive(Debug, Subcommand)]
pub enum AccountingCmd {
    /// Budget-execution totals by phase, optionally broken down by nature.
    Summary {
        /// Accounting export CSV (empenhos/liquidações/pagamentos).
        #[arg(long)]
        input: PathBuf,

        /// Group by expense nature instead of the payroll/other split.
        #[arg(long)]
        by_nature: bool,
    },
}

#[derive(Debug, Args)]
pub struct TransfersArgs {
    #[command(subcommand)]
    pub cmd: TransfersCmd,
}

#[derive(Debug, Subcommand)]
pub enum TransfersCmd {
    /// Monthly gross/net/accumulated transfers for one state.
    Summary {
        /// Net transfers grid (states by month).
        #[arg(long)]
        transfers: PathBuf,

        /// VAAR adjustments grid (states by month).
        #[arg(long)]
        adjustments: PathBuf,

        #[arg(long, default_value = "AP")]
        uf: String,

        #[arg(long)]
        year: i32,
    },
    /// Downloads the FNDE portal workbook for one year.
    Fetch {
        #[arg(long)]
        year: i32,

        /// Destination directory; defaults to data/raw/fundeb.
        #[arg(long)]
        dest: Option<PathBuf>,
    },
}
