use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;

fn recon_cmd(home: &tempfile::TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("fundeb-recon"));
    cmd.env("FUNDEB_RECON_HOME", home.path());
    cmd
}

fn run_ok(home: &tempfile::TempDir, args: &[&str]) -> String {
    let mut cmd = recon_cmd(home);
    cmd.args(args);
    let out = cmd.assert().success().get_output().stdout.clone();
    String::from_utf8(out).expect("utf8 stdout")
}

/// Primary statement layout: columns cut at 10/17/24/28/54/66/82/85.
fn stmt_line(date: &str, hist: &str, amount: &str, inf: &str, balance: &str) -> String {
    format!(
        "{date:<10}{agency:<7}{lot:<7}{code:<4}{hist:<26}{doc:<12}{amount:>16}{inf:>3}{balance:>16}",
        agency = "1234-5",
        lot = "00123",
        code = "110",
        doc = "900001",
    )
}

/// Alternate layout: columns cut at 10/18/26/32/58/70/86/89.
fn alt_stmt_line(date: &str, hist: &str, amount: &str, inf: &str, balance: &str) -> String {
    format!(
        "{date:<10}{agency:<8}{lot:<8}{code:<6}{hist:<26}{doc:<12}{amount:>16}{inf:>3}{balance:>16}",
        agency = "1234-5",
        lot = "00123",
        code = "110",
        doc = "900001",
    )
}

fn write_fixtures(data_dir: &Path) {
    let raw = data_dir.join("raw");
    fs::create_dir_all(&raw).expect("create raw dir");

    let statement = [
        "EXTRATO DE CONTA CORRENTE - JANEIRO/2025".to_string(),
        stmt_line("02/01/2025", "Saldo Anterior", "1.000,00", "C", "1.000,00"),
        stmt_line("02/01/2025", "RECEBIMENTO DE ICMS", "1.500,00", "C", "2.500,00"),
        stmt_line("", "PREFEITURA MUNICIPAL", "", "", ""),
        stmt_line("15/01/2025", "Impostos", "200,00", "D", "2.300,00"),
        stmt_line("20/01/2025", "BB-APLIC C.PRZ-APL.AUT", "800,00", "D", "1.500,00"),
    ]
    .join("\n");
    fs::write(raw.join("2025-01_Extrato_Conta_Corrente.txt"), statement)
        .expect("write statement fixture");

    fs::write(
        raw.join("2025_Extrato_Conta_Aplicacoes.csv"),
        "periodo,rendimento\n25/01,\"10,00\"\n",
    )
    .expect("write income fixture");
}

#[test]
fn statement_run_builds_the_staged_outputs() {
    let home = tempfile::tempdir().expect("tempdir");
    let data_dir = home.path().join("data");
    write_fixtures(&data_dir);

    let out = run_ok(
        &home,
        &[
            "statement",
            "run",
            "--data-dir",
            data_dir.to_str().unwrap(),
            "--opening-balance",
            "1000",
            "--year",
            "2025",
        ],
    );

    // Opening row + 3 movements (carry-over dropped) + 1 income row.
    assert!(out.contains("Consolidated 5 entries"));
    assert!(out.contains("Closing balance: R$ 2.310,00"));

    for staged in [
        "interim/extrato_conta_corrente_bruto.csv",
        "interim/extrato_conta_aplicacao_bruto.csv",
        "processed/extrato_conta_corrente_limpo.csv",
        "processed/extrato_conta_aplicacao_limpo.csv",
        "output/extrato_bancario.csv",
    ] {
        assert!(data_dir.join(staged).is_file(), "missing {staged}");
    }

    let ledger = fs::read_to_string(data_dir.join("output/extrato_bancario.csv"))
        .expect("read ledger");
    // The wrapped description folds into the ICMS row's DET_HIST column.
    assert!(ledger.contains("PREFEITURA MUNICIPAL"));
    assert!(!ledger.contains("Saldo Anterior"));
    // The opening row is dated December 31 of the prior year.
    assert!(ledger.contains("2024-12-31"));
}

#[test]
fn statement_run_falls_back_to_the_alternate_layout() {
    let home = tempfile::tempdir().expect("tempdir");
    let data_dir = home.path().join("data");
    let raw = data_dir.join("raw");
    fs::create_dir_all(&raw).expect("create raw dir");

    let statement = alt_stmt_line("03/02/2025", "FPE/FPM", "250,00", "C", "250,00");
    fs::write(raw.join("2025-02_Extrato_Conta_Corrente.txt"), statement)
        .expect("write statement fixture");
    fs::write(
        raw.join("2025_Extrato_Conta_Aplicacoes.csv"),
        "periodo,rendimento\n25/02,\"5,00\"\n",
    )
    .expect("write income fixture");

    let out = run_ok(
        &home,
        &[
            "statement",
            "run",
            "--data-dir",
            data_dir.to_str().unwrap(),
            "--opening-balance",
            "0",
            "--year",
            "2025",
        ],
    );
    assert!(out.contains("Closing balance: R$ 255,00"));
}

#[test]
fn statement_run_fails_without_raw_inputs() {
    let home = tempfile::tempdir().expect("tempdir");
    let data_dir = home.path().join("data");
    fs::create_dir_all(data_dir.join("raw")).expect("create raw dir");

    let mut cmd = recon_cmd(&home);
    cmd.args([
        "statement",
        "run",
        "--data-dir",
        data_dir.to_str().unwrap(),
        "--opening-balance",
        "0",
        "--year",
        "2025",
    ]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Extrato_Conta_Corrente.txt"));
}

#[test]
fn movements_and_summary_read_the_consolidated_ledger() {
    let home = tempfile::tempdir().expect("tempdir");
    let data_dir = home.path().join("data");
    write_fixtures(&data_dir);

    run_ok(
        &home,
        &[
            "statement",
            "run",
            "--data-dir",
            data_dir.to_str().unwrap(),
            "--opening-balance",
            "1000",
            "--year",
            "2025",
        ],
    );

    let credits = run_ok(
        &home,
        &[
            "statement",
            "movements",
            "--data-dir",
            data_dir.to_str().unwrap(),
            "--direction",
            "C",
        ],
    );
    assert!(credits.contains("RECEBIMENTO DE ICMS"));
    assert!(credits.contains("R$ 1.500,00"));
    assert!(credits.contains("TOTAL"));
    assert!(credits.contains("R$ 1.510,00"));

    let debits = run_ok(
        &home,
        &[
            "statement",
            "movements",
            "--data-dir",
            data_dir.to_str().unwrap(),
            "--direction",
            "D",
        ],
    );
    assert!(debits.contains("Impostos"));
    assert!(debits.contains("R$ -200,00"));
    // The auto-application counterpart is excluded from the debit breakdown.
    assert!(!debits.contains("BB-APLIC C.PRZ-APL.AUT"));

    let summary = run_ok(
        &home,
        &[
            "statement",
            "summary",
            "--data-dir",
            data_dir.to_str().unwrap(),
            "--year",
            "2025",
            "--month",
            "12",
        ],
    );
    assert!(summary.contains("1. SALDO INICIAL"));
    assert!(summary.contains("R$ 1.000,00"));
    assert!(summary.contains("4. SALDO FINAL"));
    assert!(summary.contains("R$ 2.310,00"));
    assert!(summary.contains("6. TOTAL RESGATADO"));
}

#[test]
fn summary_rejects_an_invalid_month() {
    let home = tempfile::tempdir().expect("tempdir");
    let data_dir = home.path().join("data");
    write_fixtures(&data_dir);

    run_ok(
        &home,
        &[
            "statement",
            "run",
            "--data-dir",
            data_dir.to_str().unwrap(),
            "--opening-balance",
            "1000",
            "--year",
            "2025",
        ],
    );

    let mut cmd = recon_cmd(&home);
    cmd.args([
        "statement",
        "summary",
        "--data-dir",
        data_dir.to_str().unwrap(),
        "--year",
        "2025",
        "--month",
        "13",
    ]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Invalid month"));
}
