use anyhow::{Context, Result, anyhow};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;
use rust_decimal::Decimal;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::Rulebook;
use crate::domain::parse_localized_decimal;
use crate::error::LoadError;

const PORTAL_BASE_URL: &str = "https://www.tesourotransparente.gov.br";

/// Monthly transfer values for one federative unit, ending with the
/// workbook's own TOTAL row.
#[derive(Debug, Clone)]
pub struct UfMonthlySeries {
    pub uf: String,
    pub rows: Vec<(String, Decimal)>,
}

pub const TOTAL_LABEL: &str = "TOTAL";

/// Extracts one UF row from the transfers matrix (`ESTADOS` key column,
/// twelve month columns, `TOTAL` margin), relabeling months as `MM/YYYY`.
pub fn filter_uf_series(
    headers: &[String],
    records: &[Vec<String>],
    uf: &str,
    year: i32,
    rules: &Rulebook,
    table: &str,
) -> Result<UfMonthlySeries, LoadError> {
    let missing = |column: &str| LoadError::MissingColumn {
        table: table.to_string(),
        column: column.to_string(),
    };

    let estados_idx = headers
        .iter()
        .position(|h| h == "ESTADOS")
        .ok_or_else(|| missing("ESTADOS"))?;
    let total_idx = headers
        .iter()
        .position(|h| h == TOTAL_LABEL)
        .ok_or_else(|| missing(TOTAL_LABEL))?;

    let uf = uf.to_uppercase();
    let record = records
        .iter()
        .find(|r| r.get(estados_idx).map(|v| v.trim()) == Some(uf.as_str()))
        .ok_or_else(|| LoadError::MalformedRow {
            table: table.to_string(),
            row: 0,
            reason: format!("UF {uf} not found"),
        })?;

    let mut rows = Vec::new();
    for (idx, header) in headers.iter().enumerate() {
        let Some(month) = rules.month_number(header) else {
            continue;
        };
        let raw = record.get(idx).map(|v| v.as_str()).unwrap_or_default();
        let value = if raw.trim().is_empty() {
            Decimal::ZERO
        } else {
            parse_localized_decimal(raw).ok_or_else(|| LoadError::MalformedRow {
                table: table.to_string(),
                row: 0,
                reason: format!("unparseable '{header}' value '{raw}'"),
            })?
        };
        rows.push((format!("{month:02}/{year}"), value));
    }

    let raw_total = record.get(total_idx).map(|v| v.as_str()).unwrap_or_default();
    let total = parse_localized_decimal(raw_total).ok_or_else(|| LoadError::MalformedRow {
        table: table.to_string(),
        row: 0,
        reason: format!("unparseable TOTAL value '{raw_total}'"),
    })?;
    rows.push((TOTAL_LABEL.to_string(), total));

    Ok(UfMonthlySeries {
        uf: uf.clone(),
        rows,
    })
}

/// One line of the transfers report, per month plus the TOTAL row.
#[derive(Debug, Clone)]
pub struct TransfersSummaryRow {
    pub month: String,
    pub gross: Decimal,
    pub adjustments: Decimal,
    pub net: Decimal,
    pub accumulated: Decimal,
}

/// Combines net transfer values and adjustments into the transfers report.
///
/// `accumulated` is the running sum of the net column; the TOTAL row is not a
/// chronological period, so its accumulated value is pinned to the last real
/// month's value instead of rolling forward. `gross = net - adjustments`.
pub fn transfers_summary(
    net: &UfMonthlySeries,
    adjustments: &UfMonthlySeries,
) -> Vec<TransfersSummaryRow> {
    let adjustment_for = |month: &str| -> Decimal {
        adjustments
            .rows
            .iter()
            .find(|(m, _)| m == month)
            .map(|(_, v)| *v)
            .unwrap_or(Decimal::ZERO)
    };

    let mut rows = Vec::with_capacity(net.rows.len());
    let mut running = Decimal::ZERO;
    let mut last_month_accumulated: Option<Decimal> = None;

    for (month, value) in &net.rows {
        let adjustment = adjustment_for(month);
        let accumulated = if month == TOTAL_LABEL {
            // With no real month before it, the TOTAL row is its own cumsum.
            last_month_accumulated.unwrap_or(*value)
        } else {
            running += *value;
            last_month_accumulated = Some(running);
            running
        };
        rows.push(TransfersSummaryRow {
            month: month.clone(),
            gross: *value - adjustment,
            adjustments: adjustment,
            net: *value,
            accumulated,
        });
    }

    rows
}

/// Publication URL of the yearly FUNDEB transfers workbook. The 2022 edition
/// lives under a deviant path segment on the portal.
pub fn portal_url(year: i32) -> String {
    let segment = if year == 2022 { "114-2" } else { "114" };
    format!(
        "{PORTAL_BASE_URL}/publicacoes/transferencias-ao-fundo-de-manutencao-e-desenvolvimento-da-educacao-basica-fundeb/{year}/{segment}?ano_selecionado={year}"
    )
}

/// Downloads the yearly workbook into `dest_dir/fundeb_<year>.xlsx`.
/// First workbook (.xlsx) link found in a publication page, resolved against
/// the portal host when the href is relative.
fn find_workbook_link(html: &str) -> Option<String> {
    let mut rest = html;
    while let Some(pos) = rest.find("href=") {
        rest = &rest[pos + 5..];
        let quote = rest.chars().next()?;
        if quote != '"' && quote != '\'' {
            continue;
        }
        let rest_after = &rest[1..];
        let Some(end) = rest_after.find(quote) else {
            continue;
        };
        let href = &rest_after[..end];
        rest = &rest_after[end..];

        let path = href.split(['?', '#']).next().unwrap_or(href);
        if !path.to_ascii_lowercase().ends_with(".xlsx") {
            continue;
        }
        if href.starts_with("http://") || href.starts_with("https://") {
            return Some(href.to_string());
        }
        if href.starts_with('/') {
            return Some(format!("{PORTAL_BASE_URL}{href}"));
        }
    }
    None
}

/// Downloads the yearly workbook into `dest_dir/fundeb_<year>.xlsx`.
///
/// The publication URL is an HTML page; the workbook sits behind a download
/// anchor on it, so the page is fetched first and the .xlsx link resolved
/// from its body.
pub fn fetch_transfers(year: i32, dest_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dest_dir)
        .with_context(|| format!("Failed to create {}", dest_dir.display()))?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb.set_message(format!("Downloading FUNDEB transfers for {year}..."));

    let client = Client::builder()
        .build()
        .context("Failed to build HTTP client")?;

    let page_url = portal_url(year);
    let resp = client
        .get(&page_url)
        .header("User-Agent", "fundeb-recon")
        .send()
        .context("Failed to request the transparency portal")?;
    if !resp.status().is_success() {
        pb.finish_and_clear();
        return Err(anyhow!(
            "Transparency portal request failed: HTTP {}",
            resp.status()
        ));
    }
    let page = resp.text().context("Failed to read the publication page")?;

    let Some(workbook_url) = find_workbook_link(&page) else {
        pb.finish_and_clear();
        return Err(anyhow!("No workbook download link found on {page_url}"));
    };

    let resp = client
        .get(&workbook_url)
        .header("User-Agent", "fundeb-recon")
        .send()
        .with_context(|| format!("Failed to download {workbook_url}"))?;
    if !resp.status().is_success() {
        pb.finish_and_clear();
        return Err(anyhow!(
            "Workbook download failed: HTTP {} from {workbook_url}",
            resp.status()
        ));
    }
    let content_type = resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    if content_type.starts_with("text/html") {
        pb.finish_and_clear();
        return Err(anyhow!(
            "Expected a workbook from {workbook_url}, got '{content_type}'"
        ));
    }

    let bytes = resp.bytes().context("Failed to read the workbook body")?;
    pb.finish_and_clear();

    let dest = dest_dir.join(format!("fundeb_{year}.xlsx"));
    let mut file = fs::File::create(&dest)
        .with_context(|| format!("Failed to create {}", dest.display()))?;
    file.write_all(&bytes)
        .with_context(|| format!("Failed to write {}", dest.display()))?;

    Ok(dest)
}
