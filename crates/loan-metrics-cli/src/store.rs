//! Flat CSV persistence for the loan book.
//!
//! Files carry the eight tabular columns. On read, the derived rate columns
//! are ignored and recomputed; total interest wins over per-period interest
//! because it survives two-decimal rounding without loss.

use chrono::{Local, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;

use loan_metrics_core::records::{LoanBook, LoanRecord, LoanRow, TIMESTAMP_FORMAT};
use loan_metrics_core::LoanTerms;

/// Decimal places written for money and rate cells
const CSV_DECIMALS: usize = 2;

/// Outcome of reading a book file.
#[derive(Debug)]
pub struct LoadReport {
    pub book: LoanBook,
    /// (data line number, reason) for every row that was skipped
    pub skipped: Vec<(usize, String)>,
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(default)]
    name: String,
    principal: String,
    periods: String,
    #[serde(default)]
    per_period_interest: Option<String>,
    #[serde(default)]
    total_interest: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
}

/// Read a book, skipping rows that do not describe a valid loan.
pub fn read_book(path: &Path) -> Result<LoadReport, Box<dyn std::error::Error>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| format!("Failed to open '{}': {}", path.display(), e))?;

    let now = Local::now().naive_local();
    let mut book = LoanBook::new();
    let mut skipped = Vec::new();

    for (i, row) in reader.deserialize::<CsvRow>().enumerate() {
        let line = i + 2;
        let parsed = row
            .map_err(|e| e.to_string())
            .and_then(|row| parse_row(row, now));
        match parsed {
            Ok(record) => book.push(record),
            Err(reason) => {
                tracing::warn!(path = %path.display(), line, %reason, "skipping malformed row");
                skipped.push((line, reason));
            }
        }
    }

    tracing::debug!(path = %path.display(), loaded = book.len(), skipped = skipped.len(), "read book");
    Ok(LoadReport { book, skipped })
}

fn parse_row(row: CsvRow, now: NaiveDateTime) -> Result<LoanRecord, String> {
    let principal = parse_decimal("principal", &row.principal)?;
    let periods = u32::from_str(row.periods.trim())
        .map_err(|_| format!("periods: '{}' is not a whole number", row.periods))?;
    let total = optional_decimal("total_interest", row.total_interest.as_deref())?;
    let per_period = optional_decimal("per_period_interest", row.per_period_interest.as_deref())?;

    let terms = match total {
        Some(total) => LoanTerms::new(principal, periods, None, Some(total)),
        None => LoanTerms::new(principal, periods, per_period, None),
    }
    .map_err(|e| e.to_string())?;

    let created_at = row
        .timestamp
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).ok())
        .unwrap_or(now);

    LoanRecord::new(row.name, terms, created_at).map_err(|e| e.to_string())
}

fn parse_decimal(field: &str, raw: &str) -> Result<Decimal, String> {
    Decimal::from_str(raw.trim()).map_err(|_| format!("{field}: '{raw}' is not a number"))
}

fn optional_decimal(field: &str, raw: Option<&str>) -> Result<Option<Decimal>, String> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => parse_decimal(field, s).map(Some),
    }
}

/// Write the whole book, replacing any existing file.
pub fn write_book(path: &Path, book: &LoanBook) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| format!("Failed to create '{}': {}", path.display(), e))?;
    writer.write_record(LoanRow::HEADERS)?;

    for row in book.rows() {
        writer.write_record([
            row.name,
            money(row.principal),
            row.periods.to_string(),
            money(row.per_period_interest),
            money(row.total_interest),
            money(row.interest_rate),
            money(row.annual_rate),
            row.timestamp,
        ])?;
    }

    writer.flush()?;
    tracing::debug!(path = %path.display(), records = book.len(), "wrote book");
    Ok(())
}

fn money(value: Decimal) -> String {
    format!("{:.*}", CSV_DECIMALS, value)
}
