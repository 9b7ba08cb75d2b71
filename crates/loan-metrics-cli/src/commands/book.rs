use chrono::Local;
use clap::{Args, Subcommand};
use rust_decimal::Decimal;
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};

use loan_metrics_core::records::{LoanBook, LoanRecord, LoanRow, SortColumn, SortOrder};
use loan_metrics_core::LoanTerms;

use crate::config::Settings;
use crate::input;
use crate::store;

/// Arguments for book management
#[derive(Args)]
pub struct BookArgs {
    /// Book CSV file (defaults to the configured book)
    #[arg(long, global = true)]
    pub file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: BookCommand,
}

#[derive(Subcommand)]
pub enum BookCommand {
    /// List every offer with its derived rates
    List(ListArgs),
    /// Add a named offer
    Add(AddArgs),
    /// Remove the offer at a 1-based position
    Remove(RemoveArgs),
    /// Remove every offer
    Clear,
    /// Write the built-in sample offers
    Sample(SampleArgs),
    /// Replace the book with the valid rows of another CSV file
    Import(ImportArgs),
}

#[derive(Args)]
pub struct ListArgs {
    /// Column to order by (name, principal, periods, per-period-interest,
    /// total-interest, interest-rate, annual-rate, timestamp)
    #[arg(long)]
    pub sort_by: Option<SortColumn>,

    /// Sort in descending order
    #[arg(long, requires = "sort_by")]
    pub descending: bool,
}

#[derive(Args)]
pub struct AddArgs {
    /// Lender or product name
    #[arg(long)]
    pub name: String,

    /// Amount borrowed
    #[arg(long)]
    pub principal: Decimal,

    /// Number of equal repayment periods
    #[arg(long)]
    pub periods: u32,

    /// Interest charged each period (give this or --total-interest)
    #[arg(long)]
    pub per_period_interest: Option<Decimal>,

    /// Interest over the whole loan (give this or --per-period-interest)
    #[arg(long)]
    pub total_interest: Option<Decimal>,
}

#[derive(Args)]
pub struct RemoveArgs {
    /// 1-based position as shown by `book list`
    pub index: usize,
}

#[derive(Args)]
pub struct SampleArgs {
    /// Overwrite an existing book
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct ImportArgs {
    /// CSV file to read
    pub source: PathBuf,
}

pub fn run_book(args: BookArgs, settings: &Settings) -> Result<Value, Box<dyn std::error::Error>> {
    let path = args.file.unwrap_or_else(|| settings.book.clone());

    match args.command {
        BookCommand::List(list) => run_list(&path, list, settings.precision),
        BookCommand::Add(add) => run_add(&path, add, settings.precision),
        BookCommand::Remove(remove) => run_remove(&path, remove),
        BookCommand::Clear => run_clear(&path),
        BookCommand::Sample(sample) => run_sample(&path, sample),
        BookCommand::Import(import) => run_import(&path, import),
    }
}

fn run_list(path: &Path, args: ListArgs, precision: u32) -> Result<Value, Box<dyn std::error::Error>> {
    let book = load_book(path)?;
    let rows = book.rows();

    let positions: Vec<usize> = match args.sort_by {
        Some(column) => {
            let order = if args.descending {
                SortOrder::Descending
            } else {
                SortOrder::Ascending
            };
            book.sorted_positions(column, order)
        }
        None => (0..rows.len()).collect(),
    };

    let listed = positions
        .into_iter()
        .map(|i| row_value(i + 1, &rows[i], precision))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Value::Array(listed))
}

fn run_add(path: &Path, args: AddArgs, precision: u32) -> Result<Value, Box<dyn std::error::Error>> {
    let mut book = if path.exists() {
        load_book_for_edit(path)?
    } else {
        LoanBook::new()
    };

    let terms = LoanTerms::new(
        args.principal,
        args.periods,
        args.per_period_interest,
        args.total_interest,
    )?;
    let record = LoanRecord::new(args.name, terms, Local::now().naive_local())?;
    let row = record.to_row();

    book.push(record);
    store::write_book(path, &book)?;
    tracing::info!(path = %path.display(), name = %row.name, "added offer");

    row_value(book.len(), &row, precision).map_err(Into::into)
}

fn run_remove(path: &Path, args: RemoveArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut book = load_book_for_edit(path)?;
    let removed = args
        .index
        .checked_sub(1)
        .and_then(|i| book.remove(i))
        .ok_or_else(|| {
            format!(
                "No offer at position {} (book has {} offers)",
                args.index,
                book.len()
            )
        })?;

    store::write_book(path, &book)?;
    Ok(json!({
        "removed": removed.name(),
        "remaining": book.len(),
    }))
}

fn run_clear(path: &Path) -> Result<Value, Box<dyn std::error::Error>> {
    let mut book = load_book(path)?;
    let removed = book.len();
    book.clear();
    store::write_book(path, &book)?;
    Ok(json!({ "removed": removed, "remaining": 0 }))
}

fn run_sample(path: &Path, args: SampleArgs) -> Result<Value, Box<dyn std::error::Error>> {
    if path.exists() && !args.force {
        return Err(format!(
            "Book already exists: {} (use --force to overwrite)",
            path.display()
        )
        .into());
    }

    let book = LoanBook::sample(Local::now().naive_local())?;
    store::write_book(path, &book)?;
    Ok(json!({
        "file": path.display().to_string(),
        "records": book.len(),
    }))
}

fn run_import(path: &Path, args: ImportArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let source = input::file::resolve_existing_file(&args.source)?;
    let report = store::read_book(&source)?;
    if report.book.is_empty() {
        return Err(format!("No valid records found in {}", source.display()).into());
    }

    store::write_book(path, &report.book)?;
    tracing::info!(
        source = %source.display(),
        imported = report.book.len(),
        skipped = report.skipped.len(),
        "imported book"
    );

    let skipped_lines: Vec<usize> = report.skipped.iter().map(|(line, _)| *line).collect();
    Ok(json!({
        "file": path.display().to_string(),
        "imported": report.book.len(),
        "skipped": report.skipped.len(),
        "skipped_lines": skipped_lines,
    }))
}

fn load_book(path: &Path) -> Result<LoanBook, Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!(
            "Book not found: {} (run `loanm book sample` or `loanm book add` to create it)",
            path.display()
        )
        .into());
    }
    Ok(store::read_book(path)?.book)
}

/// Load a book that will be written back; refuses files with malformed rows
/// so that a rewrite does not silently drop them.
fn load_book_for_edit(path: &Path) -> Result<LoanBook, Box<dyn std::error::Error>> {
    if !path.exists() {
        return load_book(path);
    }
    let report = store::read_book(path)?;
    if !report.skipped.is_empty() {
        return Err(format!(
            "{} contains {} malformed row(s); fix them or use `loanm book import` first",
            path.display(),
            report.skipped.len()
        )
        .into());
    }
    Ok(report.book)
}

/// A listed row: its 1-based position followed by the tabular columns with
/// money and rates fixed to `precision` decimals.
fn row_value(position: usize, row: &LoanRow, precision: u32) -> Result<Value, serde_json::Error> {
    let fixed = LoanRow {
        name: row.name.clone(),
        principal: fixed_dp(row.principal, precision),
        periods: row.periods,
        per_period_interest: fixed_dp(row.per_period_interest, precision),
        total_interest: fixed_dp(row.total_interest, precision),
        interest_rate: fixed_dp(row.interest_rate, precision),
        annual_rate: fixed_dp(row.annual_rate, precision),
        timestamp: row.timestamp.clone(),
    };

    let mut map = Map::new();
    map.insert("index".into(), Value::from(position));
    if let Value::Object(columns) = serde_json::to_value(fixed)? {
        map.extend(columns);
    }
    Ok(Value::Object(map))
}

fn fixed_dp(value: Decimal, dp: u32) -> Decimal {
    let mut rounded = value.round_dp(dp);
    rounded.rescale(dp);
    rounded
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_fixed_dp_pads_and_rounds() {
        assert_eq!(fixed_dp(dec!(10000), 2).to_string(), "10000.00");
        assert_eq!(fixed_dp(dec!(883.333333), 2).to_string(), "883.33");
        assert_eq!(fixed_dp(dec!(10.8964), 3).to_string(), "10.896");
    }

    #[test]
    fn test_row_value_puts_index_first() {
        let row = LoanRow {
            name: "Bank A".into(),
            principal: dec!(10000),
            periods: 12,
            per_period_interest: dec!(50),
            total_interest: dec!(600),
            interest_rate: dec!(6),
            annual_rate: dec!(10.896382),
            timestamp: "2024-01-01 00:00:00".into(),
        };
        let value = row_value(3, &row, 2).unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys[0], "index");
        assert_eq!(keys[1], "name");
        assert_eq!(value["index"], 3);
        assert_eq!(value["annual_rate"], "10.90");
    }
}
