use chrono::NaiveDateTime;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::records::record::{LoanRecord, LoanRow};
use crate::terms::LoanTerms;
use crate::LoanMetricsResult;

/// Column a book can be ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortColumn {
    Name,
    Principal,
    Periods,
    PerPeriodInterest,
    TotalInterest,
    InterestRate,
    AnnualRate,
    Timestamp,
}

impl SortColumn {
    pub const ALL: [SortColumn; 8] = [
        SortColumn::Name,
        SortColumn::Principal,
        SortColumn::Periods,
        SortColumn::PerPeriodInterest,
        SortColumn::TotalInterest,
        SortColumn::InterestRate,
        SortColumn::AnnualRate,
        SortColumn::Timestamp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortColumn::Name => "name",
            SortColumn::Principal => "principal",
            SortColumn::Periods => "periods",
            SortColumn::PerPeriodInterest => "per-period-interest",
            SortColumn::TotalInterest => "total-interest",
            SortColumn::InterestRate => "interest-rate",
            SortColumn::AnnualRate => "annual-rate",
            SortColumn::Timestamp => "timestamp",
        }
    }

    fn compare(&self, a: &LoanRecord, b: &LoanRecord) -> Ordering {
        match self {
            SortColumn::Name => a.name().cmp(b.name()),
            SortColumn::Principal => a.terms().principal().cmp(&b.terms().principal()),
            SortColumn::Periods => a.terms().periods().cmp(&b.terms().periods()),
            SortColumn::PerPeriodInterest => a
                .terms()
                .per_period_interest()
                .cmp(&b.terms().per_period_interest()),
            SortColumn::TotalInterest => {
                a.terms().total_interest().cmp(&b.terms().total_interest())
            }
            SortColumn::InterestRate => a.terms().interest_rate().cmp(&b.terms().interest_rate()),
            SortColumn::AnnualRate => a.terms().annual_rate().cmp(&b.terms().annual_rate()),
            SortColumn::Timestamp => a.created_at().cmp(&b.created_at()),
        }
    }
}

impl fmt::Display for SortColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortColumn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        SortColumn::ALL
            .into_iter()
            .find(|column| column.as_str() == normalized)
            .ok_or_else(|| {
                let known: Vec<&str> = SortColumn::ALL.iter().map(|c| c.as_str()).collect();
                format!("unknown column '{s}' (expected one of: {})", known.join(", "))
            })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// An ordered, owned collection of loan records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoanBook {
    records: Vec<LoanRecord>,
}

impl LoanBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Three reference offers used to seed an empty book.
    pub fn sample(created_at: NaiveDateTime) -> LoanMetricsResult<Self> {
        let offers = [
            ("Bank A", dec!(10000), 12, dec!(50)),
            ("Bank B", dec!(20000), 24, dec!(80)),
            ("Bank C", dec!(5000), 6, dec!(30)),
        ];

        let mut book = Self::new();
        for (name, principal, periods, per_period) in offers {
            let terms = LoanTerms::new(principal, periods, Some(per_period), None)?;
            book.push(LoanRecord::new(name, terms, created_at)?);
        }
        Ok(book)
    }

    pub fn push(&mut self, record: LoanRecord) {
        self.records.push(record);
    }

    /// Remove the record at `index`, if there is one.
    pub fn remove(&mut self, index: usize) -> Option<LoanRecord> {
        if index < self.records.len() {
            Some(self.records.remove(index))
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[LoanRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LoanRecord> {
        self.records.iter()
    }

    /// Positions of the records in sorted order, leaving the book untouched.
    /// Stable; equal keys keep their relative order in both directions.
    pub fn sorted_positions(&self, column: SortColumn, order: SortOrder) -> Vec<usize> {
        let mut positions: Vec<usize> = (0..self.records.len()).collect();
        positions.sort_by(|&a, &b| {
            let ordering = column.compare(&self.records[a], &self.records[b]);
            match order {
                SortOrder::Ascending => ordering,
                SortOrder::Descending => ordering.reverse(),
            }
        });
        positions
    }

    pub fn sort_by(&mut self, column: SortColumn, order: SortOrder) {
        let positions = self.sorted_positions(column, order);
        let mut slots: Vec<Option<LoanRecord>> =
            std::mem::take(&mut self.records).into_iter().map(Some).collect();
        self.records = positions
            .into_iter()
            .filter_map(|i| slots[i].take())
            .collect();
    }

    pub fn rows(&self) -> Vec<LoanRow> {
        self.records.iter().map(LoanRecord::to_row).collect()
    }
}

impl From<Vec<LoanRecord>> for LoanBook {
    fn from(records: Vec<LoanRecord>) -> Self {
        LoanBook { records }
    }
}

impl<'a> IntoIterator for &'a LoanBook {
    type Item = &'a LoanRecord;
    type IntoIter = std::slice::Iter<'a, LoanRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
