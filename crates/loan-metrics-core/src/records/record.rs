use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::LoanMetricsError;
use crate::terms::LoanTerms;
use crate::types::*;
use crate::LoanMetricsResult;

/// Rendering used for record timestamps in tables and CSV files
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A named loan offer captured at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoanRecord {
    name: String,
    terms: LoanTerms,
    created_at: NaiveDateTime,
}

impl LoanRecord {
    pub fn new(
        name: impl Into<String>,
        terms: LoanTerms,
        created_at: NaiveDateTime,
    ) -> LoanMetricsResult<Self> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(LoanMetricsError::invalid(
                "name",
                "Lender or product name must not be empty",
            ));
        }
        Ok(LoanRecord {
            name,
            terms,
            created_at,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn terms(&self) -> &LoanTerms {
        &self.terms
    }

    pub fn created_at(&self) -> NaiveDateTime {
        self.created_at
    }

    pub fn timestamp(&self) -> String {
        self.created_at.format(TIMESTAMP_FORMAT).to_string()
    }

    /// Flatten into the eight tabular columns.
    pub fn to_row(&self) -> LoanRow {
        LoanRow {
            name: self.name.clone(),
            principal: self.terms.principal(),
            periods: self.terms.periods(),
            per_period_interest: self.terms.per_period_interest(),
            total_interest: self.terms.total_interest(),
            interest_rate: self.terms.interest_rate(),
            annual_rate: self.terms.annual_rate(),
            timestamp: self.timestamp(),
        }
    }
}

/// Tabular view of a record, column order as exported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanRow {
    pub name: String,
    pub principal: Money,
    pub periods: u32,
    pub per_period_interest: Money,
    pub total_interest: Money,
    pub interest_rate: Percent,
    pub annual_rate: Percent,
    pub timestamp: String,
}

impl LoanRow {
    pub const HEADERS: [&'static str; 8] = [
        "name",
        "principal",
        "periods",
        "per_period_interest",
        "total_interest",
        "interest_rate",
        "annual_rate",
        "timestamp",
    ];
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_row_matches_terms() {
        let terms = LoanTerms::new(dec!(10000), 12, Some(dec!(50)), None).unwrap();
        let record = LoanRecord::new("Bank A", terms.clone(), at(9, 30, 0)).unwrap();
        let row = record.to_row();
        assert_eq!(row.name, "Bank A");
        assert_eq!(row.total_interest, dec!(600));
        assert_eq!(row.interest_rate, dec!(6));
        assert_eq!(row.annual_rate, terms.annual_rate());
        assert_eq!(row.timestamp, "2024-03-01 09:30:00");
    }

    #[test]
    fn test_name_is_trimmed_and_required() {
        let terms = LoanTerms::new(dec!(10000), 12, Some(dec!(50)), None).unwrap();
        let record = LoanRecord::new("  Credit Union  ", terms.clone(), at(0, 0, 0)).unwrap();
        assert_eq!(record.name(), "Credit Union");

        let err = LoanRecord::new("   ", terms, at(0, 0, 0)).unwrap_err();
        assert!(matches!(err, LoanMetricsError::InvalidInput { ref field, .. } if field == "name"));
    }
}
