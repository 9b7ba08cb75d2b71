pub mod calculator;
pub mod error;
pub mod terms;
pub mod types;

#[cfg(feature = "records")]
pub mod records;

pub use calculator::{IrrSolution, IrrTermination};
pub use error::LoanMetricsError;
pub use terms::{analyze_loan, solve_irr, IrrInput, LoanAnalysis, LoanTerms, LoanTermsInput};
pub use types::*;

/// Standard result type for all loan-metrics operations
pub type LoanMetricsResult<T> = Result<T, LoanMetricsError>;
