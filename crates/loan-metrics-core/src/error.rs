use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoanMetricsError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },
}

impl LoanMetricsError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        LoanMetricsError::InvalidInput {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}
