use napi::Result as NapiResult;
use napi_derive::napi;

use loan_metrics_core::terms::{IrrInput, LoanTerms, LoanTermsInput};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

#[napi]
pub fn analyze_loan(input_json: String) -> NapiResult<String> {
    let input: LoanTermsInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = loan_metrics_core::terms::analyze_loan(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn solve_irr(input_json: String) -> NapiResult<String> {
    let input: IrrInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = loan_metrics_core::terms::solve_irr(&input);
    serde_json::to_string(&output).map_err(to_napi_error)
}

/// Derived metrics for many loans at once; fails on the first invalid entry.
#[napi]
pub fn loan_rows(inputs_json: String) -> NapiResult<String> {
    let inputs: Vec<LoanTermsInput> = serde_json::from_str(&inputs_json).map_err(to_napi_error)?;
    let rows = inputs
        .iter()
        .enumerate()
        .map(|(i, input)| {
            let terms = LoanTerms::from_input(input)
                .map_err(|e| to_napi_error(format!("loan {i}: {e}")))?;
            Ok(serde_json::json!({
                "principal": terms.principal(),
                "periods": terms.periods(),
                "per_period_interest": terms.per_period_interest(),
                "total_interest": terms.total_interest(),
                "interest_rate": terms.interest_rate(),
                "per_period_payment": terms.per_period_payment(),
                "periodic_irr": terms.periodic_irr(),
                "annual_rate": terms.annual_rate(),
            }))
        })
        .collect::<NapiResult<Vec<_>>>()?;
    serde_json::to_string(&rows).map_err(to_napi_error)
}
