use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::calculator::{self, IrrSolution};
use crate::error::LoanMetricsError;
use crate::types::*;
use crate::LoanMetricsResult;

/// Raw loan terms as supplied by a caller. Exactly one of the two interest
/// fields must be present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanTermsInput {
    /// Amount borrowed
    pub principal: Money,
    /// Number of equal repayment periods
    pub periods: u32,
    /// Interest charged each period, excluding principal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_period_interest: Option<Money>,
    /// Interest summed over all periods
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_interest: Option<Money>,
}

/// Validated loan terms with both interest figures populated.
///
/// Immutable once built; every metric is recomputed from the fields on read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoanTerms {
    principal: Money,
    periods: u32,
    per_period_interest: Money,
    total_interest: Money,
}

impl LoanTerms {
    pub fn new(
        principal: Money,
        periods: u32,
        per_period_interest: Option<Money>,
        total_interest: Option<Money>,
    ) -> LoanMetricsResult<Self> {
        if principal <= Decimal::ZERO {
            return Err(LoanMetricsError::invalid(
                "principal",
                "Principal must be greater than zero",
            ));
        }
        if periods == 0 {
            return Err(LoanMetricsError::invalid(
                "periods",
                "Number of periods must be > 0",
            ));
        }

        let (per_period_interest, total_interest) = match (per_period_interest, total_interest) {
            (Some(per_period), None) => {
                check_non_negative("per_period_interest", per_period)?;
                let total = per_period
                    .checked_mul(Decimal::from(periods))
                    .ok_or_else(|| {
                        LoanMetricsError::invalid(
                            "per_period_interest",
                            "Total interest overflows the supported range",
                        )
                    })?;
                (per_period, total)
            }
            (None, Some(total)) => {
                check_non_negative("total_interest", total)?;
                (total / Decimal::from(periods), total)
            }
            (Some(_), Some(_)) => {
                return Err(LoanMetricsError::invalid(
                    "interest",
                    "Supply either per-period interest or total interest, not both",
                ));
            }
            (None, None) => {
                return Err(LoanMetricsError::invalid(
                    "interest",
                    "Per-period interest or total interest is required",
                ));
            }
        };

        Ok(LoanTerms {
            principal,
            periods,
            per_period_interest,
            total_interest,
        })
    }

    pub fn from_input(input: &LoanTermsInput) -> LoanMetricsResult<Self> {
        Self::new(
            input.principal,
            input.periods,
            input.per_period_interest,
            input.total_interest,
        )
    }

    pub fn principal(&self) -> Money {
        self.principal
    }

    pub fn periods(&self) -> u32 {
        self.periods
    }

    pub fn per_period_interest(&self) -> Money {
        self.per_period_interest
    }

    pub fn total_interest(&self) -> Money {
        self.total_interest
    }

    /// Total interest as a percentage of principal
    pub fn interest_rate(&self) -> Percent {
        calculator::interest_rate(self.total_interest, self.principal)
    }

    pub fn per_period_payment(&self) -> Money {
        calculator::per_period_payment(self.principal, self.total_interest, self.periods)
    }

    pub fn irr_solution(&self) -> IrrSolution {
        calculator::solve_periodic_irr(self.principal, self.per_period_payment(), self.periods)
    }

    /// Per-period IRR of the payment stream against the principal
    pub fn periodic_irr(&self) -> Rate {
        self.irr_solution().rate
    }

    /// IRR annualised over twelve periods, as a percentage
    pub fn annual_rate(&self) -> Percent {
        calculator::annual_rate(self.periodic_irr())
    }
}

fn check_non_negative(field: &str, value: Money) -> LoanMetricsResult<()> {
    if value < Decimal::ZERO {
        return Err(LoanMetricsError::invalid(field, "Interest must be non-negative"));
    }
    Ok(())
}

/// Every derived figure for one loan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanAnalysis {
    pub principal: Money,
    pub periods: u32,
    pub per_period_interest: Money,
    pub total_interest: Money,
    /// Total interest over principal, in percent
    pub interest_rate: Percent,
    pub per_period_payment: Money,
    /// Per-period IRR as a decimal
    pub periodic_irr: Rate,
    /// periodic_irr * 12, in percent
    pub annual_rate: Percent,
    pub irr_converged: bool,
    pub irr_iterations: u32,
}

/// Derive the missing interest figure and compute all loan metrics.
pub fn analyze_loan(input: &LoanTermsInput) -> LoanMetricsResult<ComputationOutput<LoanAnalysis>> {
    let start = Instant::now();
    let terms = LoanTerms::from_input(input)?;
    let solution = terms.irr_solution();

    let mut warnings = irr_warnings(&solution);
    if terms.total_interest().is_zero() {
        warnings.push("Zero-interest loan; IRR is zero by construction".into());
    }

    let output = LoanAnalysis {
        principal: terms.principal(),
        periods: terms.periods(),
        per_period_interest: terms.per_period_interest(),
        total_interest: terms.total_interest(),
        interest_rate: terms.interest_rate(),
        per_period_payment: terms.per_period_payment(),
        periodic_irr: solution.rate,
        annual_rate: calculator::annual_rate(solution.rate),
        irr_converged: solution.converged,
        irr_iterations: solution.iterations,
    };

    let interest_source = if input.total_interest.is_some() {
        "total_interest"
    } else {
        "per_period_interest"
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Equal-payment loan: simple interest rate, Newton-Raphson periodic IRR, simple annualisation",
        &serde_json::json!({
            "principal": input.principal.to_string(),
            "periods": input.periods,
            "interest_source": interest_source,
            "periods_per_year": 12,
        }),
        warnings,
        elapsed,
        output,
    ))
}

/// Input for the raw periodic IRR solver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrrInput {
    pub principal: Money,
    pub payment: Money,
    pub periods: u32,
}

/// Run the periodic IRR solver on explicit cash flows. Never fails: degenerate
/// inputs produce a zero rate with a warning.
pub fn solve_irr(input: &IrrInput) -> ComputationOutput<IrrSolution> {
    let start = Instant::now();
    let solution = calculator::solve_periodic_irr(input.principal, input.payment, input.periods);
    let warnings = irr_warnings(&solution);

    let elapsed = start.elapsed().as_micros() as u64;
    with_metadata(
        "Newton-Raphson IRR on equal periodic payments (guess 1%, tolerance 1e-6, 100 iterations)",
        &serde_json::json!({
            "principal": input.principal.to_string(),
            "payment": input.payment.to_string(),
            "periods": input.periods,
        }),
        warnings,
        elapsed,
        solution,
    )
}

fn irr_warnings(solution: &IrrSolution) -> Vec<String> {
    use crate::calculator::IrrTermination;

    let mut warnings = Vec::new();
    match solution.termination {
        IrrTermination::Converged => {}
        IrrTermination::Degenerate => {
            warnings.push("Non-positive principal, payment or periods; IRR reported as zero".into())
        }
        other => warnings.push(format!(
            "IRR did not converge ({other:?}) after {} iterations; last estimate reported",
            solution.iterations
        )),
    }
    if solution.was_clamped() {
        warnings.push(format!(
            "Negative IRR root {} floored to zero",
            solution.raw_rate.round_dp(8)
        ));
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::IrrTermination;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn tolerance() -> Decimal {
        dec!(0.000000001)
    }

    #[test]
    fn test_derives_total_from_per_period() {
        let terms = LoanTerms::new(dec!(10000), 12, Some(dec!(50)), None).unwrap();
        assert_eq!(terms.total_interest(), dec!(600));
        assert_eq!(terms.per_period_interest(), dec!(50));
    }

    #[test]
    fn test_derives_per_period_from_total() {
        let terms = LoanTerms::new(dec!(5000), 6, None, Some(dec!(180))).unwrap();
        assert_eq!(terms.per_period_interest(), dec!(30));
        assert_eq!(terms.total_interest(), dec!(180));
    }

    #[test]
    fn test_round_trip_non_terminating_division() {
        let terms = LoanTerms::new(dec!(1000), 3, None, Some(dec!(100))).unwrap();
        let rebuilt = terms.per_period_interest() * Decimal::from(terms.periods());
        assert!((rebuilt - terms.total_interest()).abs() < tolerance());

        let terms = LoanTerms::new(dec!(1000), 7, Some(dec!(13.37)), None).unwrap();
        let split = terms.total_interest() / Decimal::from(terms.periods());
        assert!((split - terms.per_period_interest()).abs() < tolerance());
    }

    #[test]
    fn test_scenario_a() {
        let terms = LoanTerms::new(dec!(10000), 12, Some(dec!(50)), None).unwrap();
        assert_eq!(terms.total_interest(), dec!(600));
        assert_eq!(terms.interest_rate(), dec!(6));
        assert!((terms.per_period_payment() - dec!(883.33333333)).abs() < dec!(0.00000001));
        assert!((terms.periodic_irr() - dec!(0.0090803)).abs() < dec!(0.000001));
        assert!((terms.annual_rate() - dec!(10.8964)).abs() < dec!(0.001));
    }

    #[test]
    fn test_scenario_b() {
        let terms = LoanTerms::new(dec!(5000), 6, None, Some(dec!(180))).unwrap();
        assert_eq!(terms.per_period_interest(), dec!(30));
        assert_eq!(terms.interest_rate(), dec!(3.6));
        assert!((terms.per_period_payment() - dec!(863.33333333)).abs() < dec!(0.00000001));
        assert!((terms.periodic_irr() - dec!(0.0101995)).abs() < dec!(0.000001));
    }

    #[test]
    fn test_annual_rate_is_irr_times_1200() {
        let terms = LoanTerms::new(dec!(20000), 24, Some(dec!(80)), None).unwrap();
        let irr = terms.periodic_irr();
        assert_eq!(terms.annual_rate(), irr * dec!(12) * dec!(100));
        assert!((terms.annual_rate() - dec!(8.9606)).abs() < dec!(0.001));
    }

    #[test]
    fn test_zero_interest_loan_is_valid() {
        let terms = LoanTerms::new(dec!(1200), 12, Some(Decimal::ZERO), None).unwrap();
        assert_eq!(terms.total_interest(), Decimal::ZERO);
        assert_eq!(terms.interest_rate(), Decimal::ZERO);
        assert_eq!(terms.per_period_payment(), dec!(100));
        assert!(terms.periodic_irr() < dec!(0.000000001));
    }

    #[test]
    fn test_rejects_both_interest_values() {
        let err = LoanTerms::new(dec!(10000), 12, Some(dec!(50)), Some(dec!(600))).unwrap_err();
        assert!(matches!(err, LoanMetricsError::InvalidInput { ref field, .. } if field == "interest"));

        let err = LoanTerms::new(dec!(10000), 12, Some(dec!(0)), Some(dec!(0))).unwrap_err();
        assert!(matches!(err, LoanMetricsError::InvalidInput { .. }));
    }

    #[test]
    fn test_rejects_missing_interest() {
        let err = LoanTerms::new(dec!(10000), 12, None, None).unwrap_err();
        assert_eq!(
            err,
            LoanMetricsError::InvalidInput {
                field: "interest".into(),
                reason: "Per-period interest or total interest is required".into(),
            }
        );
    }

    #[test]
    fn test_rejects_non_positive_principal_and_periods() {
        let err = LoanTerms::new(dec!(0), 12, Some(dec!(50)), None).unwrap_err();
        assert!(matches!(err, LoanMetricsError::InvalidInput { ref field, .. } if field == "principal"));

        let err = LoanTerms::new(dec!(-10), 12, Some(dec!(50)), None).unwrap_err();
        assert!(matches!(err, LoanMetricsError::InvalidInput { ref field, .. } if field == "principal"));

        let err = LoanTerms::new(dec!(10000), 0, Some(dec!(50)), None).unwrap_err();
        assert!(matches!(err, LoanMetricsError::InvalidInput { ref field, .. } if field == "periods"));
    }

    #[test]
    fn test_rejects_negative_interest() {
        let err = LoanTerms::new(dec!(10000), 12, Some(dec!(-1)), None).unwrap_err();
        assert!(matches!(err, LoanMetricsError::InvalidInput { ref field, .. } if field == "per_period_interest"));

        let err = LoanTerms::new(dec!(10000), 12, None, Some(dec!(-1))).unwrap_err();
        assert!(matches!(err, LoanMetricsError::InvalidInput { ref field, .. } if field == "total_interest"));
    }

    #[test]
    fn test_queries_are_idempotent() {
        let terms = LoanTerms::new(dec!(7500), 18, None, Some(dec!(910))).unwrap();
        assert_eq!(terms.interest_rate(), terms.interest_rate());
        assert_eq!(terms.per_period_payment(), terms.per_period_payment());
        assert_eq!(terms.periodic_irr(), terms.periodic_irr());
        assert_eq!(terms.annual_rate(), terms.annual_rate());
        assert_eq!(terms.irr_solution(), terms.irr_solution());
    }

    #[test]
    fn test_analyze_loan_envelope() {
        let input = LoanTermsInput {
            principal: dec!(10000),
            periods: 12,
            per_period_interest: Some(dec!(50)),
            total_interest: None,
        };
        let output = analyze_loan(&input).unwrap();
        assert_eq!(output.result.total_interest, dec!(600));
        assert_eq!(output.result.interest_rate, dec!(6));
        assert!(output.result.irr_converged);
        assert!(output.warnings.is_empty());
        assert!(output.assumptions["interest_source"] == "per_period_interest");
        assert_eq!(output.metadata.precision, "rust_decimal_128bit");
    }

    #[test]
    fn test_analyze_loan_zero_interest_warning() {
        let input = LoanTermsInput {
            principal: dec!(1000),
            periods: 10,
            per_period_interest: None,
            total_interest: Some(Decimal::ZERO),
        };
        let output = analyze_loan(&input).unwrap();
        assert_eq!(output.warnings.len(), 1, "{:?}", output.warnings);
        assert!(output.warnings[0].starts_with("Zero-interest loan"));

        let input = LoanTermsInput {
            principal: dec!(10000000),
            periods: 360,
            per_period_interest: Some(Decimal::ZERO),
            total_interest: None,
        };
        let output = analyze_loan(&input).unwrap();
        assert_eq!(output.warnings.len(), 1, "{:?}", output.warnings);
        assert_eq!(output.result.periodic_irr, Decimal::ZERO);
    }

    #[test]
    fn test_analyze_loan_rejects_invalid() {
        let input = LoanTermsInput {
            principal: dec!(1000),
            periods: 10,
            per_period_interest: None,
            total_interest: None,
        };
        assert!(analyze_loan(&input).is_err());
    }

    #[test]
    fn test_input_deserializes_with_missing_interest_field() {
        let input: LoanTermsInput = serde_json::from_str(
            r#"{"principal": "5000", "periods": 6, "total_interest": "180"}"#,
        )
        .unwrap();
        assert_eq!(input.per_period_interest, None);
        assert_eq!(input.total_interest, Some(dec!(180)));
    }

    #[test]
    fn test_solve_irr_degenerate_warns() {
        let output = solve_irr(&IrrInput {
            principal: dec!(1000),
            payment: dec!(0),
            periods: 12,
        });
        assert_eq!(output.result.rate, Decimal::ZERO);
        assert_eq!(output.warnings.len(), 1);
    }

    #[test]
    fn test_solve_irr_clamp_warns() {
        let output = solve_irr(&IrrInput {
            principal: dec!(1000),
            payment: dec!(90),
            periods: 10,
        });
        assert_eq!(output.result.rate, Decimal::ZERO);
        assert!(output.warnings.iter().any(|w| w.contains("floored to zero")));
    }

    #[test]
    fn test_solve_irr_non_convergence_is_reported_not_raised() {
        let output = solve_irr(&IrrInput {
            principal: dec!(1000000),
            payment: dec!(1),
            periods: 360,
        });
        assert!(!output.result.converged);
        assert_eq!(output.result.termination, IrrTermination::NonFinite);
        assert_eq!(output.result.rate, Decimal::ZERO);
        assert_eq!(
            output.warnings,
            vec![
                "IRR did not converge (NonFinite) after 2 iterations; last estimate reported"
                    .to_string(),
                "Negative IRR root -0.99 floored to zero".to_string(),
            ]
        );
    }
}
