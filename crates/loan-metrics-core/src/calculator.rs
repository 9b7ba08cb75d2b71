use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::{Money, Percent, Rate};

const IRR_INITIAL_GUESS: Rate = dec!(0.01);
const CONVERGENCE_TOLERANCE: Decimal = dec!(0.000001);
const FLAT_DERIVATIVE_THRESHOLD: Decimal = dec!(0.0000000001);
const MAX_IRR_ITERATIONS: u32 = 100;
const DIVERGENCE_FLOOR: Rate = dec!(-0.999);
const DIVERGENCE_RESET: Rate = dec!(-0.99);
const PERIODS_PER_YEAR: Decimal = dec!(12);
const HUNDRED: Decimal = dec!(100);

/// Why the IRR iteration stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IrrTermination {
    /// Non-positive principal, payment or period count; no iteration ran.
    Degenerate,
    /// Successive estimates moved by less than the tolerance.
    Converged,
    /// The NPV slope was too flat to take a Newton step.
    FlatDerivative,
    /// Discounting left the representable Decimal range.
    NonFinite,
    /// The iteration cap was reached.
    IterationCap,
}

/// Result of the periodic IRR root-finder, with diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrrSolution {
    /// Reported rate: the final estimate floored at zero
    pub rate: Rate,
    /// Final estimate before the zero floor
    pub raw_rate: Rate,
    pub iterations: u32,
    pub converged: bool,
    pub termination: IrrTermination,
}

impl IrrSolution {
    fn degenerate() -> Self {
        IrrSolution {
            rate: Decimal::ZERO,
            raw_rate: Decimal::ZERO,
            iterations: 0,
            converged: false,
            termination: IrrTermination::Degenerate,
        }
    }

    /// True when a negative root was floored to zero. Estimates within the
    /// convergence tolerance of zero count as zero.
    pub fn was_clamped(&self) -> bool {
        self.raw_rate < -CONVERGENCE_TOLERANCE
    }
}

/// Total interest over the life of the loan
pub fn total_interest(per_period_interest: Money, periods: u32) -> Money {
    per_period_interest
        .checked_mul(Decimal::from(periods))
        .unwrap_or(Decimal::ZERO)
}

/// Simple interest rate as a percentage of principal.
///
/// Returns zero when `principal` is not positive.
pub fn interest_rate(total_interest: Money, principal: Money) -> Percent {
    if principal <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    total_interest
        .checked_div(principal)
        .and_then(|ratio| ratio.checked_mul(HUNDRED))
        .unwrap_or(Decimal::ZERO)
}

/// Equal blended payment of principal plus interest per period.
///
/// Returns zero when `periods` is zero.
pub fn per_period_payment(principal: Money, total_interest: Money, periods: u32) -> Money {
    if periods == 0 {
        return Decimal::ZERO;
    }
    principal
        .checked_add(total_interest)
        .and_then(|repaid| repaid.checked_div(Decimal::from(periods)))
        .unwrap_or(Decimal::ZERO)
}

/// Net present value of `periods` equal payments discounted at `rate`, less
/// the principal.
///
/// `None` stands for an unbounded value: the rate is at or below -100%, or the
/// discount factors leave Decimal range.
pub fn annuity_npv(principal: Money, payment: Money, periods: u32, rate: Rate) -> Option<Money> {
    npv_with_slope(principal, payment, periods, rate).map(|(npv, _)| npv)
}

fn npv_with_slope(
    principal: Money,
    payment: Money,
    periods: u32,
    rate: Rate,
) -> Option<(Money, Decimal)> {
    if rate <= dec!(-1) {
        return None;
    }

    let one_plus_r = Decimal::ONE.checked_add(rate)?;
    let v = Decimal::ONE.checked_div(one_plus_r)?;
    let mut discount = Decimal::ONE;
    let mut npv = -principal;
    let mut slope = Decimal::ZERO;

    for i in 1..=periods {
        let next = discount.checked_mul(v)?;
        // Past Decimal resolution the remaining terms no longer move the sums
        if next.is_zero() || (v < Decimal::ONE && next == discount) {
            break;
        }
        discount = next;
        let present = payment.checked_mul(discount)?;
        npv = npv.checked_add(present)?;
        // d/dr of payment * v^i is -i * payment * v^(i+1)
        let term = Decimal::from(i).checked_mul(present)?.checked_mul(v)?;
        slope = slope.checked_sub(term)?;
    }

    Some((npv, slope))
}

/// Per-period internal rate of return of a loan repaid in equal payments,
/// found by Newton-Raphson from a 1% starting guess.
///
/// The iteration is capped; a non-converged estimate is returned as-is and
/// flagged in the solution rather than reported as an error. Negative roots
/// are floored at zero.
pub fn solve_periodic_irr(principal: Money, payment: Money, periods: u32) -> IrrSolution {
    if principal <= Decimal::ZERO || payment <= Decimal::ZERO || periods == 0 {
        return IrrSolution::degenerate();
    }

    let mut rate = IRR_INITIAL_GUESS;
    let mut iterations = 0;
    let mut termination = IrrTermination::IterationCap;

    for i in 0..MAX_IRR_ITERATIONS {
        iterations = i + 1;

        let Some((npv, slope)) = npv_with_slope(principal, payment, periods, rate) else {
            termination = IrrTermination::NonFinite;
            break;
        };

        if slope.abs() < FLAT_DERIVATIVE_THRESHOLD {
            termination = IrrTermination::FlatDerivative;
            break;
        }

        let Some(next) = npv.checked_div(slope).and_then(|step| rate.checked_sub(step)) else {
            termination = IrrTermination::NonFinite;
            break;
        };

        let settled = next
            .checked_sub(rate)
            .is_some_and(|delta| delta.abs() < CONVERGENCE_TOLERANCE);
        if settled {
            rate = next;
            termination = IrrTermination::Converged;
            break;
        }

        rate = next;
        if rate < DIVERGENCE_FLOOR {
            rate = DIVERGENCE_RESET;
        }
    }

    let converged = termination == IrrTermination::Converged;
    if !converged {
        tracing::debug!(
            %principal,
            %payment,
            periods,
            %rate,
            iterations,
            ?termination,
            "periodic IRR did not converge; returning last estimate"
        );
    }

    IrrSolution {
        rate: rate.max(Decimal::ZERO),
        raw_rate: rate,
        iterations,
        converged,
        termination,
    }
}

/// Per-period IRR without diagnostics. See [`solve_periodic_irr`].
pub fn periodic_irr(principal: Money, payment: Money, periods: u32) -> Rate {
    solve_periodic_irr(principal, payment, periods).rate
}

/// Simple (non-compounding) annualisation of a monthly rate, as a percentage.
pub fn annual_rate(periodic_irr: Rate) -> Percent {
    periodic_irr
        .saturating_mul(PERIODS_PER_YEAR)
        .saturating_mul(HUNDRED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_total_interest() {
        assert_eq!(total_interest(dec!(50), 12), dec!(600));
        assert_eq!(total_interest(dec!(0), 12), dec!(0));
    }

    #[test]
    fn test_interest_rate_basic() {
        assert_eq!(interest_rate(dec!(600), dec!(10000)), dec!(6));
        assert_eq!(interest_rate(dec!(180), dec!(5000)), dec!(3.6));
    }

    #[test]
    fn test_interest_rate_non_positive_principal() {
        for total in [dec!(0), dec!(600), dec!(-25), dec!(1000000)] {
            assert_eq!(interest_rate(total, dec!(0)), Decimal::ZERO);
            assert_eq!(interest_rate(total, dec!(-100)), Decimal::ZERO);
        }
    }

    #[test]
    fn test_per_period_payment() {
        let pmt = per_period_payment(dec!(10000), dec!(600), 12);
        assert!((pmt - dec!(883.3333333)).abs() < dec!(0.0000001));
        let pmt = per_period_payment(dec!(5000), dec!(180), 6);
        assert!((pmt * dec!(6) - dec!(5180)).abs() < dec!(0.000000001));
        assert_eq!(per_period_payment(dec!(1200), dec!(0), 12), dec!(100));
    }

    #[test]
    fn test_per_period_payment_zero_periods() {
        assert_eq!(per_period_payment(dec!(10000), dec!(600), 0), Decimal::ZERO);
    }

    #[test]
    fn test_npv_zero_rate() {
        // Undiscounted: 12 * 100 - 1000
        let npv = annuity_npv(dec!(1000), dec!(100), 12, Decimal::ZERO).unwrap();
        assert_eq!(npv, dec!(200));
    }

    #[test]
    fn test_npv_undefined_at_minus_one() {
        assert!(annuity_npv(dec!(1000), dec!(100), 12, dec!(-1)).is_none());
        assert!(annuity_npv(dec!(1000), dec!(100), 12, dec!(-1.5)).is_none());
    }

    #[test]
    fn test_irr_scenario_a() {
        let pmt = per_period_payment(dec!(10000), dec!(600), 12);
        let solution = solve_periodic_irr(dec!(10000), pmt, 12);
        assert!(solution.converged);
        assert_eq!(solution.termination, IrrTermination::Converged);
        assert!((solution.rate - dec!(0.0090803)).abs() < dec!(0.000001));
        assert!(solution.iterations <= 5);
    }

    #[test]
    fn test_irr_scenario_b() {
        let pmt = per_period_payment(dec!(5000), dec!(180), 6);
        let rate = periodic_irr(dec!(5000), pmt, 6);
        assert!((rate - dec!(0.0101995)).abs() < dec!(0.000001));
    }

    #[test]
    fn test_irr_is_a_root() {
        let solution = solve_periodic_irr(dec!(1000), dec!(500), 3);
        assert!(solution.converged);
        assert!((solution.rate - dec!(0.2337519)).abs() < dec!(0.000001));
        let npv = annuity_npv(dec!(1000), dec!(500), 3, solution.rate).unwrap();
        assert!(npv.abs() < dec!(0.001));
    }

    #[test]
    fn test_irr_single_period() {
        let rate = periodic_irr(dec!(1000), dec!(1100), 1);
        assert!((rate - dec!(0.1)).abs() < dec!(0.000001));
    }

    #[test]
    fn test_irr_degenerate_inputs_return_zero() {
        let cases = [
            (dec!(0), dec!(100), 12),
            (dec!(-1000), dec!(100), 12),
            (dec!(1000), dec!(0), 12),
            (dec!(1000), dec!(-5), 12),
            (dec!(1000), dec!(100), 0),
        ];
        for (principal, payment, periods) in cases {
            let solution = solve_periodic_irr(principal, payment, periods);
            assert_eq!(solution.rate, Decimal::ZERO);
            assert_eq!(solution.iterations, 0);
            assert_eq!(solution.termination, IrrTermination::Degenerate);
        }
    }

    #[test]
    fn test_irr_negative_root_clamped() {
        // Repaying 900 on 1000 borrowed has a negative root near -1.87%
        let solution = solve_periodic_irr(dec!(1000), dec!(90), 10);
        assert!(solution.converged);
        assert_eq!(solution.rate, Decimal::ZERO);
        assert!(solution.raw_rate < dec!(-0.018));
        assert!(solution.was_clamped());
    }

    #[test]
    fn test_irr_zero_interest_loan() {
        let solution = solve_periodic_irr(dec!(1000), dec!(100), 10);
        assert!(solution.rate >= Decimal::ZERO);
        assert!(solution.rate < dec!(0.000000001));
        assert!(!solution.was_clamped(), "raw rate {}", solution.raw_rate);

        let payment = per_period_payment(dec!(10000000), Decimal::ZERO, 360);
        let solution = solve_periodic_irr(dec!(10000000), payment, 360);
        assert!(!solution.was_clamped(), "raw rate {}", solution.raw_rate);
    }

    #[test]
    fn test_irr_overflow_returns_last_estimate() {
        // First Newton step overshoots below -99.9%; discounting at -99% overflows
        for (principal, payment, periods) in [
            (dec!(1000000), dec!(1), 360),
            (dec!(1000), dec!(1), 30),
        ] {
            let solution = solve_periodic_irr(principal, payment, periods);
            assert!(!solution.converged);
            assert_eq!(solution.termination, IrrTermination::NonFinite);
            assert_eq!(solution.iterations, 2);
            assert_eq!(solution.raw_rate, dec!(-0.99));
            assert_eq!(solution.rate, Decimal::ZERO);
            assert!(solution.was_clamped());
        }
    }

    #[test]
    fn test_npv_underflowed_tail_is_ignored() {
        // At 900% per period the discount factor is 10^-i and vanishes after 28 periods
        let short = annuity_npv(dec!(1000), dec!(1000), 40, dec!(9)).unwrap();
        let long = annuity_npv(dec!(1000), dec!(1000), 4_000_000_000, dec!(9)).unwrap();
        assert_eq!(short, long);
        assert!((short - dec!(-888.8888889)).abs() < dec!(0.000001));

        // Factors that stall at the smallest Decimal step stop the sum as well
        let stalled = annuity_npv(dec!(1000), dec!(10), 4_000_000_000, dec!(0.01)).unwrap();
        assert!((stalled - dec!(0)).abs() < dec!(0.000001));
    }

    #[test]
    fn test_irr_never_negative() {
        let cases = [
            (dec!(100), dec!(1000000), 360),
            (dec!(1000000), dec!(1), 360),
            (dec!(10000000), dec!(77777.78), 360),
            (dec!(0.01), dec!(0.01), 1),
            (dec!(250), dec!(30), 9),
        ];
        for (principal, payment, periods) in cases {
            let solution = solve_periodic_irr(principal, payment, periods);
            assert!(solution.rate >= Decimal::ZERO, "{principal} {payment} {periods}");
            assert!(solution.iterations <= MAX_IRR_ITERATIONS);
        }
    }

    #[test]
    fn test_annual_rate_identity() {
        let irr = periodic_irr(dec!(10000), per_period_payment(dec!(10000), dec!(600), 12), 12);
        assert_eq!(annual_rate(irr), irr * dec!(12) * dec!(100));
        assert!((annual_rate(irr) - irr * dec!(1200)).abs() < dec!(0.000000000001));
        assert_eq!(annual_rate(dec!(0.01)), dec!(12));
    }
}
