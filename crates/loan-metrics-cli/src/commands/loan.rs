use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use loan_metrics_core::terms::{self, IrrInput, LoanTermsInput};

use crate::input;

/// Arguments for a single-loan analysis
#[derive(Args)]
pub struct AnalyzeArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Amount borrowed
    #[arg(long)]
    pub principal: Option<Decimal>,

    /// Number of equal repayment periods
    #[arg(long)]
    pub periods: Option<u32>,

    /// Interest charged each period (give this or --total-interest)
    #[arg(long)]
    pub per_period_interest: Option<Decimal>,

    /// Interest over the whole loan (give this or --per-period-interest)
    #[arg(long)]
    pub total_interest: Option<Decimal>,
}

pub fn run_analyze(args: AnalyzeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let loan_input: LoanTermsInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if args.principal.is_some() || args.periods.is_some() {
        let principal = args
            .principal
            .ok_or("--principal is required (or provide --input)")?;
        let periods = args
            .periods
            .ok_or("--periods is required (or provide --input)")?;

        LoanTermsInput {
            principal,
            periods,
            per_period_interest: args.per_period_interest,
            total_interest: args.total_interest,
        }
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--principal and --periods are required (or provide --input or stdin)".into());
    };

    let result = terms::analyze_loan(&loan_input)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for the raw IRR solver
#[derive(Args)]
pub struct IrrArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Amount borrowed
    #[arg(long)]
    pub principal: Option<Decimal>,

    /// Payment made each period
    #[arg(long)]
    pub payment: Option<Decimal>,

    /// Number of payments
    #[arg(long)]
    pub periods: Option<u32>,
}

pub fn run_irr(args: IrrArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let irr_input: IrrInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if args.principal.is_some() || args.payment.is_some() || args.periods.is_some() {
        IrrInput {
            principal: args
                .principal
                .ok_or("--principal is required (or provide --input)")?,
            payment: args
                .payment
                .ok_or("--payment is required (or provide --input)")?,
            periods: args
                .periods
                .ok_or("--periods is required (or provide --input)")?,
        }
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--principal, --payment and --periods are required (or provide --input or stdin)".into());
    };

    let result = terms::solve_irr(&irr_input);
    Ok(serde_json::to_value(result)?)
}
