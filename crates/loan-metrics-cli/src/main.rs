mod commands;
mod config;
mod input;
mod output;
mod store;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use commands::book::BookArgs;
use commands::config::ConfigArgs;
use commands::loan::{AnalyzeArgs, IrrArgs};
use config::Settings;

/// Compare loan offers by simple interest rate and IRR-based annual rate
#[derive(Parser)]
#[command(
    name = "loanm",
    version,
    about = "Compare loan offers by interest rate and IRR-based annual rate",
    long_about = "A CLI for comparing equal-payment loan offers. Derives total or per-period \
                  interest, the simple interest rate, the per-period payment and an annual \
                  rate from the Newton-Raphson IRR of the payment stream, and keeps a CSV \
                  book of named offers."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (defaults to the configured format)
    #[arg(long, global = true)]
    output: Option<OutputFormat>,

    /// Path to a TOML settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive interest figures and all comparison metrics for one loan
    Analyze(AnalyzeArgs),
    /// Solve the per-period IRR for explicit principal, payment and periods
    Irr(IrrArgs),
    /// Manage the CSV book of named loan offers
    Book(BookArgs),
    /// Inspect settings
    Config(ConfigArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("loanm=debug,loan_metrics_core=debug"))
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("loanm=warn,loan_metrics_core=warn"))
    };

    // stdout carries command output; logs go to stderr
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = match Settings::load(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    };
    let format = cli.output.unwrap_or(settings.output);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Analyze(args) => commands::loan::run_analyze(args),
        Commands::Irr(args) => commands::loan::run_irr(args),
        Commands::Book(args) => commands::book::run_book(args, &settings),
        Commands::Config(args) => commands::config::run_config(args, &settings),
        Commands::Version => {
            println!("loanm {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&format, &value);
            process::exit(0);
        }
        Err(e) => {
            tracing::debug!(error = %e, "command failed");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
