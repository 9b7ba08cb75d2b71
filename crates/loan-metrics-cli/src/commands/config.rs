use clap::{Args, Subcommand};
use serde_json::{json, Value};

use crate::config::{self, Settings};

/// Arguments for the config command
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the effective settings
    Show,
    /// Show where settings are read from
    Path,
}

pub fn run_config(args: ConfigArgs, settings: &Settings) -> Result<Value, Box<dyn std::error::Error>> {
    match args.command {
        ConfigCommand::Show => Ok(json!({
            "output": settings.output,
            "book": settings.book.display().to_string(),
            "precision": settings.precision,
            "source": settings
                .source
                .as_ref()
                .map(|p| p.display().to_string()),
        })),
        ConfigCommand::Path => {
            let path = settings.source.clone().or_else(config::default_path);
            let path = path.ok_or("Could not determine config directory")?;
            Ok(json!({
                "path": path.display().to_string(),
                "exists": path.is_file(),
            }))
        }
    }
}
