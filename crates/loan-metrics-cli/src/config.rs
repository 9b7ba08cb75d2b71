use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::OutputFormat;

const DEFAULT_BOOK: &str = "loans.csv";
const DEFAULT_PRECISION: u32 = 2;
const MAX_PRECISION: u32 = 10;

/// User settings read from `config.toml`. Every key is optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Output format when `--output` is not given
    pub output: OutputFormat,
    /// Book file used when `--file` is not given
    pub book: PathBuf,
    /// Decimal places for money and rate cells in book listings
    pub precision: u32,
    /// Where these settings were read from, if anywhere
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            output: OutputFormat::default(),
            book: PathBuf::from(DEFAULT_BOOK),
            precision: DEFAULT_PRECISION,
            source: None,
        }
    }
}

impl Settings {
    /// Load from an explicit path, which must exist, or from the default
    /// location, which may be absent.
    pub fn load(explicit: Option<&Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let path = match explicit {
            Some(p) => {
                if !p.is_file() {
                    return Err(format!("Config file not found: {}", p.display()).into());
                }
                p.to_path_buf()
            }
            None => match default_path() {
                Some(p) if p.is_file() => p,
                _ => {
                    tracing::debug!("no config file found; using defaults");
                    return Ok(Settings::default());
                }
            },
        };

        let contents = fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read '{}': {}", path.display(), e))?;
        let mut settings = Self::from_toml(&contents)
            .map_err(|e| format!("Failed to parse '{}': {}", path.display(), e))?;
        settings.source = Some(path);
        tracing::debug!(?settings, "loaded settings");
        Ok(settings)
    }

    fn from_toml(contents: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let settings: Settings = toml::from_str(contents)?;
        if settings.precision > MAX_PRECISION {
            return Err(format!(
                "precision must be between 0 and {MAX_PRECISION}, got {}",
                settings.precision
            )
            .into());
        }
        Ok(settings)
    }
}

/// `<config dir>/loan-metrics/config.toml`
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir()
        .or_else(dirs::home_dir)
        .map(|dir| dir.join("loan-metrics").join("config.toml"))
}
