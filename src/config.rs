//! Configuration file handling.
//!
//! Settings come from `territorio.toml` (or `--config FILE`) and are then
//! overridden by explicit CLI flags.

use crate::error::{Result, TerritoryError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "territorio.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub territory: TerritoryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub report: ReportConfig,
}

/// Table store settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file holding the `territorio` table.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("territorio.db")
}

/// Territory processor settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerritoryConfig {
    /// Street drilled into by `analyze` (exact, case-sensitive).
    #[serde(default = "default_focus_street")]
    pub focus_street: String,
}

impl Default for TerritoryConfig {
    fn default() -> Self {
        Self {
            focus_street: default_focus_street(),
        }
    }
}

fn default_focus_street() -> String {
    "AV MARTE".to_string()
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Directory for the dated log files.
    #[serde(default = "default_log_dir")]
    pub dir: PathBuf,

    /// Console filter when RUST_LOG is unset (the file always gets debug).
    #[serde(default = "default_console_level")]
    pub console_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            console_level: default_console_level(),
        }
    }
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_console_level() -> String {
    "info".to_string()
}

/// Report output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Default output format: table, json or csv.
    #[serde(default = "default_format")]
    pub format: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
        }
    }
}

fn default_format() -> String {
    "table".to_string()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| TerritoryError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Config = toml::from_str(&content).map_err(|source| TerritoryError::Config {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(config)
    }

    /// Load `--config FILE` if given, else `territorio.toml` when present,
    /// else defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::load(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Merge CLI overrides; only values the user actually passed win.
    pub fn merge_overrides(
        &mut self,
        db: Option<&Path>,
        log_dir: Option<&Path>,
        verbose: bool,
    ) {
        if let Some(db) = db {
            self.database.path = db.to_path_buf();
        }
        if let Some(dir) = log_dir {
            self.logging.dir = dir.to_path_buf();
        }
        if verbose {
            self.logging.console_level = "debug".to_string();
        }
    }

    /// Default configuration as commented TOML, for `init-config`.
    pub fn default_toml() -> String {
        let defaults = Self::default();
        format!(
            "# territorio configuration\n\
             # CLI flags override these values.\n\n\
             [database]\n\
             # SQLite file with the `territorio` table\n\
             path = \"{}\"\n\n\
             [territory]\n\
             # Street singled out by `analyze` (exact match)\n\
             focus_street = \"{}\"\n\n\
             [logging]\n\
             dir = \"{}\"\n\
             # Console level when RUST_LOG is unset\n\
             console_level = \"{}\"\n\n\
             [report]\n\
             # table, json or csv\n\
             format = \"{}\"\n",
            defaults.database.path.display(),
            defaults.territory.focus_street,
            defaults.logging.dir.display(),
            defaults.logging.console_level,
            defaults.report.format,
        )
    }
}
