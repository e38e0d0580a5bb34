//! # Application Configuration
//!
//! Settings loaded once at startup.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`VENTAS_*`)
//! 2. Config file (`config.toml`)
//! 3. Defaults (this file)
//!
//! ## Example `config.toml`
//! ```toml
//! database_path = "/var/lib/ventas/ventas.db"
//! max_connections = 5
//! tax_rate_bps = 1800
//! default_term_days = 30
//! internal_number_prefix = "VT-"
//! ```
//!
//! ## Thread Safety
//! Configuration is read-only after loading, so no lock is needed.

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use ventas_core::TaxRate;
use ventas_db::{CheckoutSettings, DbConfig};

/// Longest accepted internal number prefix.
const MAX_PREFIX_LEN: usize = 10;

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// SQLite database file.
    pub database_path: PathBuf,

    /// Connection pool size.
    pub max_connections: u32,

    /// Sales tax in basis points, e.g. 1800 = 18%.
    pub tax_rate_bps: u32,

    /// Credit term used when an account has none.
    pub default_term_days: i64,

    /// Prefix of internal sale numbers (`VT-00000001`).
    pub internal_number_prefix: String,
}

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_path: default_data_dir()
                .map(|dir| dir.join("ventas.db"))
                .unwrap_or_else(|| PathBuf::from("./ventas.db")),
            max_connections: 5,
            tax_rate_bps: 1800,
            default_term_days: 30,
            internal_number_prefix: "VT-".to_string(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from a file, the environment and defaults.
    ///
    /// With no explicit path the platform config directory is tried and a
    /// missing file there is not an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => AppConfig::default(),
            },
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a `config.toml`. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "Config file loaded");
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Applies `VENTAS_*` overrides read through `lookup`.
    ///
    /// ## Environment Variables
    /// - `VENTAS_DATABASE_PATH`
    /// - `VENTAS_MAX_CONNECTIONS`
    /// - `VENTAS_TAX_RATE_BPS`
    /// - `VENTAS_DEFAULT_TERM_DAYS`
    /// - `VENTAS_INTERNAL_NUMBER_PREFIX`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(path) = lookup("VENTAS_DATABASE_PATH") {
            self.database_path = PathBuf::from(path);
        }
        if let Some(value) = lookup("VENTAS_MAX_CONNECTIONS") {
            self.max_connections = parse("VENTAS_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = lookup("VENTAS_TAX_RATE_BPS") {
            self.tax_rate_bps = parse("VENTAS_TAX_RATE_BPS", &value)?;
        }
        if let Some(value) = lookup("VENTAS_DEFAULT_TERM_DAYS") {
            self.default_term_days = parse("VENTAS_DEFAULT_TERM_DAYS", &value)?;
        }
        if let Some(prefix) = lookup("VENTAS_INTERNAL_NUMBER_PREFIX") {
            self.internal_number_prefix = prefix;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database_path must not be empty".to_string()));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::Invalid("max_connections must be at least 1".to_string()));
        }
        if self.tax_rate_bps > 10_000 {
            return Err(ConfigError::Invalid("tax_rate_bps must be at most 10000".to_string()));
        }
        if self.default_term_days < 0 {
            return Err(ConfigError::Invalid("default_term_days must not be negative".to_string()));
        }
        let prefix = self.internal_number_prefix.trim();
        if prefix.is_empty() || prefix.len() > MAX_PREFIX_LEN {
            return Err(ConfigError::Invalid(format!(
                "internal_number_prefix must have 1 to {MAX_PREFIX_LEN} characters"
            )));
        }
        Ok(())
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path).max_connections(self.max_connections)
    }

    pub fn checkout_settings(&self) -> CheckoutSettings {
        CheckoutSettings {
            tax_rate: TaxRate::from_bps(self.tax_rate_bps),
            internal_number_prefix: self.internal_number_prefix.trim().to_string(),
            default_term_days: self.default_term_days,
        }
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "ventas", "ventas")
}

/// Platform data directory, e.g. `~/.local/share/ventas` on Linux.
pub fn default_data_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.data_dir().to_path_buf())
}

/// Platform config file, e.g. `~/.config/ventas/config.toml` on Linux.
pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
}
