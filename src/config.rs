//! Configuration management module.

use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::import::{DEFAULT_MAX_FILE_SIZE, ImportOptions};

/// Hard ceiling for the upload limit, regardless of configuration.
const MAX_FILE_SIZE_CEILING: usize = 64 * 1024 * 1024;

/// Configuration load result.
#[derive(Debug)]
pub enum ConfigLoadResult {
    /// Config loaded successfully.
    Loaded(AppConfig),
    /// Config file missing (first run).
    Missing,
    /// Config file exists but invalid.
    Invalid(ConfigError),
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {0}")]
    Validation(String),
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub import: ImportConfig,
    pub logging: LoggingConfig,
}

/// Database connection settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub username: String,
    pub password: String,
    /// Full connection URL; overrides the individual fields when set
    /// (e.g. `sqlite://hrms.db?mode=rwc`).
    pub url: Option<String>,
    pub max_connections: u32,
}

/// Batch import settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Identifier stamped into created_by/updated_by for CLI imports.
    pub actor: String,
    /// Upload limit in bytes.
    pub max_file_size: usize,
    pub link_existing_managers: bool,
    /// CSV used by `seed` when no file is given on the command line.
    pub seed_file: Option<PathBuf>,
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence.
    pub level: String,
    /// Directory for daily rolling log files. Console only when unset.
    pub directory: Option<PathBuf>,
}

impl AppConfig {
    /// Get config file path in the platform config directory.
    pub fn default_path() -> PathBuf {
        ProjectDirs::from("com", "Gianged", "hrms")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
            .join("config.toml")
    }

    /// Attempt to load config with detailed result.
    pub fn try_load(path: &Path) -> ConfigLoadResult {
        if !path.exists() {
            return ConfigLoadResult::Missing;
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str::<AppConfig>(&content) {
                Ok(config) => match config.validate() {
                    Ok(()) => ConfigLoadResult::Loaded(config),
                    Err(e) => ConfigLoadResult::Invalid(e),
                },
                Err(e) => ConfigLoadResult::Invalid(ConfigError::Parse(e)),
            },
            Err(e) => ConfigLoadResult::Invalid(ConfigError::Read(e)),
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.is_none() {
            if self.database.host.trim().is_empty() {
                return Err(ConfigError::Validation("Database host cannot be empty".to_string()));
            }
            if self.database.port == 0 {
                return Err(ConfigError::Validation(
                    "Database port must be greater than 0".to_string(),
                ));
            }
            if self.database.name.trim().is_empty() {
                return Err(ConfigError::Validation("Database name cannot be empty".to_string()));
            }
        } else if self.database.url.as_deref().is_some_and(|u| u.trim().is_empty()) {
            return Err(ConfigError::Validation("Database URL cannot be empty".to_string()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Validation(
                "Max connections must be at least 1".to_string(),
            ));
        }
        if self.import.actor.trim().is_empty() {
            return Err(ConfigError::Validation("Import actor cannot be empty".to_string()));
        }
        if self.import.max_file_size == 0 {
            return Err(ConfigError::Validation(
                "Max file size must be greater than 0".to_string(),
            ));
        }
        if self.import.max_file_size > MAX_FILE_SIZE_CEILING {
            return Err(ConfigError::Validation(format!(
                "Max file size cannot exceed {MAX_FILE_SIZE_CEILING} bytes"
            )));
        }
        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::Validation("Log level cannot be empty".to_string()));
        }
        Ok(())
    }

}

impl DatabaseConfig {
    /// Build connection string for SeaORM.
    pub fn connection_string(&self) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => format!(
                "postgres://{}:{}@{}:{}/{}",
                self.username, self.password, self.host, self.port, self.name
            ),
        }
    }
}

impl ImportConfig {
    /// Importer switches derived from this section.
    pub fn options(&self) -> ImportOptions {
        ImportOptions {
            link_existing_managers: self.link_existing_managers,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            name: "hrms".to_string(),
            username: "postgres".to_string(),
            password: String::new(),
            url: None,
            max_connections: 5,
        }
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            actor: "system".to_string(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            link_existing_managers: false,
            seed_file: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}
