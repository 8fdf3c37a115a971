//! Layered configuration: optional TOML file, then `DUELGATE__*` environment
//! overrides (e.g. `DUELGATE__AUTH__SIGNING__SECRET`).

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use duelgate_auth::AuthConfig;
use serde::Deserialize;

const DEFAULT_CONFIG_FILE: &str = "duelgate.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub auth: AuthConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    #[error("config load error: {0}")]
    Load(#[from] config::ConfigError),

    #[error(transparent)]
    Invalid(#[from] duelgate_auth::ConfigError),
}

/// Loads and validates configuration.
///
/// An explicit `path` must exist; without one `./duelgate.toml` is used if
/// present.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, SettingsError> {
    let mut builder = Config::builder();
    match path {
        Some(p) => {
            if !p.exists() {
                return Err(SettingsError::NotFound(p.to_path_buf()));
            }
            builder = builder.add_source(File::from(p.to_path_buf()));
        }
        None => {
            let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
            if default_path.exists() {
                builder = builder.add_source(File::from(default_path));
            }
        }
    }
    builder = builder.add_source(
        Environment::with_prefix("DUELGATE")
            .try_parsing(true)
            .separator("__"),
    );

    let merged: AppConfig = builder.build()?.try_deserialize()?;
    merged.auth.validate()?;
    Ok(merged)
}
