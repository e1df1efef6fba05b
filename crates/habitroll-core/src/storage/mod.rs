mod config;
pub mod database;
pub mod migrations;

pub use config::{Config, EngineConfig, StorageConfig};
pub use database::Database;

use std::path::PathBuf;

use crate::error::{ConfigError, Result};

/// Returns `~/.config/habitroll[-dev]/` based on HABITROLL_ENV.
///
/// Set HABITROLL_ENV=dev to use development data directory.
/// HABITROLL_HOME, when set, replaces the directory entirely.
///
/// # Errors
/// Returns an error if the home directory cannot be determined or if
/// creating the directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os("HABITROLL_HOME") {
        Some(home) => PathBuf::from(home),
        None => {
            let base_dir = dirs::home_dir()
                .ok_or(ConfigError::NoDataDir)?
                .join(".config");
            let env = std::env::var("HABITROLL_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("habitroll-dev")
            } else {
                base_dir.join("habitroll")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
