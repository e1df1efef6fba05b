//! TOML-based application configuration.
//!
//! Stores:
//! - Engine tuning (streak rate, calendar-day offset, optional RNG seed)
//! - Storage location override
//!
//! Configuration is stored at `~/.config/habitroll/config.toml`.

use std::path::{Path, PathBuf};

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::engine::{EngineSettings, DEFAULT_STREAK_RATE};
use crate::error::{ConfigError, Result};

const MAX_OFFSET_MINUTES: i32 = 18 * 60;

/// Engine tuning, read once at process start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Bonus per streak day: weight grows by `streak * streak_rate`.
    #[serde(default = "default_streak_rate")]
    pub streak_rate: f64,
    /// Offset from UTC, in minutes, that defines a calendar day.
    #[serde(default)]
    pub utc_offset_minutes: i32,
    /// Fixed RNG seed; draws are entropy-seeded when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Database file; defaults to `<data_dir>/habitroll.db`.
    #[serde(default)]
    pub database: Option<PathBuf>,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/habitroll/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

fn default_streak_rate() -> f64 {
    DEFAULT_STREAK_RATE
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            streak_rate: default_streak_rate(),
            utc_offset_minutes: 0,
            seed: None,
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;

            let new_value = match existing {
                serde_json::Value::Bool(_) => serde_json::Value::Bool(
                    value
                        .parse::<bool>()
                        .map_err(|e| invalid(e.to_string()))?,
                ),
                serde_json::Value::Number(_) => parse_number(value).map_err(invalid)?,
                // Unset optionals: numbers stay numbers, anything else is a string.
                serde_json::Value::Null => parse_number(value)
                    .unwrap_or_else(|_| serde_json::Value::String(value.into())),
                serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                    serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                }
                serde_json::Value::String(_) => serde_json::Value::String(value.into()),
            };

            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    /// Default location of the config file.
    pub fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults on first run.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        Self::load_from(Self::path()?)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
            .into()),
        }
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<()> {
        self.save_to(Self::path()?)
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a value by dot-separated key, in memory only.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not parse
    /// or fails validation. `self` is unchanged on error.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config =
            serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let rate = self.engine.streak_rate;
        if !rate.is_finite() || rate < 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "engine.streak_rate".to_string(),
                message: format!("{rate} must be a finite, non-negative number"),
            });
        }
        if self.engine.utc_offset_minutes.abs() > MAX_OFFSET_MINUTES {
            return Err(ConfigError::InvalidValue {
                key: "engine.utc_offset_minutes".to_string(),
                message: format!(
                    "{} is outside +/-{MAX_OFFSET_MINUTES}",
                    self.engine.utc_offset_minutes
                ),
            });
        }
        Ok(())
    }

    /// Immutable engine snapshot for one run.
    pub fn engine_settings(&self) -> Result<EngineSettings, ConfigError> {
        self.validate()?;
        let utc_offset = FixedOffset::east_opt(self.engine.utc_offset_minutes * 60).ok_or_else(
            || ConfigError::InvalidValue {
                key: "engine.utc_offset_minutes".to_string(),
                message: "offset out of range".to_string(),
            },
        )?;
        Ok(EngineSettings {
            streak_rate: self.engine.streak_rate,
            utc_offset,
            seed: self.engine.seed,
        })
    }

    /// Database path, honoring the storage override.
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.storage.database {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join("habitroll.db")),
        }
    }
}

fn parse_number(value: &str) -> Result<serde_json::Value, String> {
    if value.eq_ignore_ascii_case("none") || value.is_empty() {
        return Ok(serde_json::Value::Null);
    }
    if let Ok(n) = value.parse::<i64>() {
        return Ok(serde_json::Value::Number(n.into()));
    }
    if let Ok(n) = value.parse::<u64>() {
        return Ok(serde_json::Value::Number(n.into()));
    }
    value
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(serde_json::Value::Number)
        .ok_or_else(|| format!("cannot parse '{value}' as number"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
        assert_eq!(parsed.engine.streak_rate, 0.1);
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let parsed: Config = toml::from_str("[engine]\nstreak_rate = 0.25\n").unwrap();
        assert_eq!(parsed.engine.streak_rate, 0.25);
        assert_eq!(parsed.engine.utc_offset_minutes, 0);
        assert!(parsed.storage.database.is_none());
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("engine.streak_rate").as_deref(), Some("0.1"));
        assert_eq!(cfg.get("engine.seed").as_deref(), Some("null"));
        assert!(cfg.get("engine.missing_key").is_none());
    }

    #[test]
    fn set_updates_numbers_and_optional_seed() {
        let mut cfg = Config::default();
        cfg.set("engine.streak_rate", "0.2").unwrap();
        cfg.set("engine.seed", "42").unwrap();
        cfg.set("engine.utc_offset_minutes", "-300").unwrap();
        assert_eq!(cfg.engine.streak_rate, 0.2);
        assert_eq!(cfg.engine.seed, Some(42));
        assert_eq!(cfg.engine.utc_offset_minutes, -300);

        cfg.set("engine.seed", "none").unwrap();
        assert_eq!(cfg.engine.seed, None);
    }

    #[test]
    fn set_and_clear_database_override() {
        let mut cfg = Config::default();
        cfg.set("storage.database", "/tmp/other.db").unwrap();
        assert_eq!(cfg.storage.database, Some(PathBuf::from("/tmp/other.db")));
        assert_eq!(cfg.database_path().unwrap(), PathBuf::from("/tmp/other.db"));
        assert_eq!(cfg.get("storage.database").as_deref(), Some("/tmp/other.db"));

        cfg.set("storage.database", "none").unwrap();
        assert!(cfg.storage.database.is_none());
    }

    #[test]
    fn unset_seed_rejects_non_numbers() {
        let mut cfg = Config::default();
        assert!(cfg.set("engine.seed", "lucky").is_err());
        assert_eq!(cfg.engine.seed, None);
    }

    #[test]
    fn set_rejects_unknown_key_and_bad_values() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set("engine.nonexistent", "1"),
            Err(crate::CoreError::Config(ConfigError::UnknownKey(_)))
        ));
        assert!(cfg.set("engine.streak_rate", "fast").is_err());
        assert!(cfg.set("engine.streak_rate", "-1").is_err());
        assert!(cfg.set("engine.utc_offset_minutes", "5000").is_err());
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn engine_settings_use_offset() {
        let mut cfg = Config::default();
        cfg.engine.utc_offset_minutes = 120;
        let settings = cfg.engine_settings().unwrap();
        assert_eq!(settings.utc_offset.local_minus_utc(), 7200);
        assert_eq!(settings.streak_rate, 0.1);
    }

    #[test]
    fn load_from_writes_defaults_then_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(cfg, Config::default());

        std::fs::write(&path, "[engine]\nstreak_rate = 0.5\nseed = 7\n").unwrap();
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.engine.streak_rate, 0.5);
        assert_eq!(cfg.engine.seed, Some(7));
    }

    #[test]
    fn load_from_rejects_invalid_rate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[engine]\nstreak_rate = -0.5\n").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
