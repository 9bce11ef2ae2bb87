//! TOML-based application configuration.
//!
//! Stores the tunable constants of the conversion:
//! - Hourly wage and workday length
//! - Maximum accepted balance
//! - Calendar offset and day-key policy
//! - Whether an empty store is seeded with sample entries
//!
//! Configuration is stored at `~/.config/intime/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::calendar::{Calendar, DayKeyPolicy};
use crate::conversion::ConversionEngine;
use crate::error::{ConfigError, Result};

/// Wage used to convert money into working time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WageConfig {
    #[serde(default = "default_per_hour")]
    pub per_hour: f64,
    #[serde(default = "default_hours_per_day")]
    pub hours_per_day: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    /// Fixed offset from UTC, in hours, used for day keys and display.
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
    #[serde(default)]
    pub day_key: DayKeyPolicy,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/intime/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub wage: WageConfig,
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default = "default_max_amount")]
    pub max_amount: u64,
    /// Seed an empty or unreadable store with the sample entries.
    #[serde(default = "default_true")]
    pub seed_defaults: bool,
}

// Default functions
fn default_per_hour() -> f64 {
    10030.0
}
fn default_hours_per_day() -> f64 {
    8.0
}
fn default_utc_offset_hours() -> i32 {
    9
}
fn default_max_amount() -> u64 {
    1_000_000_000_000_000
}
fn default_true() -> bool {
    true
}

impl Default for WageConfig {
    fn default() -> Self {
        Self {
            per_hour: default_per_hour(),
            hours_per_day: default_hours_per_day(),
        }
    }
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            utc_offset_hours: default_utc_offset_hours(),
            day_key: DayKeyPolicy::default(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            wage: WageConfig::default(),
            calendar: CalendarConfig::default(),
            max_amount: default_max_amount(),
            seed_defaults: true,
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
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<i64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or create the default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed or is
    /// invalid, or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    /// # Errors
    ///
    /// See [`Config::load`].
    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(_) => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    /// # Errors
    ///
    /// See [`Config::save`].
    pub fn save_to(&self, path: &Path) -> Result<()> {
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

    /// Update a value by dot-separated key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value is unparseable
    /// or out of range. On error `self` is unchanged.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and save. Returns error if key is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.apply(key, value)?;
        self.save()
    }

    /// # Errors
    ///
    /// Returns the first out-of-range value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.wage.per_hour.is_finite() && self.wage.per_hour > 0.0) {
            return Err(ConfigError::InvalidValue {
                key: "wage.per_hour".into(),
                message: format!("{} must be a positive number", self.wage.per_hour),
            });
        }
        if !(self.wage.hours_per_day > 0.0 && self.wage.hours_per_day <= 24.0) {
            return Err(ConfigError::InvalidValue {
                key: "wage.hours_per_day".into(),
                message: format!("{} must be within (0, 24]", self.wage.hours_per_day),
            });
        }
        self.calendar()?;
        Ok(())
    }

    pub fn engine(&self) -> ConversionEngine {
        ConversionEngine::from_config(self)
    }

    /// # Errors
    ///
    /// Returns an error if the UTC offset is out of range.
    pub fn calendar(&self) -> Result<Calendar, ConfigError> {
        Calendar::new(self.calendar.utc_offset_hours, self.calendar.day_key)
    }
}
