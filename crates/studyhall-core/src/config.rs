//! StudyHall configuration system.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Root configuration. Every field has a default so a partial (or absent)
/// config file is always usable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyHallConfig {
    /// Seconds between sweep ticks of the scheduling engine.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
    /// Minutes before start at which the one-shot reminder fires.
    #[serde(default = "default_reminder_lead")]
    pub reminder_lead_minutes: i64,
    /// Inactivity window for each wizard step, in seconds.
    #[serde(default = "default_step_timeout")]
    pub wizard_step_timeout_secs: u64,
    /// How far into the future a class may be planned, in days.
    #[serde(default = "default_lookahead")]
    pub lookahead_days: i64,
    #[serde(default = "default_min_duration")]
    pub min_duration_minutes: i64,
    #[serde(default = "default_max_duration")]
    pub max_duration_hours: i64,
}

fn default_sweep_interval() -> u64 {
    30
}
fn default_reminder_lead() -> i64 {
    15
}
fn default_step_timeout() -> u64 {
    120
}
fn default_lookahead() -> i64 {
    60
}
fn default_min_duration() -> i64 {
    15
}
fn default_max_duration() -> i64 {
    12
}

impl Default for StudyHallConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: default_sweep_interval(),
            reminder_lead_minutes: default_reminder_lead(),
            wizard_step_timeout_secs: default_step_timeout(),
            lookahead_days: default_lookahead(),
            min_duration_minutes: default_min_duration(),
            max_duration_hours: default_max_duration(),
        }
    }
}

impl StudyHallConfig {
    /// Load config from the default path (~/.studyhall/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the StudyHall home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".studyhall")
    }

    pub fn reminder_lead(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.reminder_lead_minutes)
    }

    pub fn lookahead(&self) -> chrono::Duration {
        chrono::Duration::days(self.lookahead_days)
    }

    pub fn min_duration(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.min_duration_minutes)
    }

    pub fn max_duration(&self) -> chrono::Duration {
        chrono::Duration::hours(self.max_duration_hours)
    }

    pub fn step_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.wizard_step_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StudyHallConfig::default();
        assert_eq!(config.sweep_interval_secs, 30);
        assert_eq!(config.reminder_lead_minutes, 15);
        assert_eq!(config.wizard_step_timeout_secs, 120);
        assert_eq!(config.lookahead_days, 60);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: StudyHallConfig = toml::from_str("reminder_lead_minutes = 30").unwrap();
        assert_eq!(config.reminder_lead_minutes, 30);
        assert_eq!(config.sweep_interval_secs, 30);
        assert_eq!(config.max_duration_hours, 12);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = StudyHallConfig {
            lookahead_days: 14,
            ..Default::default()
        };
        let text = toml::to_string_pretty(&config).unwrap();
        let back: StudyHallConfig = toml::from_str(&text).unwrap();
        assert_eq!(back.lookahead_days, 14);
    }
}
