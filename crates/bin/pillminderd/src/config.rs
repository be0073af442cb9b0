//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `pillminder.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{FixedOffset, NaiveTime};
use serde::Deserialize;

use pillminder_app::reminder_worker::ReminderWindow;
use pillminder_app::work_scheduler::SchedulerConfig;
use pillminder_domain::evaluator::ScheduleEvaluator;
use pillminder_domain::schedule::{MealSlot, Timetable};

/// Largest UTC offset accepted, in minutes.
const MAX_OFFSET_MINUTES: i32 = 18 * 60;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database settings.
    pub database: DatabaseConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Background wake settings.
    pub scheduler: SchedulerSection,
    /// How local times of day are interpreted.
    pub schedule: ScheduleSection,
    /// Meal slot overrides, `slot = "HH:MM"`.
    pub timetable: BTreeMap<MealSlot, String>,
    /// Startup export.
    pub export: ExportConfig,
}

/// `SQLite` database configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL or file path.
    pub url: String,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Reminder wake timing.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SchedulerSection {
    pub interval_secs: u64,
    pub min_interval_secs: u64,
    pub lookback_secs: u64,
    pub lead_secs: u64,
    pub max_per_entry: usize,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ScheduleSection {
    /// Offset from UTC of the user's wall clock.
    pub utc_offset_minutes: i32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Directory that receives a text and an HTML export of the active
    /// medicines at startup. Disabled when unset.
    pub dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from `pillminder.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("pillminder.toml")?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(
        &mut self,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(val) = var("PILLMINDER_DATABASE_URL") {
            self.database.url = val;
        }
        if let Some(val) = var("PILLMINDER_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("PILLMINDER_INTERVAL_SECS") {
            self.scheduler.interval_secs = parse_env("PILLMINDER_INTERVAL_SECS", &val)?;
        }
        if let Some(val) = var("PILLMINDER_UTC_OFFSET_MINUTES") {
            self.schedule.utc_offset_minutes = parse_env("PILLMINDER_UTC_OFFSET_MINUTES", &val)?;
        }
        if let Some(val) = var("PILLMINDER_EXPORT_DIR") {
            self.export.dir = Some(PathBuf::from(val));
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.scheduler.interval_secs == 0 || self.scheduler.min_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "scheduler intervals must be non-zero".to_string(),
            ));
        }
        if self.scheduler.max_per_entry == 0 {
            return Err(ConfigError::Validation(
                "max_per_entry must be non-zero".to_string(),
            ));
        }
        if self.schedule.utc_offset_minutes.abs() > MAX_OFFSET_MINUTES {
            return Err(ConfigError::Validation(format!(
                "utc_offset_minutes must be within ±{MAX_OFFSET_MINUTES}"
            )));
        }
        self.timetable()?;
        Ok(())
    }

    /// Return the database URL in `sqlx`-compatible format.
    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database.url
    }

    #[must_use]
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            interval: Duration::from_secs(self.scheduler.interval_secs),
            min_interval: Duration::from_secs(self.scheduler.min_interval_secs),
        }
    }

    #[must_use]
    pub fn reminder_window(&self) -> ReminderWindow {
        ReminderWindow {
            lookback: Duration::from_secs(self.scheduler.lookback_secs),
            lead: Duration::from_secs(self.scheduler.lead_secs),
            max_per_entry: self.scheduler.max_per_entry,
        }
    }

    /// Build the evaluator for the configured offset and timetable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] on an out-of-range offset or a
    /// malformed timetable entry.
    pub fn evaluator(&self) -> Result<ScheduleEvaluator, ConfigError> {
        let offset = FixedOffset::east_opt(self.schedule.utc_offset_minutes * 60)
            .filter(|_| self.schedule.utc_offset_minutes.abs() <= MAX_OFFSET_MINUTES)
            .ok_or_else(|| {
                ConfigError::Validation(format!(
                    "invalid utc_offset_minutes {}",
                    self.schedule.utc_offset_minutes
                ))
            })?;
        Ok(ScheduleEvaluator::new(offset, self.timetable()?))
    }

    fn timetable(&self) -> Result<Timetable, ConfigError> {
        self.timetable
            .iter()
            .try_fold(Timetable::default(), |table, (slot, value)| {
                let time = NaiveTime::parse_from_str(value, "%H:%M").map_err(|_| {
                    ConfigError::Validation(format!(
                        "timetable.{slot:?} must be HH:MM, got `{value}`"
                    ))
                })?;
                Ok(table.with(*slot, time))
            })
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Validation(format!("{key} is not a valid number: `{value}`")))
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:pillminder.db?mode=rwc".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "pillminderd=info,pillminder_app=info,pillminder_adapter_storage_sqlite_sqlx=info,\
                     pillminder::reminder=info"
                .to_string(),
        }
    }
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            min_interval_secs: 15,
            lookback_secs: 15 * 60,
            lead_secs: 0,
            max_per_entry: 32,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
