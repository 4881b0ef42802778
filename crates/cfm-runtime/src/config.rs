//! Runtime settings.
//!
//! Settings are an explicit value passed to the service, never a global.
//! Durations are written in humantime form ("5m", "10s") in YAML.

use std::fs;
use std::path::Path;
use std::time::Duration;

use cfm_core::{LevelThresholds, ValidationOptions};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read settings file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Invalid setting: {0}")]
    Invalid(String),
}

/// Where the evaluator runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunnerKind {
    /// On the calling task
    InProcess,

    /// On a dedicated thread per call, with timeout and in-process fallback
    Worker,
}

/// Batch fan-out parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchOptions {
    /// Items dispatched together per window
    pub concurrency: usize,

    /// Windows between cooperative yields
    pub yield_interval: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            concurrency: 3,
            yield_interval: 10,
        }
    }
}

/// Settings for the compliance service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplianceSettings {
    /// Validate on content changes (see `ComplianceService::validate_on_change`)
    pub auto_validate: bool,

    pub strict_mode: bool,

    /// Freshness window for cached results; also the sweep period
    #[serde(with = "humantime_duration")]
    pub cache_timeout: Duration,

    /// Produce audit reports
    pub enable_reporting: bool,

    /// Hard deadline for a worker round trip
    #[serde(with = "humantime_duration")]
    pub worker_timeout: Duration,

    pub runner: RunnerKind,

    pub cache_max_entries: u64,

    /// Characters of content hashed into the cache key; `None` hashes everything.
    /// Documents sharing this prefix share a cache entry.
    pub key_prefix_chars: Option<usize>,

    /// Collapse concurrent misses for the same key into one evaluation
    pub dedupe_in_flight: bool,

    pub thresholds: LevelThresholds,

    pub batch: BatchOptions,
}

impl Default for ComplianceSettings {
    fn default() -> Self {
        Self {
            auto_validate: true,
            strict_mode: false,
            cache_timeout: Duration::from_secs(5 * 60),
            enable_reporting: true,
            worker_timeout: Duration::from_secs(10),
            runner: RunnerKind::Worker,
            cache_max_entries: 10_000,
            key_prefix_chars: Some(100),
            dedupe_in_flight: false,
            thresholds: LevelThresholds::default(),
            batch: BatchOptions::default(),
        }
    }
}

impl ComplianceSettings {
    /// Parse settings from YAML. Missing fields take their defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let settings: Self = serde_yaml::from_str(yaml)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_timeout.is_zero() {
            return Err(ConfigError::Invalid("cache_timeout must be positive".into()));
        }
        if self.worker_timeout.is_zero() {
            return Err(ConfigError::Invalid("worker_timeout must be positive".into()));
        }
        if self.cache_max_entries == 0 {
            return Err(ConfigError::Invalid("cache_max_entries must be positive".into()));
        }
        if self.key_prefix_chars == Some(0) {
            return Err(ConfigError::Invalid(
                "key_prefix_chars must be positive or omitted".into(),
            ));
        }
        let t = &self.thresholds;
        if !(t.excellent >= t.good && t.good >= t.acceptable) || t.excellent > 100 {
            return Err(ConfigError::Invalid(format!(
                "level thresholds must satisfy 100 >= excellent >= good >= acceptable, got {}/{}/{}",
                t.excellent, t.good, t.acceptable
            )));
        }
        if t.acceptable == 0 {
            return Err(ConfigError::Invalid("acceptable threshold must be positive".into()));
        }
        if t.pass == 0 || t.pass > t.strict_pass || t.strict_pass > 100 {
            return Err(ConfigError::Invalid(format!(
                "pass thresholds must satisfy 100 >= strict_pass >= pass > 0, got {}/{}",
                t.strict_pass, t.pass
            )));
        }
        Ok(())
    }

    /// Evaluation options implied by these settings.
    pub fn validation_options(&self) -> ValidationOptions {
        ValidationOptions {
            strict_mode: self.strict_mode,
            thresholds: self.thresholds,
        }
    }
}

mod humantime_duration {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(de::Error::custom)
    }
}
