//! Configuration loading, validation, and management for ContextKeeper.
//!
//! Loads configuration from `~/.contextkeeper/config.toml` with environment
//! variable overrides. Validates all settings at startup; the context
//! manager validates again when it is constructed from a hand-built config.

use contextkeeper_core::Trigger;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Engine configuration: scoring, provider deadlines and cache limits.
///
/// Maps directly to `~/.contextkeeper/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Trigger used when a gather request does not name one
    #[serde(default)]
    pub default_trigger: Trigger,

    /// Half-life of the recency decay applied to fragment scores
    #[serde(default = "default_recency_half_life_ms")]
    pub recency_half_life_ms: u64,

    /// Deadline for a single provider's `gather` call
    #[serde(default = "default_provider_timeout_ms")]
    pub provider_timeout_ms: u64,

    /// Trigger affinity for providers that did not declare the current trigger
    #[serde(default = "default_affinity")]
    pub default_affinity: f64,

    /// Characters per estimated token
    #[serde(default = "default_chars_per_token")]
    pub chars_per_token: usize,

    /// Cache configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Per-provider weight overrides in `[0, 1]` (provider name → weight)
    #[serde(default)]
    pub provider_weights: HashMap<String, f64>,
}

fn default_recency_half_life_ms() -> u64 {
    60_000
}
fn default_provider_timeout_ms() -> u64 {
    100
}
fn default_affinity() -> f64 {
    0.5
}
fn default_chars_per_token() -> usize {
    4
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// How long a gather result may be served from the cache
    #[serde(default = "default_ttl_ms")]
    pub ttl_ms: u64,

    /// Soft ceiling on the total size of cached results
    #[serde(default = "default_max_size_mb")]
    pub max_size_mb: f64,

    /// Interval for proactively dropping expired entries. Unset = lazy only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sweep_interval_ms: Option<u64>,
}

fn default_ttl_ms() -> u64 {
    30_000
}
fn default_max_size_mb() -> f64 {
    10.0
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_ms: default_ttl_ms(),
            max_size_mb: default_max_size_mb(),
            sweep_interval_ms: None,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    /// The memory ceiling in bytes.
    pub fn max_size_bytes(&self) -> u64 {
        (self.max_size_mb * 1024.0 * 1024.0) as u64
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        self.sweep_interval_ms.map(Duration::from_millis)
    }
}

impl ContextConfig {
    /// Load configuration from the default path (~/.contextkeeper/config.toml).
    ///
    /// Environment variables override file values:
    /// - `CONTEXTKEEPER_CACHE_TTL_MS`
    /// - `CONTEXTKEEPER_MAX_SIZE_MB`
    /// - `CONTEXTKEEPER_PROVIDER_TIMEOUT_MS`
    /// - `CONTEXTKEEPER_DEFAULT_TRIGGER`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, falling back to defaults when the file does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "No config file; using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    ///
    /// Takes the lookup as a function so callers (and tests) decide where
    /// variables come from.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("CONTEXTKEEPER_CACHE_TTL_MS") {
            self.cache.ttl_ms = parse_env("CONTEXTKEEPER_CACHE_TTL_MS", &value)?;
        }
        if let Some(value) = lookup("CONTEXTKEEPER_MAX_SIZE_MB") {
            self.cache.max_size_mb = parse_env("CONTEXTKEEPER_MAX_SIZE_MB", &value)?;
        }
        if let Some(value) = lookup("CONTEXTKEEPER_PROVIDER_TIMEOUT_MS") {
            self.provider_timeout_ms = parse_env("CONTEXTKEEPER_PROVIDER_TIMEOUT_MS", &value)?;
        }
        if let Some(value) = lookup("CONTEXTKEEPER_DEFAULT_TRIGGER") {
            self.default_trigger = Trigger::from(value);
        }
        Ok(())
    }

    /// `~/.contextkeeper`, where `config.toml` lives.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".contextkeeper")
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.ttl_ms == 0 {
            return Err(ConfigError::ValidationError(
                "cache.ttl_ms must be > 0".into(),
            ));
        }

        if !self.cache.max_size_mb.is_finite() || self.cache.max_size_mb <= 0.0 {
            return Err(ConfigError::ValidationError(
                "cache.max_size_mb must be a positive number".into(),
            ));
        }

        if self.cache.sweep_interval_ms == Some(0) {
            return Err(ConfigError::ValidationError(
                "cache.sweep_interval_ms must be > 0 when set".into(),
            ));
        }

        if self.recency_half_life_ms == 0 {
            return Err(ConfigError::ValidationError(
                "recency_half_life_ms must be > 0".into(),
            ));
        }

        if self.provider_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "provider_timeout_ms must be > 0".into(),
            ));
        }

        if self.chars_per_token == 0 {
            return Err(ConfigError::ValidationError(
                "chars_per_token must be > 0".into(),
            ));
        }

        if !is_unit_interval(self.default_affinity) {
            return Err(ConfigError::ValidationError(
                "default_affinity must be between 0.0 and 1.0".into(),
            ));
        }

        if let Some((name, weight)) = self
            .provider_weights
            .iter()
            .find(|(_, w)| !is_unit_interval(**w))
        {
            return Err(ConfigError::ValidationError(format!(
                "provider_weights.{name} = {weight} must be between 0.0 and 1.0"
            )));
        }

        Ok(())
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }

    pub fn recency_half_life(&self) -> Duration {
        Duration::from_millis(self.recency_half_life_ms)
    }

    /// Generate a default config TOML string (for `config init`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            default_trigger: Trigger::default(),
            recency_half_life_ms: default_recency_half_life_ms(),
            provider_timeout_ms: default_provider_timeout_ms(),
            default_affinity: default_affinity(),
            chars_per_token: default_chars_per_token(),
            cache: CacheConfig::default(),
            provider_weights: HashMap::new(),
        }
    }
}

fn is_unit_interval(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}

fn parse_env<T>(var: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::EnvError {
        var: var.to_string(),
        reason: e.to_string(),
    })
}

/// Home directory, with a fallback when `HOME` is unset.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Invalid value in {var}: {reason}")]
    EnvError { var: String, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
