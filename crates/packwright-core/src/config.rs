//! Pipeline configuration.
//!
//! Everything the pipeline needs to know about the outside world is carried
//! in one explicit [`PipelineConfig`] passed to the pipeline constructor.
//! Values come from an optional TOML file, then `PACKWRIGHT_*` environment
//! variables override individual fields.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::VersionPolicy;

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid value for {var}: {value}")]
    InvalidEnv { var: &'static str, value: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Blob keys for every record the pipeline reads or publishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreKeys {
    pub snapshot: String,
    pub version: String,
    pub changelog: String,
    pub artifact: String,
    pub metadata: String,
}

impl Default for StoreKeys {
    fn default() -> Self {
        Self {
            snapshot: "resource-pack/build-history.json".to_string(),
            version: "version.json".to_string(),
            changelog: "resource-pack/change.txt".to_string(),
            artifact: "resource-pack/@latest.zip".to_string(),
            metadata: "resource-pack/temp/metadatastructure.json".to_string(),
        }
    }
}

/// Notification sink settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Webhook URL; notifications are disabled when unset
    pub webhook_url: Option<String>,
    /// Maximum paths per message
    pub chunk_size: usize,
    /// Pause after each message, in milliseconds
    pub rate_limit_delay_ms: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            chunk_size: 15,
            rate_limit_delay_ms: 500,
        }
    }
}

impl NotifyConfig {
    pub fn rate_limit_delay(&self) -> Duration {
        Duration::from_millis(self.rate_limit_delay_ms)
    }
}

/// Full pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Source archive (zip) URL
    pub archive_source_url: String,
    /// Pack metadata JSON URL
    pub metadata_source_url: String,
    /// Change-magnitude thresholds
    pub version_policy: VersionPolicy,
    pub notify: NotifyConfig,
    /// Budget for each network call, in seconds
    pub fetch_timeout_secs: u64,
    /// Append a unique query parameter to source fetches
    pub cache_bust: bool,
    pub keys: StoreKeys,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            archive_source_url: String::new(),
            metadata_source_url: String::new(),
            version_policy: VersionPolicy::default(),
            notify: NotifyConfig::default(),
            fetch_timeout_secs: 30,
            cache_bust: true,
            keys: StoreKeys::default(),
        }
    }
}

fn parse_env<T: std::str::FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnv { var, value })
}

impl PipelineConfig {
    /// Create a config for the given sources with default settings.
    pub fn new(archive_source_url: impl Into<String>, metadata_source_url: impl Into<String>) -> Self {
        Self {
            archive_source_url: archive_source_url.into(),
            metadata_source_url: metadata_source_url.into(),
            ..Self::default()
        }
    }

    /// Load from an optional TOML file, apply environment overrides, validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_toml_str(&std::fs::read_to_string(path)?)?,
            None => Self::default(),
        };
        config.apply_env(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document. Missing fields take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Override fields from environment-style variables.
    ///
    /// Reads:
    /// - PACKWRIGHT_ARCHIVE_URL, PACKWRIGHT_METADATA_URL
    /// - PACKWRIGHT_PATCH_THRESHOLD, PACKWRIGHT_MINOR_THRESHOLD
    /// - PACKWRIGHT_NOTIFY_WEBHOOK, PACKWRIGHT_NOTIFY_CHUNK_SIZE, PACKWRIGHT_NOTIFY_DELAY_MS
    /// - PACKWRIGHT_FETCH_TIMEOUT_SECS, PACKWRIGHT_CACHE_BUST
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("PACKWRIGHT_ARCHIVE_URL") {
            self.archive_source_url = v;
        }
        if let Some(v) = lookup("PACKWRIGHT_METADATA_URL") {
            self.metadata_source_url = v;
        }
        if let Some(v) = lookup("PACKWRIGHT_PATCH_THRESHOLD") {
            self.version_policy.patch_threshold = parse_env("PACKWRIGHT_PATCH_THRESHOLD", v)?;
        }
        if let Some(v) = lookup("PACKWRIGHT_MINOR_THRESHOLD") {
            self.version_policy.minor_threshold = parse_env("PACKWRIGHT_MINOR_THRESHOLD", v)?;
        }
        if let Some(v) = lookup("PACKWRIGHT_NOTIFY_WEBHOOK") {
            self.notify.webhook_url = Some(v).filter(|url| !url.is_empty());
        }
        if let Some(v) = lookup("PACKWRIGHT_NOTIFY_CHUNK_SIZE") {
            self.notify.chunk_size = parse_env("PACKWRIGHT_NOTIFY_CHUNK_SIZE", v)?;
        }
        if let Some(v) = lookup("PACKWRIGHT_NOTIFY_DELAY_MS") {
            self.notify.rate_limit_delay_ms = parse_env("PACKWRIGHT_NOTIFY_DELAY_MS", v)?;
        }
        if let Some(v) = lookup("PACKWRIGHT_FETCH_TIMEOUT_SECS") {
            self.fetch_timeout_secs = parse_env("PACKWRIGHT_FETCH_TIMEOUT_SECS", v)?;
        }
        if let Some(v) = lookup("PACKWRIGHT_CACHE_BUST") {
            self.cache_bust = parse_env("PACKWRIGHT_CACHE_BUST", v)?;
        }
        Ok(())
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.archive_source_url.trim().is_empty() {
            return Err(ConfigError::Invalid("archive_source_url is empty".to_string()));
        }
        if self.metadata_source_url.trim().is_empty() {
            return Err(ConfigError::Invalid("metadata_source_url is empty".to_string()));
        }
        if self.version_policy.minor_threshold < self.version_policy.patch_threshold {
            return Err(ConfigError::Invalid(format!(
                "minor_threshold ({}) must be >= patch_threshold ({})",
                self.version_policy.minor_threshold, self.version_policy.patch_threshold
            )));
        }
        if self.notify.chunk_size == 0 {
            return Err(ConfigError::Invalid("notify.chunk_size must be > 0".to_string()));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(ConfigError::Invalid("fetch_timeout_secs must be > 0".to_string()));
        }
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_reference_behavior() {
        let config = PipelineConfig::default();
        assert_eq!(config.version_policy.patch_threshold, 15);
        assert_eq!(config.version_policy.minor_threshold, 25);
        assert_eq!(config.notify.chunk_size, 15);
        assert_eq!(config.notify.rate_limit_delay(), Duration::from_millis(500));
        assert_eq!(config.keys.version, "version.json");
        assert!(config.cache_bust);
    }

    #[test]
    fn toml_partial_document_keeps_defaults() {
        let config = PipelineConfig::from_toml_str(
            r#"
            archive_source_url = "https://example.com/pack.zip"
            metadata_source_url = "https://example.com/config.json"

            [version_policy]
            patch_threshold = 10

            [keys]
            artifact = "packs/latest.zip"
            "#,
        )
        .unwrap();
        assert_eq!(config.version_policy.patch_threshold, 10);
        assert_eq!(config.version_policy.minor_threshold, 25);
        assert_eq!(config.keys.artifact, "packs/latest.zip");
        assert_eq!(config.keys.snapshot, "resource-pack/build-history.json");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn env_overrides_fields() {
        let mut config = PipelineConfig::new("https://a", "https://b");
        config
            .apply_env(env(&[
                ("PACKWRIGHT_ARCHIVE_URL", "https://override/pack.zip"),
                ("PACKWRIGHT_MINOR_THRESHOLD", "40"),
                ("PACKWRIGHT_NOTIFY_WEBHOOK", "https://hooks.example.com/x"),
                ("PACKWRIGHT_NOTIFY_DELAY_MS", "0"),
                ("PACKWRIGHT_CACHE_BUST", "false"),
            ]))
            .unwrap();
        assert_eq!(config.archive_source_url, "https://override/pack.zip");
        assert_eq!(config.version_policy.minor_threshold, 40);
        assert_eq!(
            config.notify.webhook_url.as_deref(),
            Some("https://hooks.example.com/x")
        );
        assert_eq!(config.notify.rate_limit_delay_ms, 0);
        assert!(!config.cache_bust);
    }

    #[test]
    fn env_rejects_non_numeric_threshold() {
        let mut config = PipelineConfig::new("https://a", "https://b");
        let err = config
            .apply_env(env(&[("PACKWRIGHT_PATCH_THRESHOLD", "lots")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidEnv {
                var: "PACKWRIGHT_PATCH_THRESHOLD",
                ..
            }
        ));
    }

    #[test]
    fn validate_rejects_bad_values() {
        assert!(PipelineConfig::default().validate().is_err());

        let mut config = PipelineConfig::new("https://a", "https://b");
        config.version_policy = VersionPolicy {
            patch_threshold: 20,
            minor_threshold: 10,
        };
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::new("https://a", "https://b");
        config.notify.chunk_size = 0;
        assert!(config.validate().is_err());
    }
}
