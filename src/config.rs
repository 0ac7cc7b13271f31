//! Output host configuration
//!
//! Loaded from a JSON file. Every field has a default so an empty object is
//! a valid configuration.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::observability::LogSettings;

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// File is not valid JSON for this schema
    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is out of range
    #[error("Invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Configuration file structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputHostConfig {
    /// Host identity (generated when absent)
    #[serde(default)]
    pub output_host_id: Option<Uuid>,

    /// How often ack levels are advanced and persisted (default 5s)
    #[serde(default = "default_ack_level_interval_ms")]
    pub ack_level_interval_ms: u64,

    /// Deadline for one metadata call (default 10s)
    #[serde(default = "default_metadata_timeout_ms")]
    pub metadata_timeout_ms: u64,

    /// Capacity of the ack/nack channels to the message cache
    #[serde(default = "default_ack_channel_capacity")]
    pub ack_channel_capacity: usize,

    /// Capacity of the consumed-notification channel
    #[serde(default = "default_consumed_channel_capacity")]
    pub consumed_channel_capacity: usize,

    /// Log filter directive
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Emit JSON log lines
    #[serde(default)]
    pub log_json: bool,
}

fn default_ack_level_interval_ms() -> u64 {
    5_000
}
fn default_metadata_timeout_ms() -> u64 {
    10_000
}
fn default_ack_channel_capacity() -> usize {
    1024
}
fn default_consumed_channel_capacity() -> usize {
    1
}
fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for OutputHostConfig {
    fn default() -> Self {
        Self {
            output_host_id: None,
            ack_level_interval_ms: default_ack_level_interval_ms(),
            metadata_timeout_ms: default_metadata_timeout_ms(),
            ack_channel_capacity: default_ack_channel_capacity(),
            consumed_channel_capacity: default_consumed_channel_capacity(),
            log_filter: default_log_filter(),
            log_json: false,
        }
    }
}

impl OutputHostConfig {
    /// Read and validate a config file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Parse and validate a config document.
    pub fn from_json(content: &str) -> ConfigResult<Self> {
        let config: OutputHostConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.ack_level_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "ack_level_interval_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.metadata_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "metadata_timeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.ack_channel_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "ack_channel_capacity",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.consumed_channel_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "consumed_channel_capacity",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Host id, generating one if the file did not set it.
    pub fn output_host_id(&self) -> Uuid {
        self.output_host_id.unwrap_or_else(Uuid::new_v4)
    }

    /// Settings handed to each ack manager.
    pub fn ack_manager(&self) -> AckManagerConfig {
        AckManagerConfig {
            ack_level_interval: Duration::from_millis(self.ack_level_interval_ms),
            metadata_timeout: Duration::from_millis(self.metadata_timeout_ms),
        }
    }

    pub fn log_settings(&self) -> LogSettings {
        LogSettings {
            filter: self.log_filter.clone(),
            json: self.log_json,
        }
    }
}

/// Per-manager timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckManagerConfig {
    /// Period of the ack-level scheduler
    pub ack_level_interval: Duration,
    /// Deadline for one `set_ack_offset` call
    pub metadata_timeout: Duration,
}

impl Default for AckManagerConfig {
    fn default() -> Self {
        OutputHostConfig::default().ack_manager()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_object_uses_defaults() {
        let config = OutputHostConfig::from_json("{}").unwrap();
        assert_eq!(config, OutputHostConfig::default());
        assert_eq!(config.ack_manager().ack_level_interval, Duration::from_secs(5));
        assert_eq!(config.ack_manager().metadata_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_overrides() {
        let config = OutputHostConfig::from_json(
            r#"{"ack_level_interval_ms": 250, "log_json": true, "log_filter": "debug"}"#,
        )
        .unwrap();
        assert_eq!(config.ack_manager().ack_level_interval, Duration::from_millis(250));
        assert!(config.log_settings().json);
        assert_eq!(config.log_settings().filter, "debug");
    }

    #[test]
    fn test_zero_interval_rejected() {
        let err = OutputHostConfig::from_json(r#"{"ack_level_interval_ms": 0}"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "ack_level_interval_ms",
                ..
            }
        ));
    }

    #[test]
    fn test_zero_consumed_capacity_rejected() {
        let err =
            OutputHostConfig::from_json(r#"{"consumed_channel_capacity": 0}"#).unwrap_err();
        assert!(err.to_string().contains("consumed_channel_capacity"));
    }

    #[test]
    fn test_malformed_json_rejected() {
        let err = OutputHostConfig::from_json("{not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let id = Uuid::new_v4();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"output_host_id": "{}"}}"#, id).unwrap();

        let config = OutputHostConfig::load(file.path()).unwrap();
        assert_eq!(config.output_host_id(), id);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = OutputHostConfig::load(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
