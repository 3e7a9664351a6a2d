//! Engine configuration
//!
//! All fields have defaults, so an empty JSON object is a valid config.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hierarchy::DEFAULT_MAX_DEPTH;
use crate::ledger::DEFAULT_EVENT_LOG_CAPACITY;

/// Errors that can occur while loading configuration
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Config parse error: {0}")]
    Parse(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

/// Configuration for the commission engine
///
/// # Example
/// ```
/// use commission_engine_core_rs::EngineConfig;
///
/// let config = EngineConfig::from_json_str(r#"{ "max_hierarchy_depth": 8 }"#).unwrap();
/// assert_eq!(config.max_hierarchy_depth, 8);
/// assert_eq!(config.commit_conflict_retries, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of brokers a hierarchy walk may visit before the
    /// tree is considered corrupt
    pub max_hierarchy_depth: usize,

    /// How many times a commit re-reads and retries after losing a
    /// uniqueness race to a concurrent commit for the same payment
    pub commit_conflict_retries: usize,

    /// Inactive brokers earn nothing, but their ancestors are still walked
    pub skip_inactive_brokers: bool,

    /// Ledger events kept in memory; the oldest are evicted past this
    pub event_log_capacity: usize,

    /// `tracing` filter directive, e.g. "info" or "commission_engine_core_rs=debug"
    pub log_level: String,

    pub log_format: LogFormat,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_hierarchy_depth: DEFAULT_MAX_DEPTH,
            commit_conflict_retries: 1,
            skip_inactive_brokers: true,
            event_log_capacity: DEFAULT_EVENT_LOG_CAPACITY,
            log_level: "info".to_string(),
            log_format: LogFormat::Compact,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON config document
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_hierarchy_depth == 0 {
            return Err(ConfigError::Invalid(
                "max_hierarchy_depth must be at least 1".to_string(),
            ));
        }
        if self.event_log_capacity == 0 {
            return Err(ConfigError::Invalid(
                "event_log_capacity must be at least 1".to_string(),
            ));
        }
        if self.log_level.trim().is_empty() {
            return Err(ConfigError::Invalid("log_level must not be empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_uses_defaults() {
        let config = EngineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.max_hierarchy_depth, 32);
    }

    #[test]
    fn test_json_log_format() {
        let config = EngineConfig::from_json_str(r#"{ "log_format": "json" }"#).unwrap();
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_zero_depth_rejected() {
        let err = EngineConfig::from_json_str(r#"{ "max_hierarchy_depth": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_zero_event_log_capacity_rejected() {
        let err = EngineConfig::from_json_str(r#"{ "event_log_capacity": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let err = EngineConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
