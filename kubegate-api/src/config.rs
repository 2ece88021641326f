//! Configuration management for the gateway
//!
//! Settings are layered:
//! 1. Environment variables (`KUBEGATE_*`, highest priority)
//! 2. Configuration file (TOML format)
//! 3. Default values (lowest priority)

use crate::logging::{LogRotation, LoggingConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Cluster client cache
    pub registry: RegistryConfig,
    /// Per-request limits
    pub requests: RequestsConfig,
    /// Batch fan-out
    pub batch: BatchConfig,
    /// List paging
    pub query: QueryConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Cluster client construction and caching
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// TCP connect timeout for new clients
    pub connect_timeout_secs: u64,
    /// Read timeout for every API call
    pub read_timeout_secs: u64,
    /// Cached clients unused for this long are dropped by the reaper
    pub idle_timeout_secs: u64,
    /// Check the API server answers before caching a new client
    pub verify_on_connect: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestsConfig {
    /// Deadline for one caller request, 0 for none
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Targets worked on at once
    pub max_concurrency: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Page size when the caller gives none
    pub default_page_size: usize,
    /// Upper bound on any requested page size
    pub max_page_size: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
            read_timeout_secs: 30,
            idle_timeout_secs: 1800,
            verify_on_connect: true,
        }
    }
}

impl Default for RequestsConfig {
    fn default() -> Self {
        Self { timeout_secs: 60 }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { max_concurrency: 8 }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_page_size: kubegate_common::DEFAULT_PAGE_SIZE,
            max_page_size: 500,
        }
    }
}

impl GatewayConfig {
    /// Load configuration from the first config file found, then environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::find_config_file() {
            Some(path) => Self::load_from_file(&path)?,
            None => Self::default(),
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file path
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_path_buf(), e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let paths = [
            // Environment variable override
            std::env::var("KUBEGATE_CONFIG").ok().map(PathBuf::from),
            // Standard locations
            Some(PathBuf::from("/etc/kubegate/config.toml")),
            Some(PathBuf::from("./kubegate.toml")),
        ];

        paths.into_iter().flatten().find(|p| p.exists())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        let parsed = |key: &str| var(key).and_then(|v| v.trim().parse().ok());

        // Registry
        if let Some(secs) = parsed("KUBEGATE_CONNECT_TIMEOUT_SECS") {
            self.registry.connect_timeout_secs = secs;
        }
        if let Some(secs) = parsed("KUBEGATE_READ_TIMEOUT_SECS") {
            self.registry.read_timeout_secs = secs;
        }
        if let Some(secs) = parsed("KUBEGATE_IDLE_TIMEOUT_SECS") {
            self.registry.idle_timeout_secs = secs;
        }
        if let Some(verify) = var("KUBEGATE_VERIFY_ON_CONNECT") {
            self.registry.verify_on_connect = verify.parse().unwrap_or(true);
        }

        // Requests
        if let Some(secs) = parsed("KUBEGATE_REQUEST_TIMEOUT_SECS") {
            self.requests.timeout_secs = secs;
        }

        // Batch
        if let Some(max) = var("KUBEGATE_BATCH_MAX_CONCURRENCY").and_then(|v| v.parse().ok()) {
            self.batch.max_concurrency = max;
        }

        // Query
        if let Some(size) = var("KUBEGATE_DEFAULT_PAGE_SIZE").and_then(|v| v.parse().ok()) {
            self.query.default_page_size = size;
        }
        if let Some(size) = var("KUBEGATE_MAX_PAGE_SIZE").and_then(|v| v.parse().ok()) {
            self.query.max_page_size = size;
        }

        // Logging
        if let Some(level) = var("KUBEGATE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(path) = var("KUBEGATE_LOG_DIR") {
            self.logging.log_dir = PathBuf::from(path);
        }
        if let Some(enabled) = var("KUBEGATE_FILE_LOGGING") {
            self.logging.file_logging_enabled = enabled.parse().unwrap_or(true);
        }
        if let Some(json) = var("KUBEGATE_LOG_JSON") {
            self.logging.json_format = json.parse().unwrap_or(false);
        }
        if let Some(rotation) = var("KUBEGATE_LOG_ROTATION") {
            if let Ok(rotation) = rotation.parse::<LogRotation>() {
                self.logging.rotation = rotation;
            }
        }
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.registry.connect_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "registry.connect_timeout_secs cannot be 0".to_string(),
            ));
        }

        if self.registry.read_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "registry.read_timeout_secs cannot be 0".to_string(),
            ));
        }

        if self.batch.max_concurrency == 0 {
            return Err(ConfigError::Validation(
                "batch.max_concurrency must be at least 1".to_string(),
            ));
        }

        if self.query.default_page_size == 0 || self.query.max_page_size == 0 {
            return Err(ConfigError::Validation(
                "query page sizes must be at least 1".to_string(),
            ));
        }

        if self.query.default_page_size > self.query.max_page_size {
            return Err(ConfigError::Validation(format!(
                "query.default_page_size ({}) exceeds query.max_page_size ({})",
                self.query.default_page_size, self.query.max_page_size
            )));
        }

        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::Validation(
                "logging.level cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("Failed to read config file {0:?}: {1}")]
    FileRead(PathBuf, String),
    /// Failed to parse configuration
    #[error("Failed to parse config: {0}")]
    Parse(String),
    /// Configuration validation failed
    #[error("Config validation failed: {0}")]
    Validation(String),
}
