//! Logging configuration
//!
//! Console output plus optional rolling JSON log files.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;
use std::str::FromStr;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const LOG_FILE_PREFIX: &str = "kubegate.log";

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or filter directive (trace, debug, info, warn, error)
    pub level: String,
    /// Directory for log files
    pub log_dir: PathBuf,
    /// Write rolling log files in addition to the console
    pub file_logging_enabled: bool,
    /// JSON console output
    pub json_format: bool,
    pub rotation: LogRotation,
}

/// Log rotation policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    Hourly,
    Daily,
    Never,
}

impl FromStr for LogRotation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hourly" => Ok(Self::Hourly),
            "daily" => Ok(Self::Daily),
            "never" => Ok(Self::Never),
            other => Err(format!("unknown log rotation '{}'", other)),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: PathBuf::from("/var/log/kubegate"),
            file_logging_enabled: false,
            json_format: false,
            rotation: LogRotation::Daily,
        }
    }
}

impl LoggingConfig {
    /// Install the global subscriber
    ///
    /// `RUST_LOG` takes precedence over `level`. Keep the returned guard alive
    /// for as long as file logs should be flushed.
    pub fn init(&self) -> anyhow::Result<Option<WorkerGuard>> {
        let env_filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::try_new(&self.level)
                .with_context(|| format!("invalid log level '{}'", self.level))?,
        };

        let console_layer = if self.json_format {
            fmt::layer()
                .json()
                .with_target(true)
                .with_writer(io::stdout)
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(false)
                .with_ansi(true)
                .with_writer(io::stdout)
                .boxed()
        };

        let (file_layer, guard) = if self.file_logging_enabled {
            std::fs::create_dir_all(&self.log_dir).with_context(|| {
                format!("failed to create log directory {}", self.log_dir.display())
            })?;

            let file_appender = match self.rotation {
                LogRotation::Hourly => rolling::hourly(&self.log_dir, LOG_FILE_PREFIX),
                LogRotation::Daily => rolling::daily(&self.log_dir, LOG_FILE_PREFIX),
                LogRotation::Never => rolling::never(&self.log_dir, LOG_FILE_PREFIX),
            };

            let (writer, guard) = non_blocking(file_appender);

            let file_layer = fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true)
                .with_ansi(false)
                .json()
                .with_writer(writer);

            (Some(file_layer), Some(guard))
        } else {
            (None, None)
        };

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .try_init()
            .context("a global tracing subscriber is already installed")?;

        tracing::info!(
            level = %self.level,
            file_logging = self.file_logging_enabled,
            "Logging initialized"
        );

        Ok(guard)
    }
}
