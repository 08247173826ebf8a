//! Recorder configuration
//!
//! Loaded from a camelCase JSON file; every field has a default so partial
//! files are fine.

use crate::capture::buffer::DEFAULT_CAPACITY;
use crate::capture::throttle::DEFAULT_UPDATE_INTERVAL;
use crate::provider::channel::ProviderOptions;
use crate::recorder::state::{DEFAULT_MAX_RECOVERY_ATTEMPTS, DEFAULT_RETRY_DELAY};
use crate::storage::store::{DEFAULT_DB_NAME, DEFAULT_DB_VERSION};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "GAZE_RECORDER_CONFIG";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecorderConfig {
    /// Maximum number of samples kept for the active session
    pub buffer_capacity: usize,
    /// Minimum spacing between accepted samples
    pub update_interval_ms: u64,
    pub max_recovery_attempts: u32,
    pub retry_delay_ms: u64,
    pub db_name: String,
    pub db_version: u32,
    /// Root directory of the session database
    pub storage_dir: PathBuf,
    /// Where CSV exports are written
    pub export_dir: PathBuf,
    pub provider: ProviderOptions,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_CAPACITY,
            update_interval_ms: DEFAULT_UPDATE_INTERVAL.as_millis() as u64,
            max_recovery_attempts: DEFAULT_MAX_RECOVERY_ATTEMPTS,
            retry_delay_ms: DEFAULT_RETRY_DELAY.as_millis() as u64,
            db_name: DEFAULT_DB_NAME.to_string(),
            db_version: DEFAULT_DB_VERSION,
            storage_dir: PathBuf::from("gaze-data"),
            export_dir: PathBuf::from("."),
            provider: ProviderOptions::default(),
        }
    }
}

impl RecorderConfig {
    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the file named by `GAZE_RECORDER_CONFIG`, or use defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_capacity == 0 {
            return Err(ConfigError::Invalid("bufferCapacity must be at least 1".to_string()));
        }
        if self.max_recovery_attempts == 0 {
            return Err(ConfigError::Invalid("maxRecoveryAttempts must be at least 1".to_string()));
        }
        if self.db_name.trim().is_empty() {
            return Err(ConfigError::Invalid("dbName must not be empty".to_string()));
        }
        if self.db_version == 0 {
            return Err(ConfigError::Invalid("dbVersion must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}
