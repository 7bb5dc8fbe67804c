//! # Engine Configuration
//!
//! Runtime settings for the launch surface. Values come from, in increasing
//! precedence: built-in defaults, an optional configuration file (any format
//! the `config` crate recognises by extension) and `BATCH_*` environment
//! variables.
//!
//! ```text
//! BATCH_ENVIRONMENT=production
//! BATCH_LOG_LEVEL=info
//! BATCH_JSON_LOGS=true
//! BATCH_MAX_CONCURRENT_JOBS=4
//! ```

use crate::error::ConfigurationError;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const ENV_PREFIX: &str = "BATCH";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Deployment environment, used to pick a default log level
    pub environment: String,
    /// Explicit log filter; overrides the environment default
    pub log_level: Option<String>,
    /// Emit JSON log lines instead of human-readable ones
    pub json_logs: bool,
    /// Jobs a [`JobOperator`](crate::launch::JobOperator) runs at once
    pub max_concurrent_jobs: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            log_level: None,
            json_logs: false,
            max_concurrent_jobs: 4,
        }
    }
}

impl BatchConfig {
    /// Defaults overridden by `BATCH_*` environment variables
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::load(None::<&Path>)
    }

    /// Defaults, then `path` if given, then `BATCH_*` environment variables
    pub fn load(path: Option<impl AsRef<Path>>) -> Result<Self, ConfigurationError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path.as_ref()).required(true));
        }
        builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true));

        let config: Self = builder
            .build()
            .and_then(Config::try_deserialize)
            .map_err(|e| ConfigurationError::Invalid(format!("Failed to load configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file only, ignoring the process environment
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let config: Self = Config::builder()
            .add_source(File::from(path.as_ref()).required(true))
            .build()
            .and_then(Config::try_deserialize)
            .map_err(|e| ConfigurationError::Invalid(format!("Failed to load configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.max_concurrent_jobs == 0 {
            return Err(ConfigurationError::Invalid(
                "max_concurrent_jobs must be at least 1".to_string(),
            ));
        }
        if self.environment.trim().is_empty() {
            return Err(ConfigurationError::Invalid(
                "environment must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// The log filter to install: the explicit level, or a default for the environment
    pub fn effective_log_level(&self) -> String {
        match &self.log_level {
            Some(level) if !level.trim().is_empty() => level.to_lowercase(),
            _ => match self.environment.as_str() {
                "production" => "info".to_string(),
                "test" => "warn".to_string(),
                _ => "debug".to_string(),
            },
        }
    }
}
