use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::constants::{
    CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH, DEFAULT_SCHEMA_CHECK_TIMEOUT_SECS,
    DEFAULT_URL_CHECK_CONCURRENCY, DEFAULT_URL_CHECK_TIMEOUT_SECS, DEFAULT_USER_AGENT,
};
use crate::error::{PipelineError, Result};
use crate::pipeline::processing::quality_gate::ValidatorConfig;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub validator: ValidatorConfig,
    pub url_check: UrlCheckConfig,
    pub schema_check: SchemaCheckConfig,
    pub logging: LoggingConfig,
}

/// Live HEAD checks of source URLs
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct UrlCheckConfig {
    pub enabled: bool,
    pub max_concurrency: usize,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for UrlCheckConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_concurrency: DEFAULT_URL_CHECK_CONCURRENCY,
            timeout_secs: DEFAULT_URL_CHECK_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl UrlCheckConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Advisory per-entity JSON Schema check
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SchemaCheckConfig {
    pub enabled: bool,
    /// Defaults to the bundled entity schema
    pub schema_path: Option<PathBuf>,
    pub timeout_secs: u64,
}

impl Default for SchemaCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            schema_path: None,
            timeout_secs: DEFAULT_SCHEMA_CHECK_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: "logs".to_string(),
        }
    }
}

impl Config {
    /// Load from `SACHSTAND_CONFIG`, falling back to `config.toml`.
    /// A missing file yields the defaults.
    pub fn load() -> Result<Self> {
        let _ = dotenv::dotenv();
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(path)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!("Config file '{}' not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.validator.validate()?;
        if self.url_check.max_concurrency == 0 {
            return Err(PipelineError::Config(
                "url_check.max_concurrency must be at least 1".to_string(),
            ));
        }
        if self.url_check.timeout_secs == 0 || self.schema_check.timeout_secs == 0 {
            return Err(PipelineError::Config("timeouts must be at least 1 second".to_string()));
        }
        Ok(())
    }
}
