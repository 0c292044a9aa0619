use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::Path;

/// Application configuration module
/// This module handles the engine and provider configuration including
/// loading, validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Source language name or code
    pub source_language: String,

    /// Target language name or code
    pub target_language: String,

    /// Session engine settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Provider settings
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// What to do when a batch exhausts its attempt budget
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Record the failure and continue with the next batch
    #[default]
    Skip,
    /// Stop the session and surface the failure to the caller
    AbortSession,
}

/// Scheduling model for a session
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConcurrencyMode {
    /// One batch in flight at a time, context threaded between batches
    #[default]
    Sequential,
    /// Batches dispatched to a bounded pool against a context snapshot.
    /// Trades continuity fidelity for throughput; never the silent default.
    PooledSnapshot {
        /// Maximum batches in flight at once
        pool_size: usize,
    },
}

/// Session engine configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EngineConfig {
    /// Maximum lines per batch
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// Maximum attempts per batch before it is marked exhausted
    #[serde(default = "default_max_attempts_per_batch")]
    pub max_attempts_per_batch: u32,

    /// Timeout for a single provider call, in seconds
    #[serde(default = "default_attempt_timeout_secs")]
    pub attempt_timeout_secs: u64,

    /// Policy when a batch exhausts its attempts
    #[serde(default)]
    pub on_batch_failure: FailurePolicy,

    /// Scheduling model
    #[serde(default)]
    pub concurrency: ConcurrencyMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_batch_size: default_max_batch_size(),
            max_attempts_per_batch: default_max_attempts_per_batch(),
            attempt_timeout_secs: default_attempt_timeout_secs(),
            on_batch_failure: FailurePolicy::default(),
            concurrency: ConcurrencyMode::default(),
        }
    }
}

/// Provider configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    /// Model name
    #[serde(default = "default_model")]
    pub model: String,

    /// API key
    #[serde(default = "String::new")]
    pub api_key: String,

    /// Service URL (OpenAI-compatible base, e.g. "https://api.openai.com/v1")
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Temperature parameter for text generation (0.0 to 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Retry count for transport-level failures
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Backoff base for transport retries (in milliseconds)
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key: String::new(),
            endpoint: default_endpoint(),
            temperature: default_temperature(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

fn default_max_batch_size() -> usize {
    30
}

fn default_max_attempts_per_batch() -> u32 {
    3
}

fn default_attempt_timeout_secs() -> u64 {
    60
}

fn default_temperature() -> f32 {
    0.3
}

fn default_retry_count() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

impl Config {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path.display(), e))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path.display(), e))?;
        Ok(())
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.source_language.trim().is_empty() {
            return Err(anyhow!("Source language must not be empty"));
        }
        if self.target_language.trim().is_empty() {
            return Err(anyhow!("Target language must not be empty"));
        }
        self.engine.validate()?;
        Ok(())
    }
}

impl EngineConfig {
    /// Validate engine settings against the recognized option ranges
    pub fn validate(&self) -> Result<()> {
        if self.max_batch_size == 0 {
            return Err(anyhow!("max_batch_size must be greater than zero"));
        }
        if self.max_attempts_per_batch == 0 {
            return Err(anyhow!("max_attempts_per_batch must be at least 1"));
        }
        if let ConcurrencyMode::PooledSnapshot { pool_size } = self.concurrency {
            if pool_size == 0 {
                return Err(anyhow!("pool_size must be greater than zero"));
            }
        }
        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: "English".to_string(),
            target_language: "French".to_string(),
            engine: EngineConfig::default(),
            provider: ProviderConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
