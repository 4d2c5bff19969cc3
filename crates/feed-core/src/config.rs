//! Feed configuration.
//!
//! Loaded from TOML, optionally overridden by `FEED_<SECTION>_<KEY>`
//! environment variables, then validated. Every timeout and backoff bound
//! the engine uses lives here.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::effects::reliability::{BackoffStrategy, RetryPolicy};
use crate::errors::{FeedError, Result};

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "FEED_";

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Request scheduling
    pub scheduler: SchedulerConfig,
    /// Durable storage
    pub storage: StorageConfig,
    /// Session lifetime
    pub session: SessionConfig,
    /// Feed endpoint
    pub network: NetworkConfig,
}

/// Scheduler thresholds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Content older than this is refreshed in the background
    pub refresh_after_ms: u64,
    /// Content older than this is only shown after a bounded wait
    pub stale_after_ms: u64,
    /// Bound for `*_WITH_TIMEOUT` waits
    pub request_timeout_ms: u64,
    /// First backoff window after a request error
    pub backoff_initial_ms: u64,
    /// Largest backoff window
    pub backoff_max_ms: u64,
    /// How the backoff window grows with consecutive failures
    pub backoff_strategy: BackoffStrategy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            refresh_after_ms: 15 * 60 * 1000,
            stale_after_ms: 24 * 60 * 60 * 1000,
            request_timeout_ms: 5_000,
            backoff_initial_ms: 30_000,
            backoff_max_ms: 60 * 60 * 1000,
            backoff_strategy: BackoffStrategy::ExponentialWithJitter,
        }
    }
}

impl SchedulerConfig {
    /// Bound for `*_WITH_TIMEOUT` waits.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Storage retry settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Retries after the first failed attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub retry_initial_ms: u64,
    /// Largest delay between retries
    pub retry_max_ms: u64,
    /// How retry delays grow
    pub retry_strategy: BackoffStrategy,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_initial_ms: 50,
            retry_max_ms: 2_000,
            retry_strategy: BackoffStrategy::Exponential,
        }
    }
}

impl StorageConfig {
    /// Retry policy for storage handlers.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::exponential()
            .with_strategy(self.retry_strategy)
            .with_max_attempts(self.max_retries)
            .with_initial_delay(Duration::from_millis(self.retry_initial_ms))
            .with_max_delay(Duration::from_millis(self.retry_max_ms))
    }
}

/// Session lifetime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Idle sessions older than this are dropped by `expire_sessions`
    pub session_ttl_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_ttl_ms: 2 * 60 * 60 * 1000,
        }
    }
}

/// Feed endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// URL receiving refresh and next-page requests
    pub endpoint_url: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            endpoint_url: "https://feed.invalid/v1/stream".to_string(),
        }
    }
}

impl FeedConfig {
    /// Parse a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| FeedError::invalid(format!("Invalid TOML: {e}")))
    }

    /// Load, apply environment overrides and validate.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            FeedError::invalid(format!("Failed to read config {}: {e}", path.display()))
        })?;
        let mut config = Self::from_toml_str(&content)?;
        config.merge_with_env()?;
        config.validate()?;
        debug!(path = %path.display(), "Loaded feed configuration");
        Ok(config)
    }

    /// Apply `FEED_*` overrides from the process environment.
    pub fn merge_with_env(&mut self) -> Result<()> {
        self.apply_overrides(std::env::vars())
    }

    /// Apply `FEED_<SECTION>_<KEY>=value` overrides; unrelated names are ignored.
    pub fn apply_overrides<I>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (name, value) in vars {
            let Some(key) = name.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            self.set_from_string(&key.to_ascii_lowercase(), &value)?;
        }
        Ok(())
    }

    /// Set one value by `section_key` name.
    pub fn set_from_string(&mut self, key: &str, value: &str) -> Result<()> {
        fn number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
            value
                .parse()
                .map_err(|_| FeedError::invalid(format!("{key}: `{value}` is not a number")))
        }
        fn strategy(key: &str, value: &str) -> Result<BackoffStrategy> {
            value
                .parse()
                .map_err(|e| FeedError::invalid(format!("{key}: {e}")))
        }

        match key {
            "scheduler_refresh_after_ms" => self.scheduler.refresh_after_ms = number(key, value)?,
            "scheduler_stale_after_ms" => self.scheduler.stale_after_ms = number(key, value)?,
            "scheduler_request_timeout_ms" => {
                self.scheduler.request_timeout_ms = number(key, value)?;
            }
            "scheduler_backoff_initial_ms" => {
                self.scheduler.backoff_initial_ms = number(key, value)?;
            }
            "scheduler_backoff_max_ms" => self.scheduler.backoff_max_ms = number(key, value)?,
            "scheduler_backoff_strategy" => {
                self.scheduler.backoff_strategy = strategy(key, value)?;
            }
            "storage_max_retries" => self.storage.max_retries = number(key, value)?,
            "storage_retry_initial_ms" => self.storage.retry_initial_ms = number(key, value)?,
            "storage_retry_max_ms" => self.storage.retry_max_ms = number(key, value)?,
            "storage_retry_strategy" => self.storage.retry_strategy = strategy(key, value)?,
            "session_session_ttl_ms" => self.session.session_ttl_ms = number(key, value)?,
            "network_endpoint_url" => self.network.endpoint_url = value.to_string(),
            other => debug!(key = other, "Ignoring unknown configuration override"),
        }
        Ok(())
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        let scheduler = &self.scheduler;
        if scheduler.refresh_after_ms > scheduler.stale_after_ms {
            return Err(FeedError::invalid(
                "scheduler.refresh_after_ms must not exceed scheduler.stale_after_ms",
            ));
        }
        if scheduler.request_timeout_ms == 0 {
            return Err(FeedError::invalid(
                "scheduler.request_timeout_ms must be positive",
            ));
        }
        if scheduler.backoff_initial_ms > scheduler.backoff_max_ms {
            return Err(FeedError::invalid(
                "scheduler.backoff_initial_ms must not exceed scheduler.backoff_max_ms",
            ));
        }
        if self.storage.retry_initial_ms > self.storage.retry_max_ms {
            return Err(FeedError::invalid(
                "storage.retry_initial_ms must not exceed storage.retry_max_ms",
            ));
        }
        if self.network.endpoint_url.is_empty() {
            return Err(FeedError::invalid("network.endpoint_url must be set"));
        }
        Ok(())
    }
}
