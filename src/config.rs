//! Configuration for the build service.
//!
//! All settings load from environment variables with sensible defaults and are
//! carried in an explicit [`BuilderConfig`] value handed to the pipeline at
//! construction time, never as process-wide mutable state, so concurrent jobs
//! with different policies cannot interfere.
//!
//! # Environment Variables
//!
//! - `SHIPWRIGHT_BIND_ADDR`: HTTP bind address - default: "0.0.0.0:8080"
//! - `SHIPWRIGHT_WORKSPACE_ROOT`: parent dir for per-job workspaces - default: system temp dir
//! - `SHIPWRIGHT_DEFAULT_BRANCH`: branch used when a request omits one - default: "main"
//! - `SHIPWRIGHT_STORAGE_ROOT`: local object store root - default: temp dir + "shipwright-store"
//! - `SHIPWRIGHT_PUBLIC_BASE_URL`: base URL artifact links are composed from - default: "http://localhost:8080/artifacts"
//! - `SHIPWRIGHT_URL_TTL_SECS`: signed URL validity window - default: 86400 (24h)
//! - `SHIPWRIGHT_NOTIFY_MAX_ATTEMPTS`: callback delivery attempts - default: 5
//! - `SHIPWRIGHT_NOTIFY_INITIAL_DELAY_SECS`: delay before the second attempt - default: 2
//! - `SHIPWRIGHT_STAGE_TIMEOUT_SECS`: deadline for each external stage - default: 900
//! - `SHIPWRIGHT_LOG_LEVEL`: trace|debug|info|warn|error - default: "info"
//! - `SHIPWRIGHT_LOG_JSON`: JSON log output (true|false) - default: false

use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_BRANCH: &str = "main";
const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:8080/artifacts";
const DEFAULT_URL_TTL_SECS: u64 = 86_400;
const DEFAULT_NOTIFY_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_NOTIFY_INITIAL_DELAY_SECS: u64 = 2;
const DEFAULT_STAGE_TIMEOUT_SECS: u64 = 900;
const DEFAULT_LOG_LEVEL: &str = "info";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to parse a configuration value
    #[error("Failed to parse {field}: {error}")]
    ParseError { field: String, error: String },

    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Callback delivery retry policy.
///
/// The delay schedule is a pure function of the attempt number so backoff
/// timing is testable without real time passing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum delivery attempts, including the first.
    pub max_attempts: u32,

    /// Delay before the second attempt; doubles for each one after.
    pub initial_delay: Duration,
}

impl RetryPolicy {
    /// Delay to sleep before attempt `n` (1-based).
    ///
    /// The first attempt is immediate; the delay before attempt `n` (n >= 2)
    /// is `initial_delay * 2^(n-2)`. Returns `None` for attempt 1 or any
    /// attempt past `max_attempts`.
    pub fn delay_before(&self, attempt: u32) -> Option<Duration> {
        if attempt <= 1 || attempt > self.max_attempts {
            return None;
        }
        Some(self.initial_delay * 2u32.saturating_pow(attempt - 2))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_NOTIFY_MAX_ATTEMPTS,
            initial_delay: Duration::from_secs(DEFAULT_NOTIFY_INITIAL_DELAY_SECS),
        }
    }
}

/// Main configuration for the build service.
#[derive(Debug, Clone)]
pub struct BuilderConfig {
    /// HTTP bind address for the job submission API.
    pub bind_addr: String,

    /// Parent directory under which per-job workspaces are created.
    pub workspace_root: PathBuf,

    /// Branch checked out when a request does not name one.
    pub default_branch: String,

    /// Root directory of the local object store.
    pub storage_root: PathBuf,

    /// Base URL that published artifact links are composed from.
    pub public_base_url: String,

    /// Key prefix artifacts are uploaded under.
    pub storage_key_prefix: String,

    /// Validity window for artifact read URLs.
    pub url_ttl: Duration,

    /// Callback delivery retry policy.
    pub retry: RetryPolicy,

    /// Deadline applied to each externally-blocking stage.
    pub stage_timeout: Duration,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Use JSON log output.
    pub log_json: bool,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            workspace_root: env::temp_dir(),
            default_branch: DEFAULT_BRANCH.to_string(),
            storage_root: env::temp_dir().join("shipwright-store"),
            public_base_url: DEFAULT_PUBLIC_BASE_URL.to_string(),
            storage_key_prefix: "output".to_string(),
            url_ttl: Duration::from_secs(DEFAULT_URL_TTL_SECS),
            retry: RetryPolicy::default(),
            stage_timeout: Duration::from_secs(DEFAULT_STAGE_TIMEOUT_SECS),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_json: false,
        }
    }
}

impl BuilderConfig {
    /// Loads configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let config = Self {
            bind_addr: env_or("SHIPWRIGHT_BIND_ADDR", defaults.bind_addr),
            workspace_root: env::var("SHIPWRIGHT_WORKSPACE_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.workspace_root),
            default_branch: env_or("SHIPWRIGHT_DEFAULT_BRANCH", defaults.default_branch),
            storage_root: env::var("SHIPWRIGHT_STORAGE_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_root),
            public_base_url: env_or("SHIPWRIGHT_PUBLIC_BASE_URL", defaults.public_base_url),
            storage_key_prefix: defaults.storage_key_prefix,
            url_ttl: Duration::from_secs(env_parsed(
                "SHIPWRIGHT_URL_TTL_SECS",
                DEFAULT_URL_TTL_SECS,
            )?),
            retry: RetryPolicy {
                max_attempts: env_parsed(
                    "SHIPWRIGHT_NOTIFY_MAX_ATTEMPTS",
                    DEFAULT_NOTIFY_MAX_ATTEMPTS,
                )?,
                initial_delay: Duration::from_secs(env_parsed(
                    "SHIPWRIGHT_NOTIFY_INITIAL_DELAY_SECS",
                    DEFAULT_NOTIFY_INITIAL_DELAY_SECS,
                )?),
            },
            stage_timeout: Duration::from_secs(env_parsed(
                "SHIPWRIGHT_STAGE_TIMEOUT_SECS",
                DEFAULT_STAGE_TIMEOUT_SECS,
            )?),
            log_level: env_or("SHIPWRIGHT_LOG_LEVEL", defaults.log_level),
            log_json: env_parsed("SHIPWRIGHT_LOG_JSON", false)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::ValidationFailed(
                "notify max attempts must be at least 1".to_string(),
            ));
        }
        if self.bind_addr.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "bind address must not be empty".to_string(),
            ));
        }
        if self.public_base_url.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "public base URL must not be empty".to_string(),
            ));
        }
        if self.stage_timeout.is_zero() {
            return Err(ConfigError::ValidationFailed(
                "stage timeout must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_or(key: &str, default: String) -> String {
    env::var(key).unwrap_or(default)
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.parse().map_err(|e| ConfigError::ParseError {
            field: key.to_string(),
            error: format!("{}", e),
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_config() {
        let config = BuilderConfig::default();
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.default_branch, "main");
        assert_eq!(config.url_ttl, Duration::from_secs(86_400));
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.initial_delay, Duration::from_secs(2));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_backoff_schedule_doubles() {
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_delay: Duration::from_secs(2),
        };

        assert_eq!(policy.delay_before(1), None);
        assert_eq!(policy.delay_before(2), Some(Duration::from_secs(2)));
        assert_eq!(policy.delay_before(3), Some(Duration::from_secs(4)));
        assert_eq!(policy.delay_before(4), Some(Duration::from_secs(8)));
        assert_eq!(policy.delay_before(5), Some(Duration::from_secs(16)));
        assert_eq!(policy.delay_before(6), None);
    }

    #[test]
    fn test_backoff_single_attempt_policy() {
        let policy = RetryPolicy {
            max_attempts: 1,
            initial_delay: Duration::from_secs(2),
        };
        assert_eq!(policy.delay_before(1), None);
        assert_eq!(policy.delay_before(2), None);
    }

    #[test]
    fn test_zero_attempts_fails_validation() {
        let config = BuilderConfig {
            retry: RetryPolicy {
                max_attempts: 0,
                initial_delay: Duration::from_secs(2),
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        env::set_var("SHIPWRIGHT_DEFAULT_BRANCH", "trunk");
        env::set_var("SHIPWRIGHT_NOTIFY_MAX_ATTEMPTS", "3");

        let config = BuilderConfig::from_env().unwrap();
        assert_eq!(config.default_branch, "trunk");
        assert_eq!(config.retry.max_attempts, 3);

        env::remove_var("SHIPWRIGHT_DEFAULT_BRANCH");
        env::remove_var("SHIPWRIGHT_NOTIFY_MAX_ATTEMPTS");
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_garbage() {
        env::set_var("SHIPWRIGHT_NOTIFY_MAX_ATTEMPTS", "lots");
        let result = BuilderConfig::from_env();
        env::remove_var("SHIPWRIGHT_NOTIFY_MAX_ATTEMPTS");
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }
}
