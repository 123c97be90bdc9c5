//! # Reconciler Configuration
//!
//! Process-level settings loaded from environment variables.

use crate::backoff::FibonacciBackoff;
use crate::constants::{
    DEFAULT_LOG_LEVEL, DEFAULT_PUT_RETRY_TIMEOUT_SECS, DEFAULT_RETRY_BACKOFF_MAX_MS,
    DEFAULT_RETRY_BACKOFF_MIN_MS,
};
use crate::retry::RetryPolicy;
use std::time::Duration;

/// Reconciler-level configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// How long a scheduled action put keeps retrying "object not found" (seconds)
    pub put_retry_timeout_secs: u64,
    /// Initial delay between put attempts (milliseconds)
    pub retry_backoff_min_ms: u64,
    /// Maximum delay between put attempts (milliseconds)
    pub retry_backoff_max_ms: u64,
    /// Region for the remote API; the SDK default chain is used when unset
    pub region: Option<String>,
    /// Global log level (error, warn, info, debug, trace)
    pub log_level: String,
    /// Register Prometheus metrics on startup
    pub enable_metrics: bool,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            put_retry_timeout_secs: DEFAULT_PUT_RETRY_TIMEOUT_SECS,
            retry_backoff_min_ms: DEFAULT_RETRY_BACKOFF_MIN_MS,
            retry_backoff_max_ms: DEFAULT_RETRY_BACKOFF_MAX_MS,
            region: None,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            enable_metrics: true,
        }
    }
}

impl ReconcilerConfig {
    /// Load configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            put_retry_timeout_secs: env_var_or_default(
                "PUT_RETRY_TIMEOUT_SECS",
                DEFAULT_PUT_RETRY_TIMEOUT_SECS,
            ),
            retry_backoff_min_ms: env_var_or_default(
                "RETRY_BACKOFF_MIN_MS",
                DEFAULT_RETRY_BACKOFF_MIN_MS,
            ),
            retry_backoff_max_ms: env_var_or_default(
                "RETRY_BACKOFF_MAX_MS",
                DEFAULT_RETRY_BACKOFF_MAX_MS,
            ),
            region: std::env::var("AWS_REGION").ok().filter(|r| !r.is_empty()),
            log_level: env_var_or_default_str("LOG_LEVEL", DEFAULT_LOG_LEVEL),
            enable_metrics: env_var_or_default_bool("ENABLE_METRICS", true),
        }
    }

    /// Retry policy for scheduled action puts
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            Duration::from_secs(self.put_retry_timeout_secs),
            FibonacciBackoff::new(
                Duration::from_millis(self.retry_backoff_min_ms),
                Duration::from_millis(self.retry_backoff_max_ms),
            ),
        )
    }
}

/// Read environment variable or return default
fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Read environment variable as boolean or return default
fn env_var_or_default_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|v| {
            let v_lower = v.to_lowercase();
            v_lower == "true" || v_lower == "1" || v_lower == "yes" || v_lower == "on"
        })
        .unwrap_or(default)
}

/// Read environment variable as string or return default
fn env_var_or_default_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
