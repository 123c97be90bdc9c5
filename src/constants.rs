//! # Constants
//!
//! Shared constants used throughout the reconciler.
//!
//! These values represent reasonable defaults and can be overridden via
//! environment variables where applicable (see [`crate::config`]).

/// Wall-clock budget for retrying a scheduled action put while the remote
/// service converges (seconds)
pub const DEFAULT_PUT_RETRY_TIMEOUT_SECS: u64 = 300;

/// Smallest delay between put attempts (milliseconds)
pub const DEFAULT_RETRY_BACKOFF_MIN_MS: u64 = 500;

/// Largest delay between put attempts (milliseconds)
pub const DEFAULT_RETRY_BACKOFF_MAX_MS: u64 = 10_000;

/// Separator joining the parts of a scheduled action identifier
pub const ID_DELIMITER: char = '-';

/// Textual layout for scheduled action start and end times
///
/// UTC, second precision, literal `Z` suffix: `2006-01-02T15:04:05Z`
pub const SCHEDULE_TIME_LAYOUT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Maximum number of rules in a single CORS policy
pub const MAX_CORS_RULES: usize = 100;

/// Default log level when neither `RUST_LOG` nor `LOG_LEVEL` is set
pub const DEFAULT_LOG_LEVEL: &str = "info";
