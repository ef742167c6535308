use std::time::Duration;

use thiserror::Error;

use crate::store::Cursor;

/// Errors raised by a [`KeyStore`](crate::store::KeyStore) implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Protocol, IO or reply decoding failure from the redis client.
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// The key disappeared between the scan and the lookup.
    #[error("key not found: {key}")]
    NotFound {
        /// Key that was looked up.
        key: String,
    },

    /// Backend refused or failed the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Errors returned from a scan run.
///
/// Everything except [`ScanError::Fatal`] is raised before the first batch is
/// requested.
#[derive(Debug, Error)]
pub enum ScanError {
    /// `key-regexp` does not compile.
    #[error("parse key-regexp: {0}")]
    InvalidKeyRegex(#[source] regex::Error),

    /// `value-regexp` does not compile.
    #[error("parse value-regexp: {0}")]
    InvalidValueRegex(#[source] regex::Error),

    /// A duration option is not in humantime format.
    #[error("parse {field} duration '{value}': {source}")]
    InvalidDuration {
        /// Option name as spelled on the command line.
        field: &'static str,
        /// Rejected input.
        value: String,
        /// Parser error.
        #[source]
        source: humantime::DurationError,
    },

    /// `ttl-gte` is greater than `ttl-lte`.
    #[error("invalid ttl range: lower bound {lower:?} is greater than upper bound {upper:?}")]
    InvalidTtlRange {
        /// Lower bound.
        lower: Duration,
        /// Upper bound.
        upper: Duration,
    },

    /// Retry settings that could never allow a scan.
    #[error("invalid retry policy: {reason}")]
    InvalidRetryPolicy {
        /// What is wrong with the policy.
        reason: String,
    },

    /// The store URL could not be parsed. The URL is redacted.
    #[error("parse url '{url}': {source}")]
    InvalidUrl {
        /// Redacted URL.
        url: String,
        /// Client error.
        #[source]
        source: redis::RedisError,
    },

    /// The initial connection failed. The URL is redacted.
    #[error("connect to {url}: {source}")]
    Connect {
        /// Redacted URL.
        url: String,
        /// Client error.
        #[source]
        source: redis::RedisError,
    },

    /// The connectivity probe before scanning failed.
    #[error("ping: {0}")]
    Ping(#[source] StoreError),

    /// Scanning gave up after too many consecutive failed batches.
    #[error("scan failed {attempts} consecutive times at cursor {cursor}: {source}")]
    Fatal {
        /// Consecutive failed attempts, equal to the retry threshold.
        attempts: u32,
        /// Cursor that kept failing.
        cursor: Cursor,
        /// Error from the last attempt.
        #[source]
        source: StoreError,
    },
}

impl ScanError {
    /// True when the run aborted mid-scan after repeated batch failures.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ScanError::Fatal { .. })
    }
}

/// Result alias for scan runs.
pub type Result<T> = std::result::Result<T, ScanError>;
