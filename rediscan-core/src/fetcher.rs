//! Per-key lookups that feed the value and TTL filter stages.
//!
//! This is the only place that issues per-key requests, so the order below
//! bounds request volume under selective filters: no `GET` when values are
//! ignored, no `TTL` unless a TTL filter exists, and nothing further once a
//! stage rejects.

use std::time::Duration;

use crate::error::StoreError;
use crate::filter::FilterSet;
use crate::store::{KeyStore, KeyTtl};

/// A key that survived every configured filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Key as returned by the scan.
    pub key: String,
    /// Absent when values are ignored.
    pub value: Option<Vec<u8>>,
    /// Present only when a TTL filter is configured.
    pub ttl: Option<Duration>,
}

impl Record {
    /// Record carrying only its key.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: None,
            ttl: None,
        }
    }

    /// Value as text, with invalid UTF-8 replaced.
    pub fn value_lossy(&self) -> Option<String> {
        self.value.as_deref().map(|value| String::from_utf8_lossy(value).into_owned())
    }
}

/// Which predicate turned a key away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterStage {
    /// Key regex.
    Key,
    /// Value regex.
    Value,
    /// TTL range.
    Ttl,
}

/// Why a key was skipped without being evaluated.
#[derive(Debug)]
pub enum SkipReason {
    /// `GET` failed (including a key that vanished since the scan).
    Value(StoreError),
    /// `TTL` failed.
    Ttl(StoreError),
    /// TTL filter configured but the key never expires.
    NoExpiry,
    /// TTL filter configured but the key was gone by the time it was asked.
    Vanished,
    /// Key is not valid UTF-8 and cannot be looked up or matched.
    UnreadableKey,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Value(err) => write!(f, "get value: {err}"),
            SkipReason::Ttl(err) => write!(f, "get ttl: {err}"),
            SkipReason::NoExpiry => f.write_str("key has no expiry"),
            SkipReason::Vanished => f.write_str("key no longer exists"),
            SkipReason::UnreadableKey => f.write_str("key is not valid utf-8"),
        }
    }
}

/// Result of completing one key.
#[derive(Debug)]
pub enum FetchOutcome {
    /// Passed every stage; ready for the handler.
    Accepted(Record),
    /// Rejected by a filter stage.
    Filtered(FilterStage),
    /// Dropped after a failed or inconclusive lookup.
    Skipped(SkipReason),
}

/// Fetches the data later filter stages need, stopping at the first reject.
#[derive(Debug, Clone, Copy)]
pub struct RecordFetcher<'a> {
    filters: &'a FilterSet,
    fetch_values: bool,
}

impl<'a> RecordFetcher<'a> {
    /// Fetcher over `filters`; `fetch_values` is false under ignore-value.
    pub fn new(filters: &'a FilterSet, fetch_values: bool) -> Self {
        Self {
            filters,
            fetch_values,
        }
    }

    /// Complete `key`, which must already have passed the key regex.
    pub async fn fetch(&self, store: &dyn KeyStore, key: &str) -> FetchOutcome {
        let mut record = Record::new(key);

        if self.fetch_values {
            let value = match store.get_value(&record.key).await {
                Ok(value) => value,
                Err(err) => return FetchOutcome::Skipped(SkipReason::Value(err)),
            };
            if !self.filters.accepts_value(&value) {
                return FetchOutcome::Filtered(FilterStage::Value);
            }
            record.value = Some(value);
        }

        if self.filters.has_ttl_filter() {
            let ttl = match store.ttl(&record.key).await {
                Ok(KeyTtl::Expires(ttl)) => ttl,
                Ok(KeyTtl::Persistent) => return FetchOutcome::Skipped(SkipReason::NoExpiry),
                Ok(KeyTtl::Missing) => return FetchOutcome::Skipped(SkipReason::Vanished),
                Err(err) => return FetchOutcome::Skipped(SkipReason::Ttl(err)),
            };
            if !self.filters.accepts_ttl(ttl) {
                return FetchOutcome::Filtered(FilterStage::Ttl);
            }
            record.ttl = Some(ttl);
        }

        FetchOutcome::Accepted(record)
    }
}
