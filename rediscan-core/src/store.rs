//! Store port consumed by the scan engine.
//!
//! The engine never speaks the wire protocol itself. It drives a [`KeyStore`]
//! that already holds a connected, authenticated handle and exposes the
//! paginated scan primitive plus the handful of per-key lookups the filters
//! and actions need.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Opaque scan position returned by the store.
///
/// Zero is both the start of a full pass and the marker the store hands back
/// once the pass is complete.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Cursor(pub u64);

impl Cursor {
    /// Start of a full pass, and the end-of-pass marker.
    pub const START: Cursor = Cursor(0);

    /// True for the zero cursor that ends a pass.
    pub fn is_complete(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Cursor {
    fn from(value: u64) -> Self {
        Cursor(value)
    }
}

/// One page of keys returned by a single scan call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanBatch {
    /// Keys in the order the store returned them.
    pub keys: Vec<String>,
    /// Keys that are not valid UTF-8, as raw bytes. They are reported and
    /// skipped, never looked up.
    pub unreadable: Vec<Vec<u8>>,
    /// Where the next call should resume.
    pub next: Cursor,
}

impl ScanBatch {
    /// Batch of UTF-8 keys.
    pub fn new(keys: Vec<String>, next: Cursor) -> Self {
        Self {
            keys,
            unreadable: Vec::new(),
            next,
        }
    }

    /// Sort raw keys from a scan reply into readable and unreadable ones.
    pub fn from_raw(raw: Vec<Vec<u8>>, next: Cursor) -> Self {
        let mut batch = Self::new(Vec::with_capacity(raw.len()), next);
        for key in raw {
            match String::from_utf8(key) {
                Ok(key) => batch.keys.push(key),
                Err(err) => batch.unreadable.push(err.into_bytes()),
            }
        }
        batch
    }

    /// Every key the store returned, readable or not.
    pub fn len(&self) -> usize {
        self.keys.len() + self.unreadable.len()
    }

    /// True for an empty page, which the store may return mid-pass.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Remaining time-to-live as reported by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    /// Key expires after the given duration.
    Expires(Duration),
    /// Key exists but carries no expiry.
    Persistent,
    /// Key no longer exists.
    Missing,
}

impl KeyTtl {
    /// Map the raw integer reply of the `TTL` command.
    pub fn from_seconds(raw: i64) -> Self {
        match raw {
            -2 => KeyTtl::Missing,
            n if n < 0 => KeyTtl::Persistent,
            n => KeyTtl::Expires(Duration::from_secs(n as u64)),
        }
    }

    /// Remaining time, if the key expires at all.
    pub fn as_duration(self) -> Option<Duration> {
        match self {
            KeyTtl::Expires(ttl) => Some(ttl),
            KeyTtl::Persistent | KeyTtl::Missing => None,
        }
    }
}

/// Operations the scanner needs from the remote key-value store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Fetch up to `count` keys starting at `cursor`, matched server side
    /// against the glob `pattern` (empty pattern matches everything).
    async fn scan_batch(
        &self,
        cursor: Cursor,
        pattern: &str,
        count: u64,
    ) -> Result<ScanBatch, StoreError>;

    /// Fetch the value stored at `key`. A missing key is
    /// [`StoreError::NotFound`].
    async fn get_value(&self, key: &str) -> Result<Vec<u8>, StoreError>;

    /// Remaining time-to-live of `key`.
    async fn ttl(&self, key: &str) -> Result<KeyTtl, StoreError>;

    /// Remove `key`, returning how many keys were removed.
    async fn delete(&self, key: &str) -> Result<u64, StoreError>;

    /// Connectivity probe used once before scanning starts.
    async fn ping(&self) -> Result<(), StoreError>;
}
