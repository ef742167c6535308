//! In-memory [`KeyStore`] for tests.
//!
//! Keys are kept sorted and paged by offset, so the cursor returned after the
//! last page is zero exactly like a real server. `MATCH` is applied after
//! paging, which mirrors how Redis can hand back short or empty pages.
//! Failures can be scripted per operation to exercise retry paths.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use globset::{GlobBuilder, GlobMatcher};

use crate::error::StoreError;
use crate::store::{Cursor, KeyStore, KeyTtl, ScanBatch};

#[derive(Debug, Clone)]
struct Entry {
    /// `None` models a non-string type that `GET` refuses.
    value: Option<Vec<u8>>,
    ttl: Option<Duration>,
}

#[derive(Debug, Default)]
struct Inner {
    entries: BTreeMap<String, Entry>,
    scan_failures: u32,
    failing_gets: HashSet<String>,
    failing_ttls: HashSet<String>,
    scanned_cursors: Vec<Cursor>,
    get_calls: Vec<String>,
    ttl_calls: Vec<String>,
}

/// Sorted in-memory keyspace with scripted failures and call accounting.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Empty keyspace.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a persistent string key.
    pub fn with_key(self, key: &str, value: impl Into<Vec<u8>>) -> Self {
        self.insert(key, Some(value.into()), None);
        self
    }

    /// Add a string key that expires after `ttl`.
    pub fn with_expiring_key(self, key: &str, value: impl Into<Vec<u8>>, ttl: Duration) -> Self {
        self.insert(key, Some(value.into()), Some(ttl));
        self
    }

    /// Add a key whose `GET` fails the way a hash or list would.
    pub fn with_non_string_key(self, key: &str) -> Self {
        self.insert(key, None, None);
        self
    }

    /// Make the next `n` scan calls fail.
    pub fn failing_scans(self, n: u32) -> Self {
        self.lock().scan_failures = n;
        self
    }

    /// Make every `GET` of `key` fail.
    pub fn failing_get(self, key: &str) -> Self {
        self.lock().failing_gets.insert(key.to_string());
        self
    }

    /// Make every `TTL` of `key` fail.
    pub fn failing_ttl(self, key: &str) -> Self {
        self.lock().failing_ttls.insert(key.to_string());
        self
    }

    /// Insert or replace a key. A `None` value models a non-string type.
    pub fn insert(&self, key: &str, value: Option<Vec<u8>>, ttl: Option<Duration>) {
        self.lock().entries.insert(key.to_string(), Entry { value, ttl });
    }

    /// Whether `key` currently exists.
    pub fn contains(&self, key: &str) -> bool {
        self.lock().entries.contains_key(key)
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// True when no keys are left.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every cursor passed to `scan_batch`, including failed calls.
    pub fn scanned_cursors(&self) -> Vec<Cursor> {
        self.lock().scanned_cursors.clone()
    }

    /// Keys passed to `get_value`, in call order.
    pub fn get_calls(&self) -> Vec<String> {
        self.lock().get_calls.clone()
    }

    /// Keys passed to `ttl`, in call order.
    pub fn ttl_calls(&self) -> Vec<String> {
        self.lock().ttl_calls.clone()
    }
}

#[async_trait]
impl KeyStore for MemoryStore {
    async fn scan_batch(
        &self,
        cursor: Cursor,
        pattern: &str,
        count: u64,
    ) -> Result<ScanBatch, StoreError> {
        let mut inner = self.lock();
        inner.scanned_cursors.push(cursor);

        if inner.scan_failures > 0 {
            inner.scan_failures -= 1;
            return Err(StoreError::Unavailable("connection refused".into()));
        }

        let pattern = MatchPattern::new(pattern);
        let offset = usize::try_from(cursor.0).unwrap_or(usize::MAX);
        let count = usize::try_from(count.max(1)).unwrap_or(usize::MAX);
        let keys = inner
            .entries
            .keys()
            .skip(offset)
            .take(count)
            .filter(|key| pattern.matches(key))
            .cloned()
            .collect();

        let end = offset.saturating_add(count);
        let next = if end >= inner.entries.len() {
            Cursor::START
        } else {
            Cursor(end as u64)
        };

        Ok(ScanBatch::new(keys, next))
    }

    async fn get_value(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let mut inner = self.lock();
        inner.get_calls.push(key.to_string());

        if inner.failing_gets.contains(key) {
            return Err(StoreError::Unavailable(format!("GET {key} timed out")));
        }

        match inner.entries.get(key) {
            Some(Entry { value: Some(value), .. }) => Ok(value.clone()),
            Some(Entry { value: None, .. }) => Err(StoreError::Unavailable(
                "WRONGTYPE Operation against a key holding the wrong kind of value".into(),
            )),
            None => Err(StoreError::NotFound {
                key: key.to_string(),
            }),
        }
    }

    async fn ttl(&self, key: &str) -> Result<KeyTtl, StoreError> {
        let mut inner = self.lock();
        inner.ttl_calls.push(key.to_string());

        if inner.failing_ttls.contains(key) {
            return Err(StoreError::Unavailable(format!("TTL {key} timed out")));
        }

        Ok(match inner.entries.get(key) {
            Some(Entry { ttl: Some(ttl), .. }) => KeyTtl::Expires(*ttl),
            Some(Entry { ttl: None, .. }) => KeyTtl::Persistent,
            None => KeyTtl::Missing,
        })
    }

    async fn delete(&self, key: &str) -> Result<u64, StoreError> {
        Ok(u64::from(self.lock().entries.remove(key).is_some()))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Redis `MATCH` glob compiled with globset.
///
/// Redis negates classes with `[^...]` and treats braces literally; globset
/// spells negation `[!...]` and reads braces as alternation, so both are
/// rewritten first. Patterns globset rejects (an unclosed `[`) match only
/// themselves.
#[derive(Debug)]
enum MatchPattern {
    Any,
    Glob(GlobMatcher),
    Literal(String),
}

impl MatchPattern {
    fn new(pattern: &str) -> Self {
        if pattern.is_empty() {
            return MatchPattern::Any;
        }
        GlobBuilder::new(&translate_glob(pattern))
            .literal_separator(false)
            .backslash_escape(true)
            .build()
            .map_or_else(
                |_| MatchPattern::Literal(pattern.to_string()),
                |glob| MatchPattern::Glob(glob.compile_matcher()),
            )
    }

    fn matches(&self, key: &str) -> bool {
        match self {
            MatchPattern::Any => true,
            MatchPattern::Glob(matcher) => matcher.is_match(key),
            MatchPattern::Literal(literal) => literal == key,
        }
    }
}

fn translate_glob(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 4);
    let mut chars = pattern.chars().peekable();
    let mut in_class = false;

    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                out.push(ch);
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            }
            '[' if !in_class => {
                in_class = true;
                out.push(ch);
                if chars.next_if_eq(&'^').is_some() {
                    out.push('!');
                }
            }
            ']' if in_class => {
                in_class = false;
                out.push(ch);
            }
            '{' | '}' if !in_class => {
                out.push('\\');
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(pattern: &str, key: &str) -> bool {
        MatchPattern::new(pattern).matches(key)
    }

    #[test]
    fn glob_patterns() {
        assert!(matches("*", ""));
        assert!(matches("user:*", "user:42"));
        assert!(!matches("user:*", "order:42"));
        assert!(matches("*a*bc*", "xxaybcz"));
        assert!(matches("h?llo", "hello"));
        assert!(!matches("h?llo", "hllo"));
        assert!(matches("h[ae]llo", "hallo"));
        assert!(!matches("h[^e]llo", "hello"));
        assert!(matches("h[a-c]llo", "hbllo"));
        assert!(matches(r"lit\*", "lit*"));
        assert!(!matches(r"lit\*", "literal"));
        assert!(matches("open[", "open["));
        assert!(!matches("open[", "open"));
    }

    #[test]
    fn redis_specific_glob_syntax() {
        assert!(matches("", "anything"));
        assert!(matches("*", "a/b/c"));
        assert!(matches("{a,b}", "{a,b}"));
        assert!(!matches("{a,b}", "a"));
        assert!(matches("x[^{]y", "xzy"));
        assert!(!matches(&"*a".repeat(16), &"a".repeat(15)));
    }

    #[tokio::test]
    async fn pages_by_offset_and_wraps_to_zero() {
        let store = (0..25).fold(MemoryStore::new(), |store, n| {
            store.with_key(&format!("key:{n:02}"), "v")
        });

        let first = store.scan_batch(Cursor::START, "", 10).await.unwrap();
        assert_eq!(first.keys.len(), 10);
        assert_eq!(first.next, Cursor(10));

        let second = store.scan_batch(first.next, "", 10).await.unwrap();
        assert_eq!(second.next, Cursor(20));

        let last = store.scan_batch(second.next, "", 10).await.unwrap();
        assert_eq!(last.keys.len(), 5);
        assert!(last.next.is_complete());
    }

    #[tokio::test]
    async fn match_is_applied_after_paging() {
        let store = MemoryStore::new()
            .with_key("a:1", "v")
            .with_key("b:1", "v")
            .with_key("b:2", "v");

        let batch = store.scan_batch(Cursor::START, "a:*", 2).await.unwrap();
        assert_eq!(batch.keys, vec!["a:1"]);
        assert_eq!(batch.next, Cursor(2));

        let batch = store.scan_batch(batch.next, "a:*", 2).await.unwrap();
        assert!(batch.keys.is_empty());
        assert!(batch.next.is_complete());
    }

    #[tokio::test]
    async fn scripted_failures_and_lookups() {
        let store = MemoryStore::new()
            .with_key("plain", "v")
            .with_expiring_key("temp", "v", Duration::from_secs(9))
            .with_non_string_key("hash")
            .failing_scans(1);

        assert!(store.scan_batch(Cursor::START, "", 10).await.is_err());
        assert!(store.scan_batch(Cursor::START, "", 10).await.is_ok());
        assert_eq!(store.scanned_cursors(), vec![Cursor::START; 2]);

        assert_eq!(store.get_value("plain").await.unwrap(), b"v");
        assert!(store.get_value("hash").await.is_err());
        assert!(matches!(
            store.get_value("nope").await,
            Err(StoreError::NotFound { .. })
        ));

        assert_eq!(store.ttl("plain").await.unwrap(), KeyTtl::Persistent);
        assert_eq!(
            store.ttl("temp").await.unwrap(),
            KeyTtl::Expires(Duration::from_secs(9))
        );
        assert_eq!(store.ttl("nope").await.unwrap(), KeyTtl::Missing);

        assert_eq!(store.delete("plain").await.unwrap(), 1);
        assert_eq!(store.delete("plain").await.unwrap(), 0);
        assert!(!store.contains("plain"));
    }
}
