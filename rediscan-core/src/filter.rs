//! Compiled filter pipeline.
//!
//! Stages run in a fixed order so the cheap checks gate the expensive ones:
//! the key regex needs nothing but the key, the value regex needs a `GET`,
//! and the TTL range needs a `TTL` round-trip.

use std::time::Duration;

use regex::Regex;

/// Inclusive TTL window. A missing bound is unbounded on that side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TtlRange {
    /// Smallest accepted TTL (`ttl-gte`).
    pub min: Option<Duration>,
    /// Largest accepted TTL (`ttl-lte`).
    pub max: Option<Duration>,
}

impl TtlRange {
    /// Window between the given bounds.
    pub fn new(min: Option<Duration>, max: Option<Duration>) -> Self {
        Self { min, max }
    }

    /// True when neither bound is set.
    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    /// Both bounds are inclusive.
    pub fn contains(&self, ttl: Duration) -> bool {
        self.min.is_none_or(|min| ttl >= min) && self.max.is_none_or(|max| ttl <= max)
    }
}

/// Read-only predicates compiled once from the scan configuration.
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    key_regex: Option<Regex>,
    value_regex: Option<regex::bytes::Regex>,
    ttl_range: Option<TtlRange>,
}

impl FilterSet {
    /// Compiled stages. An unbounded TTL range counts as no TTL filter.
    pub fn new(
        key_regex: Option<Regex>,
        value_regex: Option<regex::bytes::Regex>,
        ttl_range: Option<TtlRange>,
    ) -> Self {
        Self {
            key_regex,
            value_regex,
            ttl_range: ttl_range.filter(|range| !range.is_unbounded()),
        }
    }

    /// Stage 1. Rejects before any per-key network traffic.
    pub fn accepts_key(&self, key: &str) -> bool {
        self.key_regex.as_ref().is_none_or(|regex| regex.is_match(key))
    }

    /// Stage 2. Only meaningful once a value has been fetched.
    pub fn accepts_value(&self, value: &[u8]) -> bool {
        self.value_regex.as_ref().is_none_or(|regex| regex.is_match(value))
    }

    /// Stage 3. Only meaningful once a TTL has been fetched.
    pub fn accepts_ttl(&self, ttl: Duration) -> bool {
        self.ttl_range.is_none_or(|range| range.contains(ttl))
    }

    /// Whether a value regex is configured.
    pub fn has_value_filter(&self) -> bool {
        self.value_regex.is_some()
    }

    /// Whether TTLs must be fetched at all.
    pub fn has_ttl_filter(&self) -> bool {
        self.ttl_range.is_some()
    }

    /// The bounded TTL window, if any.
    pub fn ttl_range(&self) -> Option<TtlRange> {
        self.ttl_range
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn ttl_bounds_are_inclusive_and_independent() {
        let both = TtlRange::new(Some(secs(10)), Some(secs(60)));
        assert!(!both.contains(secs(5)));
        assert!(both.contains(secs(10)));
        assert!(both.contains(secs(30)));
        assert!(both.contains(secs(60)));
        assert!(!both.contains(secs(61)));

        let lower_only = TtlRange::new(Some(secs(10)), None);
        assert!(lower_only.contains(secs(u32::MAX as u64)));
        assert!(!lower_only.contains(secs(9)));

        let upper_only = TtlRange::new(None, Some(secs(10)));
        assert!(upper_only.contains(Duration::ZERO));
        assert!(!upper_only.contains(secs(11)));
    }

    #[test]
    fn empty_filter_set_accepts_everything() {
        let filters = FilterSet::default();
        assert!(filters.accepts_key("anything"));
        assert!(filters.accepts_value(b"\xff\x00binary"));
        assert!(filters.accepts_ttl(secs(1)));
        assert!(!filters.has_value_filter());
        assert!(!filters.has_ttl_filter());
    }

    #[test]
    fn unbounded_ttl_range_is_dropped() {
        let filters = FilterSet::new(None, None, Some(TtlRange::new(None, None)));
        assert!(!filters.has_ttl_filter());
    }

    #[test]
    fn key_and_value_regexes_apply() {
        let filters = FilterSet::new(
            Some(Regex::new("^user:").unwrap()),
            Some(regex::bytes::Regex::new(r#""active":true"#).unwrap()),
            None,
        );
        assert!(filters.accepts_key("user:1"));
        assert!(!filters.accepts_key("order:2"));
        assert!(filters.accepts_value(br#"{"active":true}"#));
        assert!(!filters.accepts_value(br#"{"active":false}"#));
    }
}
