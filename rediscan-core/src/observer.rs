//! Progress reporting for the scan engine.
//!
//! The engine reports through an explicitly passed [`ScanObserver`] instead of
//! logging from a global. [`TracingObserver`] is the default and turns every
//! callback into a `tracing` event.

use tracing::{debug, error, info, warn};

use crate::engine::{ScanState, ScanSummary};
use crate::error::{ScanError, StoreError};
use crate::fetcher::{FilterStage, SkipReason};
use crate::store::Cursor;

/// Callbacks fired by the engine as it moves through a scan.
///
/// Every method has an empty default so observers only implement what they
/// care about.
pub trait ScanObserver: Send + Sync {
    /// A batch was fetched. `state.cursor` is the cursor that was requested
    /// and `state.round_keys` already includes this batch.
    fn batch_fetched(&self, state: &ScanState, next: Cursor, keys: usize) {
        let _ = (state, next, keys);
    }

    /// A batch request failed; `state.consecutive_errors` counts this one.
    fn batch_failed(&self, state: &ScanState, err: &StoreError) {
        let _ = (state, err);
    }

    /// A filter stage rejected `key`.
    fn key_filtered(&self, key: &str, stage: FilterStage) {
        let _ = (key, stage);
    }

    /// A key was dropped because one of its lookups failed.
    fn key_skipped(&self, key: &str, reason: &SkipReason) {
        let _ = (key, reason);
    }

    /// The store returned cursor zero; `state.round` is the finished round.
    fn round_completed(&self, state: &ScanState) {
        let _ = state;
    }

    /// The run is about to return a fatal error.
    fn aborted(&self, err: &ScanError) {
        let _ = err;
    }

    /// The run ended without error.
    fn finished(&self, summary: &ScanSummary) {
        let _ = summary;
    }
}

/// Reports scan progress as `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl ScanObserver for TracingObserver {
    fn batch_fetched(&self, state: &ScanState, next: Cursor, keys: usize) {
        info!(
            round = state.round,
            cursor = %state.cursor,
            next = %next,
            keys,
            total_keys = state.round_keys,
            "scan"
        );
    }

    fn batch_failed(&self, state: &ScanState, err: &StoreError) {
        warn!(
            round = state.round,
            cursor = %state.cursor,
            attempt = state.consecutive_errors,
            error = %err,
            "scan error"
        );
    }

    fn key_filtered(&self, key: &str, stage: FilterStage) {
        debug!(key, ?stage, "filtered");
    }

    fn key_skipped(&self, key: &str, reason: &SkipReason) {
        match reason {
            SkipReason::Value(_) | SkipReason::Ttl(_) | SkipReason::UnreadableKey => {
                warn!(key, error = %reason, "skip key");
            }
            SkipReason::NoExpiry | SkipReason::Vanished => {
                debug!(key, reason = %reason, "skip key");
            }
        }
    }

    fn round_completed(&self, state: &ScanState) {
        info!(round = state.round, total_keys = state.round_keys, "round complete");
    }

    fn aborted(&self, err: &ScanError) {
        error!(error = %err, "scan aborted");
    }

    fn finished(&self, summary: &ScanSummary) {
        info!(
            stop = ?summary.stop,
            rounds = summary.rounds_completed,
            batches = summary.batches,
            keys = summary.keys_scanned,
            handled = summary.handled,
            filtered = summary.filtered,
            skipped = summary.skipped,
            "scan finished"
        );
    }
}
