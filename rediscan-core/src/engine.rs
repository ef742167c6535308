//! Cursor engine driving the scan.
//!
//! The loop moves through four states:
//!
//! - fetching: request the next batch at the current cursor, retrying with a
//!   fixed backoff and aborting once the consecutive-failure threshold is hit;
//! - processing: run each key through the filters, the fetcher and the
//!   dispatcher, in the order the store returned them;
//! - round complete: the store handed back cursor zero; count the round and
//!   either stop or start a new pass from zero;
//! - done: rounds exhausted, limit reached, or fatal abort.

use tokio::time::sleep;

use crate::config::ScanConfig;
use crate::dispatcher::{DispatchSignal, Dispatcher, RecordHandler};
use crate::error::{Result, ScanError};
use crate::fetcher::{FetchOutcome, FilterStage, RecordFetcher, SkipReason};
use crate::observer::{ScanObserver, TracingObserver};
use crate::store::{Cursor, KeyStore};

/// Mutable bookkeeping owned by a single run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanState {
    /// Cursor of the batch being requested or processed.
    pub cursor: Cursor,
    /// Current round, starting at 1.
    pub round: u64,
    /// Failed batch requests since the last success.
    pub consecutive_errors: u32,
    /// Keys returned by the store so far in the current round.
    pub round_keys: u64,
}

impl ScanState {
    /// State of a run about to request `start`.
    pub fn new(start: Cursor) -> Self {
        Self {
            cursor: start,
            round: 1,
            consecutive_errors: 0,
            round_keys: 0,
        }
    }
}

/// Why a run ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The configured number of rounds completed.
    RoundsCompleted,
    /// The handled-record limit was reached.
    LimitReached,
}

/// Totals reported when a run ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSummary {
    /// Why the run ended.
    pub stop: StopReason,
    /// Full passes over the keyspace.
    pub rounds_completed: u64,
    /// Successful batch requests.
    pub batches: u64,
    /// Keys returned by the store, including unreadable ones.
    pub keys_scanned: u64,
    /// Records handed to the handler.
    pub handled: u64,
    /// Keys rejected by a filter stage.
    pub filtered: u64,
    /// Keys dropped after a failed lookup or an unreadable name.
    pub skipped: u64,
}

#[derive(Debug, Default)]
struct Counters {
    rounds_completed: u64,
    batches: u64,
    keys_scanned: u64,
    filtered: u64,
    skipped: u64,
}

/// Runs one scan over a [`KeyStore`] with a validated [`ScanConfig`].
pub struct ScanEngine<'a> {
    config: &'a ScanConfig,
    observer: &'a dyn ScanObserver,
}

impl std::fmt::Debug for ScanEngine<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanEngine")
            .field("config", self.config)
            .finish_non_exhaustive()
    }
}

impl<'a> ScanEngine<'a> {
    /// Engine reporting through [`TracingObserver`].
    pub fn new(config: &'a ScanConfig) -> Self {
        Self {
            config,
            observer: &TracingObserver,
        }
    }

    /// Report progress to `observer` instead.
    pub fn with_observer(mut self, observer: &'a dyn ScanObserver) -> Self {
        self.observer = observer;
        self
    }

    /// Scan until the rounds or the limit are exhausted.
    ///
    /// With unbounded rounds and no limit this only returns on a fatal
    /// error. The returned error is always [`ScanError::Fatal`].
    pub async fn run(
        &self,
        store: &dyn KeyStore,
        handler: &dyn RecordHandler,
    ) -> Result<ScanSummary> {
        let config = self.config;
        let filters = &config.filters;
        let fetcher = RecordFetcher::new(filters, config.fetches_values());
        let mut dispatcher = Dispatcher::new(config.limit);
        let mut state = ScanState::new(config.start_cursor);
        let mut counters = Counters::default();

        loop {
            let batch = match store
                .scan_batch(state.cursor, &config.match_pattern, config.count)
                .await
            {
                Ok(batch) => batch,
                Err(source) => {
                    state.consecutive_errors += 1;
                    self.observer.batch_failed(&state, &source);

                    if state.consecutive_errors >= config.retry.max_consecutive_failures {
                        let err = ScanError::Fatal {
                            attempts: state.consecutive_errors,
                            cursor: state.cursor,
                            source,
                        };
                        self.observer.aborted(&err);
                        return Err(err);
                    }

                    sleep(config.retry.backoff).await;
                    continue;
                }
            };

            state.consecutive_errors = 0;
            state.round_keys += batch.len() as u64;
            counters.batches += 1;
            counters.keys_scanned += batch.len() as u64;
            self.observer.batch_fetched(&state, batch.next, batch.len());
            state.cursor = batch.next;

            for raw in &batch.unreadable {
                counters.skipped += 1;
                self.observer
                    .key_skipped(&String::from_utf8_lossy(raw), &SkipReason::UnreadableKey);
            }

            for key in batch.keys {
                if !filters.accepts_key(&key) {
                    counters.filtered += 1;
                    self.observer.key_filtered(&key, FilterStage::Key);
                    continue;
                }

                match fetcher.fetch(store, &key).await {
                    FetchOutcome::Accepted(record) => {
                        let signal = dispatcher.dispatch(handler, store, &record).await;
                        if signal == DispatchSignal::LimitReached {
                            return Ok(self.finish(StopReason::LimitReached, counters, &dispatcher));
                        }
                    }
                    FetchOutcome::Filtered(stage) => {
                        counters.filtered += 1;
                        self.observer.key_filtered(&key, stage);
                    }
                    FetchOutcome::Skipped(reason) => {
                        counters.skipped += 1;
                        self.observer.key_skipped(&key, &reason);
                    }
                }
            }

            if state.cursor.is_complete() {
                self.observer.round_completed(&state);
                counters.rounds_completed += 1;

                if config.max_rounds.is_some_and(|max| state.round >= max) {
                    return Ok(self.finish(StopReason::RoundsCompleted, counters, &dispatcher));
                }

                state.round += 1;
                state.round_keys = 0;
                state.cursor = Cursor::START;
                continue;
            }

            if let Some(wait) = config.wait {
                sleep(wait).await;
            }
        }
    }

    fn finish(&self, stop: StopReason, counters: Counters, dispatcher: &Dispatcher) -> ScanSummary {
        let summary = ScanSummary {
            stop,
            rounds_completed: counters.rounds_completed,
            batches: counters.batches,
            keys_scanned: counters.keys_scanned,
            handled: dispatcher.handled(),
            filtered: counters.filtered,
            skipped: counters.skipped,
        };
        self.observer.finished(&summary);
        summary
    }
}
