//! # rediscan-core
//!
//! Resumable, filtered iteration over the keyspace of a Redis server.
//!
//! ## Overview
//!
//! A scan walks the keyspace with `SCAN`, one batch at a time, and feeds every
//! key through a fixed filter pipeline before handing survivors to a
//! caller-supplied [`RecordHandler`]:
//!
//! - **Glob match**: pushed to the server as `SCAN ... MATCH`
//! - **Key regex**: evaluated locally before any per-key request
//! - **Value regex**: evaluated after `GET`, skipped when values are ignored
//! - **TTL range**: evaluated after `TTL`, only when a bound is configured
//!
//! Failed batches are retried at the same cursor with a fixed backoff. After
//! the configured number of consecutive failures the run ends with
//! [`ScanError::Fatal`], which the embedding binary turns into a non-zero
//! exit.
//!
//! ## Feature Flags
//!
//! - `test-utils`: exposes [`memory::MemoryStore`] for downstream tests
//! - `redis-e2e`: enables tests against a live server
//!
//! ## Examples
//!
//! ```no_run
//! use async_trait::async_trait;
//! use rediscan_core::{KeyStore, Record, RecordHandler, ScanOptions};
//!
//! struct PrintKeys;
//!
//! #[async_trait]
//! impl RecordHandler for PrintKeys {
//!     async fn handle(&self, _store: &dyn KeyStore, record: &Record) {
//!         println!("{}", record.key);
//!     }
//! }
//!
//! async fn print_sessions() -> Result<(), rediscan_core::ScanError> {
//!     let options = ScanOptions {
//!         match_pattern: "session:*".to_string(),
//!         ignore_value: true,
//!         ..Default::default()
//!     };
//!     let summary = rediscan_core::run(&options, &PrintKeys).await?;
//!     println!("handled {} keys", summary.handled);
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

/// Scan options and their validated form
pub mod config;
/// Handler port and handled-record budget
pub mod dispatcher;
/// Scan loop and run bookkeeping
pub mod engine;
/// Error types
pub mod error;
pub mod fetcher;
pub mod filter;
pub mod observer;
/// Redis-backed store
pub mod redis_store;
pub mod store;

#[cfg(any(test, feature = "test-utils"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-utils")))]
pub mod memory;

pub use config::{RetryPolicy, ScanConfig, ScanOptions};
pub use dispatcher::RecordHandler;
pub use engine::{ScanEngine, ScanState, ScanSummary, StopReason};
pub use error::{ScanError, StoreError};
pub use fetcher::Record;
pub use filter::{FilterSet, TtlRange};
pub use observer::{ScanObserver, TracingObserver};
pub use redis_store::RedisStore;
pub use store::{Cursor, KeyStore, KeyTtl, ScanBatch};

use tracing::info;

/// Validate `options`, connect, probe the server, then scan.
///
/// Configuration problems and connection failures are returned before the
/// first batch. Once scanning has started the only possible error is
/// [`ScanError::Fatal`].
pub async fn run(options: &ScanOptions, handler: &dyn RecordHandler) -> error::Result<ScanSummary> {
    run_with_observer(options, handler, &TracingObserver).await
}

/// [`run`] with a custom progress observer.
pub async fn run_with_observer(
    options: &ScanOptions,
    handler: &dyn RecordHandler,
    observer: &dyn ScanObserver,
) -> error::Result<ScanSummary> {
    let config = ScanConfig::from_options(options)?;

    let store = RedisStore::connect(&config.url).await?;
    store.ping().await.map_err(ScanError::Ping)?;
    info!(
        count = config.count,
        cursor = %config.start_cursor,
        pattern = %config.match_pattern,
        "connected, starting scan"
    );

    ScanEngine::new(&config)
        .with_observer(observer)
        .run(&store, handler)
        .await
}
