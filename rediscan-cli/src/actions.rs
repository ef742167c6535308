//! Record handlers behind `--cmd`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rediscan_core::{KeyStore, Record, RecordHandler};
use tracing::{error, info};

/// Whole seconds of a TTL, as printed in log lines.
pub fn ttl_seconds(ttl: Option<Duration>) -> Option<u64> {
    ttl.map(|ttl| ttl.as_secs())
}

/// Logs every record.
#[derive(Debug, Default)]
pub struct PrintAction {
    printed: AtomicU64,
}

impl PrintAction {
    /// Records printed so far.
    pub fn printed(&self) -> u64 {
        self.printed.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl RecordHandler for PrintAction {
    async fn handle(&self, _store: &dyn KeyStore, record: &Record) {
        let value = record.value_lossy();
        info!(key = %record.key, value = value.as_deref(), ttl = ttl_seconds(record.ttl), "print");
        self.printed.fetch_add(1, Ordering::Relaxed);
    }
}

/// Deletes every record, logging the outcome of each `DEL`.
#[derive(Debug, Default)]
pub struct DeleteAction {
    deleted: AtomicU64,
    failed: AtomicU64,
}

impl DeleteAction {
    /// Keys the store reported as removed.
    pub fn deleted(&self) -> u64 {
        self.deleted.load(Ordering::Relaxed)
    }

    /// `DEL` calls that errored.
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl RecordHandler for DeleteAction {
    async fn handle(&self, store: &dyn KeyStore, record: &Record) {
        let value = record.value_lossy();
        let ttl = ttl_seconds(record.ttl);

        match store.delete(&record.key).await {
            Ok(removed) => {
                self.deleted.fetch_add(removed, Ordering::Relaxed);
                info!(
                    key = %record.key,
                    value = value.as_deref(),
                    ttl,
                    result = removed,
                    "delete ok"
                );
            }
            Err(err) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                error!(
                    key = %record.key,
                    value = value.as_deref(),
                    ttl,
                    error = %err,
                    "delete error"
                );
            }
        }
    }
}
