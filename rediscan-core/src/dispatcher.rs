use async_trait::async_trait;

use crate::fetcher::Record;
use crate::store::KeyStore;

/// Action applied to every record that survives the filters.
///
/// Handlers own their failures: a delete that errors should log and return,
/// the engine keeps scanning regardless.
#[async_trait]
pub trait RecordHandler: Send + Sync {
    /// Act on one accepted record.
    async fn handle(&self, store: &dyn KeyStore, record: &Record);
}

/// Whether the engine may keep going after a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchSignal {
    /// Budget left, keep scanning.
    Continue,
    /// Budget spent, stop the run.
    LimitReached,
}

/// Invokes the handler and enforces the handled-record budget.
#[derive(Debug, Clone, Copy)]
pub struct Dispatcher {
    limit: Option<u64>,
    handled: u64,
}

impl Dispatcher {
    /// Dispatcher with an optional positive budget.
    pub fn new(limit: Option<u64>) -> Self {
        Self { limit, handled: 0 }
    }

    /// Records handed to the handler so far.
    pub fn handled(&self) -> u64 {
        self.handled
    }

    /// True once a positive limit has been met; no further dispatch happens.
    pub fn is_exhausted(&self) -> bool {
        self.limit.is_some_and(|limit| self.handled >= limit)
    }

    /// Hand `record` to `handler` unless the budget is already spent.
    pub async fn dispatch(
        &mut self,
        handler: &dyn RecordHandler,
        store: &dyn KeyStore,
        record: &Record,
    ) -> DispatchSignal {
        if self.is_exhausted() {
            return DispatchSignal::LimitReached;
        }

        handler.handle(store, record).await;
        self.handled += 1;

        if self.is_exhausted() {
            DispatchSignal::LimitReached
        } else {
            DispatchSignal::Continue
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::store::MockKeyStore;

    #[derive(Debug, Default)]
    struct Collect(Mutex<Vec<String>>);

    #[async_trait]
    impl RecordHandler for Collect {
        async fn handle(&self, _store: &dyn KeyStore, record: &Record) {
            self.0.lock().unwrap().push(record.key.clone());
        }
    }

    #[tokio::test]
    async fn limit_stops_dispatch_at_the_budget() {
        let store = MockKeyStore::new();
        let handler = Collect::default();
        let mut dispatcher = Dispatcher::new(Some(2));

        let first = dispatcher
            .dispatch(&handler, &store, &Record::new("a"))
            .await;
        let second = dispatcher
            .dispatch(&handler, &store, &Record::new("b"))
            .await;
        let third = dispatcher
            .dispatch(&handler, &store, &Record::new("c"))
            .await;

        assert_eq!(first, DispatchSignal::Continue);
        assert_eq!(second, DispatchSignal::LimitReached);
        assert_eq!(third, DispatchSignal::LimitReached);
        assert_eq!(dispatcher.handled(), 2);
        assert_eq!(*handler.0.lock().unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn no_limit_never_exhausts() {
        let store = MockKeyStore::new();
        let handler = Collect::default();
        let mut dispatcher = Dispatcher::new(None);

        for n in 0..50 {
            let signal = dispatcher
                .dispatch(&handler, &store, &Record::new(n.to_string()))
                .await;
            assert_eq!(signal, DispatchSignal::Continue);
        }
        assert_eq!(dispatcher.handled(), 50);
        assert!(!dispatcher.is_exhausted());
    }
}
