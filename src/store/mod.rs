//! Append-only alert event log: durable store plus a bounded recent cache.

use crate::clock;
use crate::errors::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

pub mod jsonl;

pub use jsonl::JsonlEventStore;

/// Most-recent entries kept in memory for the status boundary.
pub const RECENT_CACHE_CAP: usize = 500;

/// One alert occurrence, natural or manual. Created exactly once per alert
/// and immutable afterwards; `sequence` is assigned by the sink and is
/// strictly monotonic in insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertEvent {
    pub sequence: u64,
    /// Epoch seconds at alert time.
    pub timestamp: f64,
    /// Local wall-clock rendering of `timestamp`.
    pub readable: String,
    pub device: String,
    pub reason: String,
}

impl AlertEvent {
    pub fn new(device: &str, reason: &str, timestamp: f64) -> Self {
        Self {
            sequence: 0,
            timestamp,
            readable: clock::format_epoch(timestamp),
            device: device.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Durable persistence boundary. The schema/engine behind it is external;
/// implementations must return events most-recent first, ordered by
/// `sequence`.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn append(&self, event: &AlertEvent) -> Result<()>;

    /// At most `limit` events, most recent first.
    async fn fetch(&self, limit: usize) -> Result<Vec<AlertEvent>>;
}

/// In-memory store for tests and storeless deployments.
#[derive(Default)]
pub struct MemoryEventStore {
    events: RwLock<Vec<AlertEvent>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn append(&self, event: &AlertEvent) -> Result<()> {
        self.events.write().await.push(event.clone());
        Ok(())
    }

    async fn fetch(&self, limit: usize) -> Result<Vec<AlertEvent>> {
        let events = self.events.read().await;
        let mut out: Vec<AlertEvent> = events.clone();
        out.sort_by(|a, b| b.sequence.cmp(&a.sequence));
        out.truncate(limit);
        Ok(out)
    }
}

/// The single log abstraction callers see: a durable append plus a bounded
/// ring of recent entries. Readers never block the writer beyond the brief
/// cache lock; the durable append happens outside any lock shared with
/// readers.
pub struct LogSink {
    store: Arc<dyn EventStore>,
    cache: RwLock<VecDeque<AlertEvent>>,
    next_sequence: AtomicU64,
}

impl LogSink {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self {
            store,
            cache: RwLock::new(VecDeque::with_capacity(RECENT_CACHE_CAP)),
            next_sequence: AtomicU64::new(1),
        }
    }

    /// Appends to the recent cache and the durable store.
    ///
    /// A persistence failure is surfaced to the caller rather than silently
    /// swallowed, but the event is already in the cache by then, so the
    /// status boundary never loses an alert over a storage fault.
    pub async fn record(&self, mut event: AlertEvent) -> Result<()> {
        event.sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst);

        {
            let mut cache = self.cache.write().await;
            cache.push_back(event.clone());
            while cache.len() > RECENT_CACHE_CAP {
                cache.pop_front();
            }
        }

        self.store.append(&event).await
    }

    /// At most `limit` events, most recent first, from the durable store.
    pub async fn fetch(&self, limit: usize) -> Result<Vec<AlertEvent>> {
        self.store.fetch(limit).await
    }

    /// At most `limit` cached events, most recent first. Never touches the
    /// durable store.
    pub async fn recent(&self, limit: usize) -> Vec<AlertEvent> {
        let cache = self.cache.read().await;
        cache.iter().rev().take(limit).cloned().collect()
    }

    pub async fn cached_len(&self) -> usize {
        self.cache.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{BoxError, StoreError};

    struct FailingStore;

    #[async_trait]
    impl EventStore for FailingStore {
        async fn append(&self, _event: &AlertEvent) -> Result<()> {
            Err(StoreError::AppendFailed(BoxError::from("disk full")).into())
        }

        async fn fetch(&self, _limit: usize) -> Result<Vec<AlertEvent>> {
            Ok(Vec::new())
        }
    }

    fn event(reason: &str) -> AlertEvent {
        AlertEvent::new("camera-0", reason, 1_700_000_000.0)
    }

    #[tokio::test]
    async fn fetch_is_bounded_and_most_recent_first() {
        let sink = LogSink::new(Arc::new(MemoryEventStore::new()));
        for i in 0..30 {
            sink.record(event(&format!("r{}", i))).await.expect("record");
        }

        let fetched = sink.fetch(10).await.expect("fetch");
        assert_eq!(fetched.len(), 10);
        assert_eq!(fetched[0].reason, "r29");
        assert!(fetched.windows(2).all(|w| w[0].sequence > w[1].sequence));
    }

    #[tokio::test]
    async fn recent_cache_is_capped() {
        let sink = LogSink::new(Arc::new(MemoryEventStore::new()));
        for i in 0..(RECENT_CACHE_CAP + 20) {
            sink.record(event(&format!("r{}", i))).await.expect("record");
        }
        assert_eq!(sink.cached_len().await, RECENT_CACHE_CAP);

        let recent = sink.recent(20).await;
        assert_eq!(recent.len(), 20);
        assert_eq!(recent[0].reason, format!("r{}", RECENT_CACHE_CAP + 19));
    }

    #[tokio::test]
    async fn ordering_holds_under_concurrent_records() {
        let sink = Arc::new(LogSink::new(Arc::new(MemoryEventStore::new())));
        let mut handles = Vec::new();
        for worker in 0..8 {
            let sink = Arc::clone(&sink);
            handles.push(tokio::spawn(async move {
                for i in 0..25 {
                    sink.record(event(&format!("w{}-{}", worker, i)))
                        .await
                        .expect("record");
                }
            }));
        }
        for handle in handles {
            handle.await.expect("join");
        }

        let fetched = sink.fetch(1000).await.expect("fetch");
        assert_eq!(fetched.len(), 200);
        assert!(fetched.windows(2).all(|w| w[0].sequence > w[1].sequence));

        let top = sink.fetch(10).await.expect("fetch");
        assert_eq!(top.len(), 10);
    }

    #[tokio::test]
    async fn persistence_failure_surfaces_but_keeps_the_cache() {
        let sink = LogSink::new(Arc::new(FailingStore));
        let err = sink.record(event("r0")).await.expect_err("must surface");
        assert!(err.is_store());

        let recent = sink.recent(5).await;
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].reason, "r0");
    }
}
