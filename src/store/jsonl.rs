//! Line-delimited JSON event store backed by `tokio::fs`.

use super::{AlertEvent, EventStore};
use crate::errors::{Result, StoreError};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

/// Stores one JSON-encoded [`AlertEvent`] per line, appended in order.
/// Malformed lines (partial writes, hand edits) are skipped on read.
pub struct JsonlEventStore {
    path: PathBuf,
}

impl JsonlEventStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl EventStore for JsonlEventStore {
    async fn append(&self, event: &AlertEvent) -> Result<()> {
        let mut line = serde_json::to_string(event)
            .map_err(|err| StoreError::Encode(Box::new(err)))?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|err| StoreError::AppendFailed(Box::new(err)))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|err| StoreError::AppendFailed(Box::new(err)))?;
        file.flush()
            .await
            .map_err(|err| StoreError::AppendFailed(Box::new(err)))?;
        Ok(())
    }

    async fn fetch(&self, limit: usize) -> Result<Vec<AlertEvent>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(StoreError::FetchFailed(Box::new(err)).into()),
        };

        let mut events = Vec::new();
        for line in raw.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<AlertEvent>(line) {
                Ok(event) => events.push(event),
                Err(err) => {
                    log::warn!("skipping malformed event line: {}", err);
                }
            }
        }

        events.sort_by(|a, b| b.sequence.cmp(&a.sequence));
        events.truncate(limit);
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "lens-vigil-{}-{}.jsonl",
            name,
            std::process::id()
        ))
    }

    #[tokio::test]
    async fn appends_and_fetches_most_recent_first() {
        let path = temp_path("append-fetch");
        let _ = tokio::fs::remove_file(&path).await;
        let store = JsonlEventStore::new(&path);

        for i in 1..=5u64 {
            let mut event = AlertEvent::new("camera-0", "Sustained obstruction", 1_700_000_000.0);
            event.sequence = i;
            store.append(&event).await.expect("append");
        }

        let fetched = store.fetch(3).await.expect("fetch");
        assert_eq!(fetched.len(), 3);
        assert_eq!(fetched[0].sequence, 5);
        assert_eq!(fetched[2].sequence, 3);

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn missing_file_reads_as_empty() {
        let path = temp_path("missing");
        let _ = tokio::fs::remove_file(&path).await;
        let store = JsonlEventStore::new(&path);

        let fetched = store.fetch(10).await.expect("fetch");
        assert!(fetched.is_empty());
    }

    #[tokio::test]
    async fn malformed_lines_are_skipped() {
        let path = temp_path("malformed");
        let _ = tokio::fs::remove_file(&path).await;
        let store = JsonlEventStore::new(&path);

        let mut event = AlertEvent::new("camera-0", "Sustained obstruction", 1_700_000_000.0);
        event.sequence = 1;
        store.append(&event).await.expect("append");
        tokio::fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .await
            .expect("open")
            .write_all(b"not json\n")
            .await
            .expect("write");

        let fetched = store.fetch(10).await.expect("fetch");
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].sequence, 1);

        let _ = tokio::fs::remove_file(&path).await;
    }
}
