// In-memory event store
//
// Same contract as the Message DB adapter (per-stream positions, global
// ordering, the expected-version check) held in a map under an async lock.
// Backs the engine's test suite and standalone demos.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use chronicle_core::RecordedEvent;

use crate::store::{EventStore, ExpectedVersion, StoreError};

#[derive(Default)]
struct MemoryInner {
    streams: HashMap<String, Vec<RecordedEvent>>,
    next_global_position: i64,
}

/// Event store held entirely in memory.
#[derive(Default)]
pub struct InMemoryEventStore {
    inner: RwLock<MemoryInner>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of every stream that has at least one event.
    pub async fn stream_names(&self) -> Vec<String> {
        let inner = self.inner.read().await;
        let mut names: Vec<String> = inner.streams.keys().cloned().collect();
        names.sort();
        names
    }

    /// Total number of stored events across all streams.
    pub async fn event_count(&self) -> usize {
        let inner = self.inner.read().await;
        inner.streams.values().map(Vec::len).sum()
    }
}

fn category_of(stream_name: &str) -> &str {
    stream_name.split('-').next().unwrap_or(stream_name)
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(
        &self,
        stream: &str,
        kind: &str,
        data: Value,
        metadata: Value,
        expected_version: ExpectedVersion,
    ) -> Result<i64, StoreError> {
        let mut inner = self.inner.write().await;

        let current = inner
            .streams
            .get(stream)
            .and_then(|events| events.last())
            .map(|event| event.position);

        let conflict = match expected_version {
            ExpectedVersion::Any => false,
            ExpectedVersion::NoStream => current.is_some(),
            ExpectedVersion::Exact(version) => current != Some(version),
        };
        if conflict {
            return Err(StoreError::ConcurrencyConflict {
                stream: stream.to_string(),
                expected: expected_version,
                actual: current,
            });
        }

        let position = current.map(|p| p + 1).unwrap_or(0);
        let global_position = inner.next_global_position;
        inner.next_global_position += 1;

        inner
            .streams
            .entry(stream.to_string())
            .or_default()
            .push(RecordedEvent {
                id: Uuid::new_v4(),
                stream_name: stream.to_string(),
                kind: kind.to_string(),
                position,
                global_position,
                data,
                metadata,
                time: Utc::now(),
            });

        Ok(position)
    }

    async fn read(
        &self,
        stream: &str,
        from_position: i64,
        batch_size: i64,
    ) -> Result<Vec<RecordedEvent>, StoreError> {
        let inner = self.inner.read().await;
        let events = inner
            .streams
            .get(stream)
            .map(|events| {
                events
                    .iter()
                    .filter(|event| event.position >= from_position)
                    .take(batch_size.max(0) as usize)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(events)
    }

    async fn read_category(
        &self,
        category: &str,
        from_global_position: i64,
        batch_size: i64,
    ) -> Result<Vec<RecordedEvent>, StoreError> {
        let inner = self.inner.read().await;
        let mut events: Vec<RecordedEvent> = inner
            .streams
            .iter()
            .filter(|(name, _)| category_of(name) == category)
            .flat_map(|(_, events)| events.iter())
            .filter(|event| event.global_position >= from_global_position)
            .cloned()
            .collect();
        events.sort_by_key(|event| event.global_position);
        events.truncate(batch_size.max(0) as usize);
        Ok(events)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
