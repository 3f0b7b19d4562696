// EventStore trait
//
// Contract shared by the Message DB adapter and the in-memory store. Appends
// are single-event and guarded by an optimistic-concurrency check; reads are
// batched and strictly ordered by per-stream position.

use async_trait::async_trait;
use serde_json::Value;

use chronicle_core::RecordedEvent;

/// Default read batch size, matching Message DB's own default.
pub const DEFAULT_BATCH_SIZE: i64 = 1000;

/// The stream version a writer expects to observe at append time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// No check; append unconditionally.
    Any,
    /// The stream must not exist yet.
    NoStream,
    /// The last written position must be exactly this.
    Exact(i64),
}

impl ExpectedVersion {
    /// Message DB's wire encoding: NULL for no check, -1 for "no stream",
    /// otherwise the expected last position.
    pub fn as_message_db(&self) -> Option<i64> {
        match self {
            Self::Any => None,
            Self::NoStream => Some(-1),
            Self::Exact(version) => Some(*version),
        }
    }
}

impl std::fmt::Display for ExpectedVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Any => write!(f, "any"),
            Self::NoStream => write!(f, "no-stream"),
            Self::Exact(version) => write!(f, "{version}"),
        }
    }
}

/// Error from a store operation.
///
/// `ConcurrencyConflict` is an expected outcome under concurrent writers and
/// must stay distinguishable from real failures; everything else is opaque
/// to callers.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("concurrency conflict on stream '{stream}': expected version {expected}, stream is at {actual:?}")]
    ConcurrencyConflict {
        stream: String,
        expected: ExpectedVersion,
        actual: Option<i64>,
    },

    #[error("database error: {0}")]
    Database(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict { .. })
    }
}

/// Append-only, per-stream ordered event log.
///
/// Implementations must be safe to share across tasks; every operation is a
/// single round trip with its own transaction.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Append one event, returning its per-stream position.
    async fn append(
        &self,
        stream: &str,
        kind: &str,
        data: Value,
        metadata: Value,
        expected_version: ExpectedVersion,
    ) -> Result<i64, StoreError>;

    /// Read events at or after `from_position`, ascending, at most
    /// `batch_size` of them.
    async fn read(
        &self,
        stream: &str,
        from_position: i64,
        batch_size: i64,
    ) -> Result<Vec<RecordedEvent>, StoreError>;

    /// Read events across every stream in a category (the part of the stream
    /// name before the first '-'), ordered by global position.
    async fn read_category(
        &self,
        category: &str,
        from_global_position: i64,
        batch_size: i64,
    ) -> Result<Vec<RecordedEvent>, StoreError>;

    /// Liveness check against the backing store.
    async fn health_check(&self) -> Result<(), StoreError>;

    /// Read a stream to its current end, batching as needed.
    async fn read_all(&self, stream: &str, from_position: i64) -> Result<Vec<RecordedEvent>, StoreError> {
        let mut events = Vec::new();
        let mut position = from_position;
        loop {
            let batch = self.read(stream, position, DEFAULT_BATCH_SIZE).await?;
            let batch_len = batch.len() as i64;
            if let Some(last) = batch.last() {
                position = last.position + 1;
            }
            events.extend(batch);
            if batch_len < DEFAULT_BATCH_SIZE {
                return Ok(events);
            }
        }
    }
}
