// Stream cursor
//
// One processing pass is the stream's single writer, and the cursor is how
// it proves that to the store: every append carries the last position this
// pass has observed, so a competing writer turns into a
// `ConcurrencyConflict` instead of an interleaved stream.

use serde_json::Value;

use chronicle_core::event::AgentEvent;
use chronicle_core::StreamName;
use chronicle_store::{EventStore, ExpectedVersion, StoreError};

use crate::error::EngineError;

/// Append position tracking for a single pass over one stream.
pub struct StreamCursor {
    stream: StreamName,
    version: i64,
}

impl StreamCursor {
    /// A cursor positioned at the given last-observed position (-1 for an
    /// empty stream).
    pub fn at(stream: StreamName, version: i64) -> Self {
        Self { stream, version }
    }

    pub fn stream(&self) -> &StreamName {
        &self.stream
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    /// Re-sync after reading more of the stream.
    pub fn observe(&mut self, position: i64) {
        self.version = self.version.max(position);
    }

    fn expected(&self) -> ExpectedVersion {
        if self.version < 0 {
            ExpectedVersion::NoStream
        } else {
            ExpectedVersion::Exact(self.version)
        }
    }

    /// Append a typed payload with this pass's expected version, advancing
    /// the cursor on success.
    pub async fn append(
        &mut self,
        store: &dyn EventStore,
        payload: &AgentEvent,
        metadata: Value,
    ) -> Result<i64, EngineError> {
        let data = payload.to_data().map_err(EngineError::Event)?;
        let position = store
            .append(
                &self.stream.to_string(),
                payload.kind(),
                data,
                metadata,
                self.expected(),
            )
            .await?;
        self.version = position;
        Ok(position)
    }
}

/// Fetch a stream end-to-end and return a cursor at its head.
pub async fn read_to_head(
    store: &dyn EventStore,
    stream: &StreamName,
) -> Result<(Vec<chronicle_core::RecordedEvent>, StreamCursor), StoreError> {
    let events = store.read_all(&stream.to_string(), 0).await?;
    let version = events.last().map(|event| event.position).unwrap_or(-1);
    Ok((events, StreamCursor::at(stream.clone(), version)))
}
