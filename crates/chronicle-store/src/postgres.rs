// Message DB adapter
//
// Message DB exposes the log through stored functions: `write_message` for
// appends (which enforces the expected-version check and raises on a
// mismatch) and `get_stream_messages` / `get_category_messages` for reads.
// Every operation runs in its own transaction and commits explicitly, since
// `write_message` takes an advisory lock on the stream that is only released
// at commit.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::{debug, error, instrument};
use uuid::Uuid;

use chronicle_core::RecordedEvent;

use crate::config::StoreConfig;
use crate::store::{EventStore, ExpectedVersion, StoreError};

/// Event store backed by Message DB over a pooled Postgres connection.
#[derive(Clone)]
pub struct MessageDbStore {
    pool: PgPool,
}

impl MessageDbStore {
    /// Wrap an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a new pool from configuration.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .min_connections(config.min_connections)
            .max_connections(config.max_connections)
            .connect(&config.connection_url())
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        debug!(
            host = %config.host,
            database = %config.database,
            "connected to Message DB"
        );
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn row_to_event(row: &sqlx::postgres::PgRow) -> Result<RecordedEvent, StoreError> {
        let id: String = row.get("id");
        let id = Uuid::parse_str(&id)
            .map_err(|e| StoreError::Serialization(format!("bad event id '{id}': {e}")))?;

        let data_raw: Option<String> = row.get("data");
        let data: Value = match data_raw {
            Some(text) => serde_json::from_str(&text)
                .map_err(|e| StoreError::Serialization(format!("bad event data: {e}")))?,
            None => Value::Null,
        };

        let metadata_raw: Option<String> = row.get("metadata");
        let metadata: Value = match metadata_raw {
            Some(text) => serde_json::from_str(&text)
                .map_err(|e| StoreError::Serialization(format!("bad event metadata: {e}")))?,
            None => Value::Object(serde_json::Map::new()),
        };

        // Message DB stores `time` as a naive timestamp in UTC.
        let time: chrono::NaiveDateTime = row.get("time");
        let time = DateTime::<Utc>::from_naive_utc_and_offset(time, Utc);

        Ok(RecordedEvent {
            id,
            stream_name: row.get("stream_name"),
            kind: row.get("type"),
            position: row.get("position"),
            global_position: row.get("global_position"),
            data,
            metadata,
            time,
        })
    }

    fn map_write_error(stream: &str, expected: ExpectedVersion, err: sqlx::Error) -> StoreError {
        if let sqlx::Error::Database(db_err) = &err {
            let message = db_err.message();
            if message.contains("Wrong expected version") {
                // Message DB reports the actual version in the error text:
                // "Wrong expected version: N (Stream: ..., Stream Version: M)"
                let actual = message
                    .split("Stream Version:")
                    .nth(1)
                    .and_then(|tail| tail.trim().trim_end_matches(')').trim().parse::<i64>().ok());
                return StoreError::ConcurrencyConflict {
                    stream: stream.to_string(),
                    expected,
                    actual,
                };
            }
        }
        StoreError::Database(err.to_string())
    }
}

#[async_trait::async_trait]
impl EventStore for MessageDbStore {
    #[instrument(skip(self, data, metadata), fields(%expected_version))]
    async fn append(
        &self,
        stream: &str,
        kind: &str,
        data: Value,
        metadata: Value,
        expected_version: ExpectedVersion,
    ) -> Result<i64, StoreError> {
        let event_id = Uuid::new_v4();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let position: i64 = sqlx::query_scalar(
            r#"
            SELECT write_message($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(event_id.to_string())
        .bind(stream)
        .bind(kind)
        .bind(&data)
        .bind(&metadata)
        .bind(expected_version.as_message_db())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| Self::map_write_error(stream, expected_version, e))?;

        tx.commit()
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        debug!(%stream, kind, position, "event written");
        Ok(position)
    }

    #[instrument(skip(self))]
    async fn read(
        &self,
        stream: &str,
        from_position: i64,
        batch_size: i64,
    ) -> Result<Vec<RecordedEvent>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, stream_name, type, position, global_position,
                   data, metadata, time
            FROM get_stream_messages($1, $2, $3)
            "#,
        )
        .bind(stream)
        .bind(from_position)
        .bind(batch_size)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!(%stream, "failed to read stream: {e}");
            StoreError::Database(e.to_string())
        })?;

        let mut events = Vec::with_capacity(rows.len());
        for row in &rows {
            events.push(Self::row_to_event(row)?);
        }

        debug!(%stream, count = events.len(), "read stream events");
        Ok(events)
    }

    #[instrument(skip(self))]
    async fn read_category(
        &self,
        category: &str,
        from_global_position: i64,
        batch_size: i64,
    ) -> Result<Vec<RecordedEvent>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, stream_name, type, position, global_position,
                   data, metadata, time
            FROM get_category_messages($1, $2, $3)
            "#,
        )
        .bind(category)
        .bind(from_global_position)
        .bind(batch_size)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!(%category, "failed to read category: {e}");
            StoreError::Database(e.to_string())
        })?;

        let mut events = Vec::with_capacity(rows.len());
        for row in &rows {
            events.push(Self::row_to_event(row)?);
        }
        Ok(events)
    }

    /// Verifies connectivity and that the Message DB functions are actually
    /// installed, not just that Postgres answers.
    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), StoreError> {
        let has_write_message: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM pg_proc WHERE proname = 'write_message'
            )
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        if !has_write_message {
            return Err(StoreError::Database(
                "write_message function not found; is Message DB installed?".to_string(),
            ));
        }
        Ok(())
    }
}

impl std::fmt::Debug for MessageDbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageDbStore").finish_non_exhaustive()
    }
}
