//! SQLite thread store.
//!
//! Uses a single SQLite database file with two tables:
//! - `threads`: one row per thread with its owning account
//! - `messages`: every thread message, with an integer insertion counter
//!   used to break `created_at` ties

use async_trait::async_trait;
use blinker_core::error::StoreError;
use blinker_core::message::{MessageType, ThreadId, ThreadMessage};
use blinker_core::thread::ThreadStore;
use chrono::{SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

/// A persistent SQLite thread store.
pub struct SqliteThreadStore {
    pool: SqlitePool,
}

impl SqliteThreadStore {
    /// Open (or create) the database at `path`.
    ///
    /// Pass `"sqlite::memory:"` for an ephemeral database (useful for tests).
    pub async fn new(path: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| StoreError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("foreign_keys", "ON");

        // An in-memory database exists per connection, so keep exactly one.
        let max_connections = if path.contains(":memory:") { 1 } else { 4 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite thread store initialized at {path}");
        Ok(store)
    }

    /// Create from an existing pool.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS threads (
                thread_id   TEXT PRIMARY KEY NOT NULL,
                account_id  TEXT NOT NULL,
                created_at  TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("threads table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                iid         INTEGER PRIMARY KEY AUTOINCREMENT,
                id          TEXT UNIQUE NOT NULL,
                thread_id   TEXT NOT NULL REFERENCES threads(thread_id) ON DELETE CASCADE,
                type        TEXT NOT NULL,
                content     TEXT NOT NULL,
                created_at  TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("messages table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_messages_thread_created \
             ON messages(thread_id, created_at DESC, iid DESC)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("messages index: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    /// Fixed-width RFC 3339 so lexical order equals chronological order.
    fn timestamp(dt: &chrono::DateTime<Utc>) -> String {
        dt.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    fn row_to_message(row: &sqlx::sqlite::SqliteRow) -> Result<ThreadMessage, StoreError> {
        let id: String = row
            .try_get("id")
            .map_err(|e| StoreError::QueryFailed(format!("id column: {e}")))?;
        let thread_id: String = row
            .try_get("thread_id")
            .map_err(|e| StoreError::QueryFailed(format!("thread_id column: {e}")))?;
        let kind_str: String = row
            .try_get("type")
            .map_err(|e| StoreError::QueryFailed(format!("type column: {e}")))?;
        let content: String = row
            .try_get("content")
            .map_err(|e| StoreError::QueryFailed(format!("content column: {e}")))?;
        let created_at_str: String = row
            .try_get("created_at")
            .map_err(|e| StoreError::QueryFailed(format!("created_at column: {e}")))?;

        let kind = MessageType::parse(&kind_str)
            .ok_or_else(|| StoreError::QueryFailed(format!("unknown message type '{kind_str}'")))?;

        let created_at = chrono::DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| StoreError::QueryFailed(format!("created_at '{created_at_str}': {e}")))?;

        Ok(ThreadMessage {
            id,
            thread_id: ThreadId(thread_id),
            kind,
            content,
            created_at,
        })
    }
}

#[async_trait]
impl ThreadStore for SqliteThreadStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn create_thread(&self, account_id: &str) -> Result<ThreadId, StoreError> {
        let thread_id = ThreadId::new();
        sqlx::query("INSERT INTO threads (thread_id, account_id, created_at) VALUES (?1, ?2, ?3)")
            .bind(thread_id.as_str())
            .bind(account_id)
            .bind(Self::timestamp(&Utc::now()))
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("INSERT thread failed: {e}")))?;

        debug!(thread_id = %thread_id, account_id, "Created thread");
        Ok(thread_id)
    }

    async fn account_id(&self, thread_id: &ThreadId) -> Result<Option<String>, StoreError> {
        let row = sqlx::query("SELECT account_id FROM threads WHERE thread_id = ?1")
            .bind(thread_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("account lookup: {e}")))?;

        row.map(|r| {
            r.try_get::<String, _>("account_id")
                .map_err(|e| StoreError::QueryFailed(format!("account_id column: {e}")))
        })
        .transpose()
    }

    async fn append(&self, message: ThreadMessage) -> Result<String, StoreError> {
        let exists = sqlx::query("SELECT 1 FROM threads WHERE thread_id = ?1")
            .bind(message.thread_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("thread lookup: {e}")))?;
        if exists.is_none() {
            return Err(StoreError::ThreadNotFound(message.thread_id.0.clone()));
        }

        sqlx::query(
            "INSERT INTO messages (id, thread_id, type, content, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&message.id)
        .bind(message.thread_id.as_str())
        .bind(message.kind.as_str())
        .bind(&message.content)
        .bind(Self::timestamp(&message.created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("INSERT message failed: {e}")))?;

        debug!(message_id = %message.id, kind = %message.kind, "Appended message");
        Ok(message.id)
    }

    async fn latest(
        &self,
        thread_id: &ThreadId,
        kinds: &[MessageType],
    ) -> Result<Option<ThreadMessage>, StoreError> {
        if kinds.is_empty() {
            return Ok(None);
        }

        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT * FROM messages WHERE thread_id = ");
        builder.push_bind(thread_id.as_str());
        builder.push(" AND type IN (");
        let mut separated = builder.separated(", ");
        for kind in kinds {
            separated.push_bind(kind.as_str());
        }
        separated.push_unseparated(") ORDER BY created_at DESC, iid DESC LIMIT 1");

        let row = builder
            .build()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("latest message: {e}")))?;

        row.as_ref().map(Self::row_to_message).transpose()
    }

    async fn delete(&self, message_id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM messages WHERE id = ?1")
            .bind(message_id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("DELETE failed: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    async fn messages(&self, thread_id: &ThreadId) -> Result<Vec<ThreadMessage>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM messages WHERE thread_id = ?1 ORDER BY created_at ASC, iid ASC",
        )
        .bind(thread_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("thread messages: {e}")))?;

        rows.iter().map(Self::row_to_message).collect()
    }
}
