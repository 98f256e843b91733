//! ThreadStore trait: persistence for threads and their messages.
//!
//! The store owns every thread. Callers read "the latest message of these
//! types" and delete consumed ephemeral entries; nothing else ever mutates
//! an existing row.

use async_trait::async_trait;
use crate::error::StoreError;
use crate::message::{MessageType, ThreadId, ThreadMessage};

/// The core ThreadStore trait.
///
/// Implementations: in-memory (tests, ephemeral runs) and SQLite.
#[async_trait]
pub trait ThreadStore: Send + Sync {
    /// The backend name (e.g., "sqlite", "in_memory").
    fn name(&self) -> &str;

    /// Create a new empty thread owned by `account_id`.
    async fn create_thread(&self, account_id: &str) -> Result<ThreadId, StoreError>;

    /// The account that owns a thread, if the thread exists.
    async fn account_id(&self, thread_id: &ThreadId) -> Result<Option<String>, StoreError>;

    /// Append a message. Returns the message ID.
    async fn append(&self, message: ThreadMessage) -> Result<String, StoreError>;

    /// The most recently created message whose type is one of `kinds`.
    ///
    /// Ties on `created_at` are broken by insertion order (later wins).
    async fn latest(
        &self,
        thread_id: &ThreadId,
        kinds: &[MessageType],
    ) -> Result<Option<ThreadMessage>, StoreError>;

    /// Delete a message by ID. Returns whether a row was removed.
    async fn delete(&self, message_id: &str) -> Result<bool, StoreError>;

    /// All messages of a thread, oldest first.
    async fn messages(&self, thread_id: &ThreadId) -> Result<Vec<ThreadMessage>, StoreError>;
}
