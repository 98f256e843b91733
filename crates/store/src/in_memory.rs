//! In-memory thread store: useful for testing and ephemeral runs.

use async_trait::async_trait;
use blinker_core::error::StoreError;
use blinker_core::message::{MessageType, ThreadId, ThreadMessage};
use blinker_core::thread::ThreadStore;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct State {
    /// thread id -> owning account
    threads: HashMap<String, String>,
    /// All messages in insertion order
    messages: Vec<ThreadMessage>,
}

/// A thread store that keeps everything in process memory.
pub struct InMemoryThreadStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryThreadStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(State::default())),
        }
    }

    /// Register a thread under a caller-chosen ID.
    pub async fn insert_thread(&self, thread_id: &ThreadId, account_id: &str) {
        self.state
            .write()
            .await
            .threads
            .insert(thread_id.0.clone(), account_id.to_string());
    }
}

impl Default for InMemoryThreadStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ThreadStore for InMemoryThreadStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn create_thread(&self, account_id: &str) -> Result<ThreadId, StoreError> {
        let thread_id = ThreadId::new();
        self.insert_thread(&thread_id, account_id).await;
        Ok(thread_id)
    }

    async fn account_id(&self, thread_id: &ThreadId) -> Result<Option<String>, StoreError> {
        Ok(self.state.read().await.threads.get(thread_id.as_str()).cloned())
    }

    async fn append(&self, message: ThreadMessage) -> Result<String, StoreError> {
        let mut state = self.state.write().await;
        if !state.threads.contains_key(message.thread_id.as_str()) {
            return Err(StoreError::ThreadNotFound(message.thread_id.0.clone()));
        }
        let id = message.id.clone();
        state.messages.push(message);
        Ok(id)
    }

    async fn latest(
        &self,
        thread_id: &ThreadId,
        kinds: &[MessageType],
    ) -> Result<Option<ThreadMessage>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .messages
            .iter()
            .enumerate()
            .filter(|(_, m)| m.thread_id == *thread_id && kinds.contains(&m.kind))
            .max_by_key(|(idx, m)| (m.created_at, *idx))
            .map(|(_, m)| m.clone()))
    }

    async fn delete(&self, message_id: &str) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        let len_before = state.messages.len();
        state.messages.retain(|m| m.id != message_id);
        Ok(state.messages.len() < len_before)
    }

    async fn messages(&self, thread_id: &ThreadId) -> Result<Vec<ThreadMessage>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .messages
            .iter()
            .filter(|m| m.thread_id == *thread_id)
            .cloned()
            .collect())
    }
}
