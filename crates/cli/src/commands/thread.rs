//! `blinker thread`: Inspect stored threads.

use super::load_config;
use blinker_config::{StoreBackend, StoreConfig};
use blinker_core::error::StoreError;
use blinker_core::message::{ThreadId, ThreadMessage};
use blinker_core::thread::ThreadStore;
use blinker_store::{InMemoryThreadStore, SqliteThreadStore};
use std::sync::Arc;

/// Open the configured thread store.
pub async fn open_store(config: &StoreConfig) -> Result<Arc<dyn ThreadStore>, StoreError> {
    match config.backend {
        StoreBackend::Memory => Ok(Arc::new(InMemoryThreadStore::new())),
        StoreBackend::Sqlite => {
            let path = config.resolved_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| StoreError::Storage(e.to_string()))?;
            }
            let url = format!("sqlite://{}", path.display());
            Ok(Arc::new(SqliteThreadStore::new(&url).await?))
        }
    }
}

pub async fn show(thread_id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    if config.store.backend == StoreBackend::Memory {
        println!("The in-memory store keeps nothing between runs; set store.backend = \"sqlite\".");
        return Ok(());
    }

    let store = open_store(&config.store).await?;
    let thread_id = ThreadId::from(thread_id);
    let Some(account) = store.account_id(&thread_id).await? else {
        return Err(format!("Thread {thread_id} not found").into());
    };

    let messages = store.messages(&thread_id).await?;
    println!("Thread {thread_id} (account {account}, {} messages)", messages.len());
    for message in &messages {
        println!("{}", render(message));
    }
    Ok(())
}

fn render(message: &ThreadMessage) -> String {
    const PREVIEW: usize = 200;
    let content = message.content.replace('\n', " ");
    let preview = match content.char_indices().nth(PREVIEW) {
        Some((cut, _)) => format!("{}…", &content[..cut]),
        None => content,
    };
    format!(
        "  [{}] {:<13} {preview}",
        message.created_at.format("%Y-%m-%d %H:%M:%S"),
        message.kind.as_str()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn opens_sqlite_store_under_custom_path() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig {
            backend: StoreBackend::Sqlite,
            path: dir.path().join("nested/threads.db").display().to_string(),
        };

        let store = open_store(&config).await.unwrap();
        assert_eq!(store.name(), "sqlite");
        let thread = store.create_thread("acct").await.unwrap();
        assert_eq!(store.account_id(&thread).await.unwrap().as_deref(), Some("acct"));
    }

    #[test]
    fn render_truncates_long_content() {
        let thread = ThreadId::from("t1");
        let message = ThreadMessage::user(&thread, "x".repeat(500));
        let line = render(&message);
        assert!(line.contains("user"));
        assert!(line.ends_with('…'));
        assert!(line.len() < 300);
    }
}
