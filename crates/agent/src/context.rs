//! Ephemeral multimodal context for one model call.
//!
//! Tools leave `browser_state` and `image_context` entries on the thread.
//! Before each model call, the latest of each is turned into content blocks
//! of a one-shot user message and then deleted, whether or not it parsed.

use blinker_core::error::StoreError;
use blinker_core::message::{ContentBlock, MessageType, TemporaryMessage, ThreadId, ThreadMessage};
use blinker_core::thread::ThreadStore;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Fields of a browser state that never go into the text block.
const SCREENSHOT_FIELDS: [&str; 3] = ["screenshot_base64", "screenshot_url", "screenshot_url_base64"];

pub struct TemporaryContextBuilder {
    store: Arc<dyn ThreadStore>,
}

impl TemporaryContextBuilder {
    pub fn new(store: Arc<dyn ThreadStore>) -> Self {
        Self { store }
    }

    /// Build the one-shot message, consuming the entries it came from.
    ///
    /// Returns `None` when there is nothing to inject. Only store failures
    /// are errors; a malformed entry is logged, skipped, and still deleted.
    pub async fn build(&self, thread_id: &ThreadId) -> Result<Option<TemporaryMessage>, StoreError> {
        let mut blocks = Vec::new();

        if let Some(msg) = self.store.latest(thread_id, &[MessageType::BrowserState]).await? {
            match browser_state_blocks(&msg.content) {
                Ok(b) => blocks.extend(b),
                Err(e) => error!(message_id = %msg.id, "Error parsing browser state: {e}"),
            }
            self.discard(&msg).await;
        }

        if let Some(msg) = self.store.latest(thread_id, &[MessageType::ImageContext]).await? {
            match image_context_blocks(&msg.content) {
                Ok(b) => blocks.extend(b),
                Err(e) => error!(message_id = %msg.id, "Error parsing image context: {e}"),
            }
            self.discard(&msg).await;
        }

        if blocks.is_empty() {
            return Ok(None);
        }
        debug!(thread_id = %thread_id, blocks = blocks.len(), "Built temporary context");
        Ok(Some(TemporaryMessage::user(blocks)))
    }

    async fn discard(&self, msg: &ThreadMessage) {
        match self.store.delete(&msg.id).await {
            Ok(true) => {}
            Ok(false) => debug!(message_id = %msg.id, "Ephemeral message already gone"),
            Err(e) => warn!(message_id = %msg.id, "Failed to delete ephemeral message: {e}"),
        }
    }
}

fn parse_object(content: &str) -> Result<Map<String, Value>, String> {
    match serde_json::from_str::<Value>(content) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(format!("expected a JSON object, got {other}")),
        Err(e) => Err(e.to_string()),
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn browser_state_blocks(content: &str) -> Result<Vec<ContentBlock>, String> {
    let mut state = parse_object(content)?;
    let screenshot = state.get("screenshot_base64").and_then(Value::as_str).map(String::from);
    let screenshot_url = state.get("screenshot_url").and_then(Value::as_str).map(String::from);
    for field in SCREENSHOT_FIELDS {
        state.remove(field);
    }

    let mut blocks = Vec::new();
    if !state.is_empty() {
        let pretty = serde_json::to_string_pretty(&Value::Object(state)).map_err(|e| e.to_string())?;
        blocks.push(ContentBlock::text(format!(
            "The following is the current state of the browser:\n{pretty}"
        )));
    }

    match (
        screenshot.filter(|s| !s.is_empty()),
        screenshot_url.filter(|s| !s.is_empty()),
    ) {
        (Some(b64), _) => blocks.push(ContentBlock::inline_image("image/jpeg", &b64)),
        (None, Some(url)) => blocks.push(ContentBlock::image(url)),
        (None, None) => warn!("Browser state found but no screenshot base64 data."),
    }

    Ok(blocks)
}

fn image_context_blocks(content: &str) -> Result<Vec<ContentBlock>, String> {
    let image = parse_object(content)?;
    let file_path = non_empty_str(image.get("file_path")).unwrap_or("unknown file");

    match (non_empty_str(image.get("base64")), non_empty_str(image.get("mime_type"))) {
        (Some(data), Some(mime)) => Ok(vec![
            ContentBlock::text(format!("Here is the image you requested to see: '{file_path}'")),
            ContentBlock::inline_image(mime, data),
        ]),
        _ => {
            warn!("Image context found for '{file_path}' but missing base64 or mime_type.");
            Ok(vec![])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blinker_store::InMemoryThreadStore;
    use serde_json::json;

    async fn setup() -> (Arc<InMemoryThreadStore>, ThreadId, TemporaryContextBuilder) {
        let store = Arc::new(InMemoryThreadStore::new());
        let thread = store.create_thread("acct").await.unwrap();
        let builder = TemporaryContextBuilder::new(store.clone());
        (store, thread, builder)
    }

    fn texts(msg: &TemporaryMessage) -> Vec<&str> {
        msg.content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    fn image_urls(msg: &TemporaryMessage) -> Vec<&str> {
        msg.content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::ImageUrl { image_url } => Some(image_url.url.as_str()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn nothing_to_inject() {
        let (store, thread, builder) = setup().await;
        store.append(ThreadMessage::user(&thread, "hi")).await.unwrap();
        assert!(builder.build(&thread).await.unwrap().is_none());
        assert_eq!(store.messages(&thread).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn browser_state_strips_screenshot_fields() {
        let (store, thread, builder) = setup().await;
        store
            .append(ThreadMessage::browser_state(
                &thread,
                &json!({"screenshot_base64": "AAA", "mapX": 1}),
            ))
            .await
            .unwrap();

        let msg = builder.build(&thread).await.unwrap().unwrap();
        assert_eq!(msg.role, "user");

        let text = texts(&msg);
        assert_eq!(text.len(), 1);
        assert!(text[0].starts_with("The following is the current state of the browser:\n"));
        assert!(text[0].contains("mapX"));
        assert!(!text[0].contains("screenshot_base64"));

        assert_eq!(image_urls(&msg), vec!["data:image/jpeg;base64,AAA"]);
        assert!(store.messages(&thread).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn screenshot_only_state_has_no_text_block() {
        let (store, thread, builder) = setup().await;
        store
            .append(ThreadMessage::browser_state(
                &thread,
                &json!({"screenshot_base64": "QQ", "screenshot_url_base64": "x"}),
            ))
            .await
            .unwrap();

        let msg = builder.build(&thread).await.unwrap().unwrap();
        assert!(texts(&msg).is_empty());
        assert_eq!(msg.image_count(), 1);
    }

    #[tokio::test]
    async fn screenshot_url_is_used_without_base64() {
        let (store, thread, builder) = setup().await;
        store
            .append(ThreadMessage::browser_state(
                &thread,
                &json!({"url": "https://example.com", "screenshot_url": "https://cdn/shot.png"}),
            ))
            .await
            .unwrap();

        let msg = builder.build(&thread).await.unwrap().unwrap();
        assert_eq!(image_urls(&msg), vec!["https://cdn/shot.png"]);
        assert!(!texts(&msg)[0].contains("cdn/shot.png"));
    }

    #[tokio::test]
    async fn image_context_blocks_and_deletion() {
        let (store, thread, builder) = setup().await;
        store
            .append(ThreadMessage::image_context(&thread, "iVBOR", "image/png", "/workspace/chart.png"))
            .await
            .unwrap();

        let msg = builder.build(&thread).await.unwrap().unwrap();
        assert_eq!(
            texts(&msg),
            vec!["Here is the image you requested to see: '/workspace/chart.png'"]
        );
        assert_eq!(image_urls(&msg), vec!["data:image/png;base64,iVBOR"]);
        assert!(store.messages(&thread).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn image_context_missing_data_is_skipped_but_deleted() {
        let (store, thread, builder) = setup().await;
        let raw = ThreadMessage::new(
            &thread,
            MessageType::ImageContext,
            json!({"mime_type": "image/png"}).to_string(),
        );
        store.append(raw).await.unwrap();

        assert!(builder.build(&thread).await.unwrap().is_none());
        assert!(store.messages(&thread).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_entry_is_deleted() {
        let (store, thread, builder) = setup().await;
        store
            .append(ThreadMessage::new(&thread, MessageType::BrowserState, "not json"))
            .await
            .unwrap();
        store
            .append(ThreadMessage::image_context(&thread, "AA", "image/gif", "a.gif"))
            .await
            .unwrap();

        let msg = builder.build(&thread).await.unwrap().unwrap();
        assert_eq!(msg.image_count(), 1);
        assert!(store.messages(&thread).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn only_latest_entry_is_consumed() {
        let (store, thread, builder) = setup().await;
        let mut older = ThreadMessage::browser_state(&thread, &json!({"page": "old"}));
        older.created_at -= chrono::Duration::seconds(5);
        store.append(older).await.unwrap();
        store
            .append(ThreadMessage::browser_state(&thread, &json!({"page": "new"})))
            .await
            .unwrap();

        let msg = builder.build(&thread).await.unwrap().unwrap();
        assert!(texts(&msg)[0].contains("new"));
        let left = store.messages(&thread).await.unwrap();
        assert_eq!(left.len(), 1);
        assert!(left[0].content.contains("old"));
    }
}
