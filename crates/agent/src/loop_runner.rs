//! The agent run loop.

use crate::context::TemporaryContextBuilder;
use crate::stop::StopConditionDetector;
use crate::stream_event::AgentEvent;
use async_stream::stream;
use blinker_core::agent::{AgentConfig, AgentRunState};
use blinker_core::billing::BillingGate;
use blinker_core::message::{MessageType, ThreadId};
use blinker_core::provider::{Provider, ProviderRequest, StreamChunk};
use blinker_core::thread::ThreadStore;
use blinker_core::tool::ToolRegistry;
use futures::{Stream, StreamExt};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Output budget for Sonnet-family models when none is configured.
const SONNET_MAX_TOKENS: u32 = 64_000;

/// Drives repeated model turns against one thread until the agent ends its
/// turn, the thread already ends on an assistant message, billing stops it,
/// or the iteration cap is hit.
pub struct AgentLoop {
    /// The model-invocation layer
    provider: Arc<dyn Provider>,

    /// Where the thread lives
    store: Arc<dyn ThreadStore>,

    /// Checked before every iteration
    billing: Arc<dyn BillingGate>,

    /// Handed to the provider on every request
    tools: Arc<ToolRegistry>,

    context: TemporaryContextBuilder,

    config: AgentConfig,
}

impl AgentLoop {
    pub fn new(
        provider: Arc<dyn Provider>,
        store: Arc<dyn ThreadStore>,
        billing: Arc<dyn BillingGate>,
        config: AgentConfig,
    ) -> Self {
        Self {
            provider,
            context: TemporaryContextBuilder::new(store.clone()),
            store,
            billing,
            tools: Arc::new(ToolRegistry::new()),
            config,
        }
    }

    /// Set the tools the model may call.
    pub fn with_tools(mut self, tools: Arc<ToolRegistry>) -> Self {
        self.tools = tools;
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Run the agent on a thread.
    ///
    /// The returned stream is lazy: nothing happens until it is polled, and
    /// dropping it cancels the run along with any in-flight model stream.
    /// Provider chunks are forwarded unchanged; the loop adds a single
    /// `status` event when it ends on a billing stop or a failure.
    pub fn run(&self, thread_id: ThreadId) -> impl Stream<Item = AgentEvent> + Send + '_ {
        stream! {
            info!(thread_id = %thread_id, model = %self.config.model, "Starting agent run");

            let account_id = match self.store.account_id(&thread_id).await {
                Ok(Some(account_id)) => account_id,
                Ok(None) => {
                    error!(thread_id = %thread_id, "No account found for thread");
                    yield AgentEvent::error(format!("No account found for thread {thread_id}"));
                    return;
                }
                Err(e) => {
                    error!(thread_id = %thread_id, "Account lookup failed: {e}");
                    yield AgentEvent::error(e.to_string());
                    return;
                }
            };

            let max_iterations = self.config.max_iterations;
            let mut state = AgentRunState::new();

            while state.should_continue(max_iterations) {
                debug!(
                    thread_id = %thread_id,
                    iteration = state.iteration_count + 1,
                    max_iterations,
                    "Agent loop iteration"
                );

                match self.billing.check(&account_id).await {
                    Ok(status) if !status.can_run => {
                        info!(thread_id = %thread_id, "Billing limit reached: {}", status.message);
                        yield AgentEvent::stopped(format!("Billing limit reached: {}", status.message));
                        return;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!(thread_id = %thread_id, "Billing check failed: {e}");
                        yield AgentEvent::error(e.to_string());
                        return;
                    }
                }

                match self.store.latest(&thread_id, &MessageType::CONVERSATIONAL).await {
                    Ok(Some(last)) if last.kind == MessageType::Assistant => {
                        info!(thread_id = %thread_id, "Last message is from the assistant, stopping");
                        state.halt();
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!(thread_id = %thread_id, "Failed to read latest message: {e}");
                        yield AgentEvent::error(e.to_string());
                        return;
                    }
                }

                let temporary_message = match self.context.build(&thread_id).await {
                    Ok(message) => message,
                    Err(e) => {
                        error!(thread_id = %thread_id, "Failed to build temporary context: {e}");
                        yield AgentEvent::error(e.to_string());
                        return;
                    }
                };

                let request = ProviderRequest {
                    thread_id: thread_id.clone(),
                    model: self.config.model.clone(),
                    temperature: self.config.temperature,
                    max_tokens: effective_max_tokens(&self.config),
                    temporary_message,
                    tools: self.tools.clone(),
                };

                let mut chunks = match self.provider.run_thread(request).await {
                    Ok(chunks) => chunks,
                    Err(e) => {
                        error!(thread_id = %thread_id, provider = self.provider.name(), "Provider failed: {e}");
                        yield AgentEvent::error(e.to_string());
                        return;
                    }
                };

                let mut detector = StopConditionDetector::new();
                let mut terminal = None;
                while let Some(chunk) = chunks.next().await {
                    let failed = is_error_status(&chunk);
                    if terminal.is_none() {
                        terminal = detector.observe(&chunk);
                    }
                    yield AgentEvent::from(chunk);
                    if failed {
                        warn!(thread_id = %thread_id, "Provider reported an error, ending run");
                        return;
                    }
                }

                state.finish_iteration(terminal);
            }

            if state.continue_execution && state.iteration_count >= max_iterations {
                info!(thread_id = %thread_id, max_iterations, "Iteration cap reached");
            }
            debug!(
                thread_id = %thread_id,
                iterations = state.iteration_count,
                terminal = ?state.last_terminal_action,
                "Agent run finished"
            );
        }
    }
}

fn effective_max_tokens(config: &AgentConfig) -> Option<u32> {
    config.max_tokens.or_else(|| {
        config
            .model
            .to_lowercase()
            .contains("sonnet")
            .then_some(SONNET_MAX_TOKENS)
    })
}

/// A `status` chunk whose payload says `"status": "error"`.
fn is_error_status(chunk: &StreamChunk) -> bool {
    if chunk.kind != "status" {
        return false;
    }
    let parsed;
    let payload = match &chunk.content {
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(v) => {
                parsed = v;
                &parsed
            }
            Err(_) => return false,
        },
        other => other,
    };
    payload.get("status").and_then(Value::as_str) == Some("error")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::{Suspended, Unmetered};
    use crate::stream_event::RunStatus;
    use async_trait::async_trait;
    use blinker_core::billing::BillingStatus;
    use blinker_core::error::{BillingError, ProviderError};
    use blinker_core::message::{ContentBlock, ThreadMessage};
    use blinker_core::provider::ChunkStream;
    use blinker_store::InMemoryThreadStore;
    use serde_json::json;
    use std::sync::Mutex;

    /// Replays one script per call, repeating the last one when it runs out.
    struct ScriptedProvider {
        scripts: Mutex<Vec<Result<Vec<StreamChunk>, ProviderError>>>,
        requests: Mutex<Vec<ProviderRequest>>,
    }

    impl ScriptedProvider {
        fn new(scripts: Vec<Result<Vec<StreamChunk>, ProviderError>>) -> Arc<Self> {
            Arc::new(Self {
                scripts: Mutex::new(scripts),
                requests: Mutex::new(vec![]),
            })
        }

        fn replying(text: &str) -> Arc<Self> {
            Self::new(vec![Ok(vec![StreamChunk::assistant_text(text)])])
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn run_thread(&self, request: ProviderRequest) -> Result<ChunkStream, ProviderError> {
            self.requests.lock().unwrap().push(request);
            let mut scripts = self.scripts.lock().unwrap();
            let next = if scripts.len() > 1 {
                scripts.remove(0)
            } else {
                scripts[0].clone()
            };
            next.map(|chunks| futures::stream::iter(chunks).boxed())
        }
    }

    /// Allows the first `allowed` checks, then denies.
    struct CountdownGate {
        allowed: Mutex<u32>,
    }

    #[async_trait]
    impl BillingGate for CountdownGate {
        async fn check(&self, _account_id: &str) -> Result<BillingStatus, BillingError> {
            let mut left = self.allowed.lock().unwrap();
            if *left == 0 {
                return Ok(BillingStatus::denied("out of credits"));
            }
            *left -= 1;
            Ok(BillingStatus::allowed("ok"))
        }
    }

    struct BrokenGate;

    #[async_trait]
    impl BillingGate for BrokenGate {
        async fn check(&self, _account_id: &str) -> Result<BillingStatus, BillingError> {
            Err(BillingError::Unavailable("connection refused".into()))
        }
    }

    async fn thread_with_user_message() -> (Arc<InMemoryThreadStore>, ThreadId) {
        let store = Arc::new(InMemoryThreadStore::new());
        let thread = store.create_thread("acct").await.unwrap();
        store.append(ThreadMessage::user(&thread, "go")).await.unwrap();
        (store, thread)
    }

    fn config(max_iterations: u32) -> AgentConfig {
        AgentConfig {
            model: "test-model".into(),
            max_iterations,
            ..AgentConfig::default()
        }
    }

    async fn collect(agent: &AgentLoop, thread: ThreadId) -> Vec<AgentEvent> {
        agent.run(thread).collect().await
    }

    #[tokio::test]
    async fn assistant_last_means_no_invocation() {
        let (store, thread) = thread_with_user_message().await;
        store.append(ThreadMessage::assistant(&thread, "done")).await.unwrap();
        let provider = ScriptedProvider::replying("hi");

        let agent = AgentLoop::new(provider.clone(), store, Arc::new(Unmetered), config(5));
        let events = collect(&agent, thread).await;

        assert!(events.is_empty());
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn runs_exactly_max_iterations_without_marker() {
        let (store, thread) = thread_with_user_message().await;
        let provider = ScriptedProvider::replying("still thinking");

        let agent = AgentLoop::new(provider.clone(), store, Arc::new(Unmetered), config(3));
        let events = collect(&agent, thread).await;

        assert_eq!(provider.calls(), 3);
        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|e| e.status().is_none()));
    }

    #[tokio::test]
    async fn terminal_marker_stops_after_one_iteration() {
        let (store, thread) = thread_with_user_message().await;
        let provider = ScriptedProvider::new(vec![Ok(vec![
            StreamChunk::assistant_text("Finished the task."),
            StreamChunk::assistant_text("<complete></complete>"),
            StreamChunk::new("status", json!({"status_type": "finish"})),
        ])]);

        let agent = AgentLoop::new(provider.clone(), store, Arc::new(Unmetered), config(10));
        let events = collect(&agent, thread).await;

        assert_eq!(provider.calls(), 1);
        assert_eq!(events.len(), 3, "chunks after the marker are still forwarded");
    }

    #[tokio::test]
    async fn malformed_assistant_json_does_not_abort_the_run() {
        let (store, thread) = thread_with_user_message().await;
        let provider = ScriptedProvider::new(vec![
            Ok(vec![
                StreamChunk::new("assistant", json!("{bad")),
                StreamChunk::assistant_text("recovered"),
            ]),
            Ok(vec![StreamChunk::assistant_text("All done. <complete></complete>")]),
        ]);

        let agent = AgentLoop::new(provider.clone(), store, Arc::new(Unmetered), config(10));
        let events = collect(&agent, thread).await;

        assert_eq!(provider.calls(), 2);
        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|e| e.status().is_none()));
        assert_eq!(serde_json::to_value(&events[0]).unwrap()["content"], "{bad");
    }

    #[tokio::test]
    async fn ask_ends_the_run() {
        let (store, thread) = thread_with_user_message().await;
        let provider = ScriptedProvider::new(vec![
            Ok(vec![StreamChunk::assistant_text("checking")]),
            Ok(vec![StreamChunk::assistant_text("Which one? </ask>")]),
        ]);

        let agent = AgentLoop::new(provider.clone(), store, Arc::new(Unmetered), config(10));
        collect(&agent, thread).await;
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn ephemeral_context_injected_once_and_deleted() {
        let (store, thread) = thread_with_user_message().await;
        store
            .append(ThreadMessage::browser_state(&thread, &json!({"url": "https://a.b", "screenshot_base64": "AAA"})))
            .await
            .unwrap();
        store
            .append(ThreadMessage::image_context(&thread, "iVBOR", "image/png", "plot.png"))
            .await
            .unwrap();
        let provider = ScriptedProvider::replying("looking");

        let agent = AgentLoop::new(provider.clone(), store.clone(), Arc::new(Unmetered), config(2));
        collect(&agent, thread.clone()).await;

        let requests = provider.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);

        let first = requests[0].temporary_message.as_ref().unwrap();
        assert_eq!(first.role, "user");
        assert_eq!(first.image_count(), 2);
        assert!(first.content.iter().any(|b| matches!(
            b,
            ContentBlock::Text { text } if text.contains("https://a.b")
        )));
        assert!(requests[1].temporary_message.is_none());

        let remaining = store.messages(&thread).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].kind, MessageType::User);
    }

    #[tokio::test]
    async fn billing_denial_stops_with_reason() {
        let (store, thread) = thread_with_user_message().await;
        let provider = ScriptedProvider::replying("working");
        let gate = Arc::new(CountdownGate { allowed: Mutex::new(1) });

        let agent = AgentLoop::new(provider.clone(), store, gate, config(10));
        let events = collect(&agent, thread).await;

        assert_eq!(provider.calls(), 1);
        let last = events.last().unwrap();
        assert_eq!(last.status(), Some(RunStatus::Stopped));
        assert_eq!(
            serde_json::to_value(last).unwrap()["message"],
            "Billing limit reached: out of credits"
        );
    }

    #[tokio::test]
    async fn suspended_account_never_invokes_model() {
        let (store, thread) = thread_with_user_message().await;
        let provider = ScriptedProvider::replying("working");

        let agent = AgentLoop::new(provider.clone(), store, Arc::new(Suspended::new("suspended")), config(10));
        let events = collect(&agent, thread).await;

        assert_eq!(provider.calls(), 0);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].status(), Some(RunStatus::Stopped));
    }

    #[tokio::test]
    async fn billing_failure_is_single_error_event() {
        let (store, thread) = thread_with_user_message().await;
        let provider = ScriptedProvider::replying("working");

        let agent = AgentLoop::new(provider.clone(), store, Arc::new(BrokenGate), config(10));
        let events = collect(&agent, thread).await;

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].status(), Some(RunStatus::Error));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn provider_error_is_forwarded_once() {
        let (store, thread) = thread_with_user_message().await;
        let provider = ScriptedProvider::new(vec![Err(ProviderError::Status("model overloaded".into()))]);

        let agent = AgentLoop::new(provider.clone(), store, Arc::new(Unmetered), config(10));
        let events = collect(&agent, thread).await;

        assert_eq!(provider.calls(), 1);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].status(), Some(RunStatus::Error));
        assert_eq!(serde_json::to_value(&events[0]).unwrap()["message"], "model overloaded");
    }

    #[tokio::test]
    async fn in_stream_error_status_ends_run() {
        let (store, thread) = thread_with_user_message().await;
        let error_chunk = StreamChunk::new(
            "status",
            Value::String(json!({"status": "error", "message": "rate limited"}).to_string()),
        );
        let provider = ScriptedProvider::new(vec![Ok(vec![
            StreamChunk::assistant_text("partial"),
            error_chunk.clone(),
            StreamChunk::assistant_text("never seen"),
        ])]);

        let agent = AgentLoop::new(provider.clone(), store, Arc::new(Unmetered), config(10));
        let events = collect(&agent, thread).await;

        assert_eq!(provider.calls(), 1);
        assert_eq!(events.len(), 2);
        assert_eq!(events[1], AgentEvent::from(error_chunk));
    }

    #[tokio::test]
    async fn unknown_thread_is_an_error() {
        let store = Arc::new(InMemoryThreadStore::new());
        let provider = ScriptedProvider::replying("hi");

        let agent = AgentLoop::new(provider.clone(), store, Arc::new(Unmetered), config(10));
        let events = collect(&agent, ThreadId::from("missing")).await;

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].status(), Some(RunStatus::Error));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn request_carries_model_settings_and_tools() {
        let (store, thread) = thread_with_user_message().await;
        let provider = ScriptedProvider::replying("</complete>");
        let cfg = AgentConfig {
            model: "anthropic/claude-sonnet-4".into(),
            temperature: 0.3,
            max_tokens: None,
            max_iterations: 5,
        };

        let agent = AgentLoop::new(provider.clone(), store, Arc::new(Unmetered), cfg);
        collect(&agent, thread.clone()).await;

        let requests = provider.requests.lock().unwrap();
        assert_eq!(requests[0].thread_id, thread);
        assert_eq!(requests[0].max_tokens, Some(SONNET_MAX_TOKENS));
        assert!((requests[0].temperature - 0.3).abs() < f32::EPSILON);
        assert!(requests[0].tools.is_empty());
    }

    #[test]
    fn max_tokens_defaults() {
        let mut cfg = config(1);
        assert_eq!(effective_max_tokens(&cfg), None);
        cfg.model = "Claude-Sonnet-4".into();
        assert_eq!(effective_max_tokens(&cfg), Some(SONNET_MAX_TOKENS));
        cfg.max_tokens = Some(1024);
        assert_eq!(effective_max_tokens(&cfg), Some(1024));
    }

    #[test]
    fn error_status_detection() {
        assert!(is_error_status(&StreamChunk::new("status", json!({"status": "error"}))));
        assert!(!is_error_status(&StreamChunk::new("status", json!({"status_type": "finish"}))));
        assert!(!is_error_status(&StreamChunk::new("assistant", json!({"status": "error"}))));
        assert!(!is_error_status(&StreamChunk::new("status", json!("not json"))));
    }
}
