//! The Blinker agent loop.
//!
//! A run repeats one cycle against a persisted thread:
//!
//! 1. **Check billing** for the thread's account
//! 2. **Early-stop** if the thread already ends on an assistant message
//! 3. **Build ephemeral context** from pending browser/image entries
//! 4. **Invoke the model** via the configured provider
//! 5. **Forward the stream**, watching assistant output for a terminal tag
//!
//! The loop ends on `</ask>`, `</complete>` or `</web-browser-takeover>`,
//! on a billing stop or failure, or at the iteration cap.

pub mod billing;
pub mod context;
pub mod loop_runner;
pub mod stop;
pub mod stream_event;

pub use billing::{Suspended, Unmetered};
pub use context::TemporaryContextBuilder;
pub use loop_runner::AgentLoop;
pub use stop::StopConditionDetector;
pub use stream_event::{AgentEvent, RunStatus, StatusEvent};
