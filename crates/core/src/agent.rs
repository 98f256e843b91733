//! Agent configuration and per-run state types.

use serde::{Deserialize, Serialize};

/// Configuration for one agent run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Model to invoke
    pub model: String,

    /// Sampling temperature
    #[serde(default)]
    pub temperature: f32,

    /// Max tokens per model turn
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Hard cap on reasoning/action cycles per run
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
}

fn default_max_iterations() -> u32 {
    150
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: "anthropic/claude-sonnet-4".into(),
            temperature: 0.0,
            max_tokens: None,
            max_iterations: default_max_iterations(),
        }
    }
}

/// An action that ends the agent's current turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TerminalAction {
    Ask,
    Complete,
    WebBrowserTakeover,
}

impl TerminalAction {
    /// In priority order: when several close in the same fragment, the
    /// first one here wins.
    pub const ALL: [TerminalAction; 3] = [
        TerminalAction::Ask,
        TerminalAction::Complete,
        TerminalAction::WebBrowserTakeover,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TerminalAction::Ask => "ask",
            TerminalAction::Complete => "complete",
            TerminalAction::WebBrowserTakeover => "web-browser-takeover",
        }
    }

    pub fn closing_tag(self) -> &'static str {
        match self {
            TerminalAction::Ask => "</ask>",
            TerminalAction::Complete => "</complete>",
            TerminalAction::WebBrowserTakeover => "</web-browser-takeover>",
        }
    }
}

impl std::fmt::Display for TerminalAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transient state of a single run. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentRunState {
    pub iteration_count: u32,
    pub continue_execution: bool,
    pub last_terminal_action: Option<TerminalAction>,
}

impl AgentRunState {
    pub fn new() -> Self {
        Self {
            iteration_count: 0,
            continue_execution: true,
            last_terminal_action: None,
        }
    }

    /// Whether another iteration may start under the given cap.
    pub fn should_continue(&self, max_iterations: u32) -> bool {
        self.continue_execution && self.iteration_count < max_iterations
    }

    /// Record a finished iteration, stopping if it ended on a terminal action.
    pub fn finish_iteration(&mut self, terminal: Option<TerminalAction>) {
        self.iteration_count += 1;
        if let Some(action) = terminal {
            self.last_terminal_action = Some(action);
            self.continue_execution = false;
        }
    }

    pub fn halt(&mut self) {
        self.continue_execution = false;
    }
}

impl Default for AgentRunState {
    fn default() -> Self {
        Self::new()
    }
}
