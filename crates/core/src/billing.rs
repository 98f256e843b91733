//! BillingGate trait: may this account keep running the agent?

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::BillingError;

/// Answer of a billing check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingStatus {
    pub can_run: bool,

    /// Human-readable reason, shown to the user when `can_run` is false
    pub message: String,

    /// Backend-specific subscription details
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription: Option<serde_json::Value>,
}

impl BillingStatus {
    pub fn allowed(message: impl Into<String>) -> Self {
        Self {
            can_run: true,
            message: message.into(),
            subscription: None,
        }
    }

    pub fn denied(message: impl Into<String>) -> Self {
        Self {
            can_run: false,
            message: message.into(),
            subscription: None,
        }
    }
}

/// Queried by the agent loop once per iteration, since account state can
/// change while a run is in progress.
#[async_trait]
pub trait BillingGate: Send + Sync {
    async fn check(&self, account_id: &str) -> Result<BillingStatus, BillingError>;
}
