//! Billing gates that don't call out to a billing backend.

use async_trait::async_trait;
use blinker_core::billing::{BillingGate, BillingStatus};
use blinker_core::error::BillingError;

/// Lets every account run. Used for self-hosted deployments.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unmetered;

#[async_trait]
impl BillingGate for Unmetered {
    async fn check(&self, _account_id: &str) -> Result<BillingStatus, BillingError> {
        Ok(BillingStatus::allowed("unmetered"))
    }
}

/// Denies every account with a fixed reason.
#[derive(Debug, Clone)]
pub struct Suspended {
    reason: String,
}

impl Suspended {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

#[async_trait]
impl BillingGate for Suspended {
    async fn check(&self, _account_id: &str) -> Result<BillingStatus, BillingError> {
        Ok(BillingStatus::denied(self.reason.clone()))
    }
}
