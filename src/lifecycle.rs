//! Instance lifecycle control: start, stop, and clean up all instances.
//!
//! Requests are validated when built, so the backend only ever sees ids that
//! could appear in a mention token.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::validation;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleRequest {
    Start(String),
    Stop(String),
    CleanAll,
}

impl LifecycleRequest {
    pub fn start(recipient_id: &str) -> Result<Self> {
        validation::validate_recipient_id(recipient_id).map_err(Error::InvalidRecipient)?;
        Ok(Self::Start(recipient_id.to_string()))
    }

    pub fn stop(recipient_id: &str) -> Result<Self> {
        validation::validate_recipient_id(recipient_id).map_err(Error::InvalidRecipient)?;
        Ok(Self::Stop(recipient_id.to_string()))
    }

    /// Notice text for the answer the manager gave to this request.
    pub fn notice(&self, receipt: &ControlReceipt) -> String {
        if receipt.success {
            match self {
                Self::Start(id) => format!("Instance {} started", id),
                Self::Stop(id) => format!("Instance {} stopped", id),
                Self::CleanAll => receipt
                    .message
                    .clone()
                    .unwrap_or_else(|| "All instances cleaned up".to_string()),
            }
        } else {
            let reason = receipt.failure_reason();
            match self {
                Self::Start(id) => format!("Failed to start {}: {}", id, reason),
                Self::Stop(id) => format!("Failed to stop {}: {}", id, reason),
                Self::CleanAll => format!("Failed to clean up instances: {}", reason),
            }
        }
    }
}

/// Manager answer to a lifecycle request.
///
/// Clean-up reports partial failure with a `message` plus per-instance
/// `errors` instead of a single `error`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ControlReceipt {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl ControlReceipt {
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    fn failure_reason(&self) -> String {
        let mut reason = self
            .error
            .clone()
            .or_else(|| self.message.clone())
            .unwrap_or_else(|| "unknown error".to_string());
        if !self.errors.is_empty() {
            reason = format!("{} ({})", reason, self.errors.join("; "));
        }
        reason
    }
}

/// Applies lifecycle requests. Transport failures come back as failed
/// receipts, never as errors.
#[async_trait]
pub trait InstanceControl: Send + Sync {
    async fn apply(&self, request: &LifecycleRequest) -> ControlReceipt;
}
