//! Per-recipient message dispatch.
//!
//! One parsed message becomes one independent send per recipient entry
//! (repeats included). Sends run concurrently and complete in any order;
//! each completion is appended to the [`OutcomeLog`] as it arrives. A failed
//! send produces exactly one notice naming the recipient. There is no retry
//! and no all-or-nothing behaviour.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::mention::ParsedMessage;
use crate::presentation::{failure_notice, Presentation, PresentationKind};

/// What the transport reports for one send.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SendReceipt {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

impl SendReceipt {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Delivers a message body to a single recipient.
///
/// Timeouts and retries are the transport's business.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, recipient_id: &str, body: &str) -> SendReceipt;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub recipient_id: String,
    /// Index of this entry in `ParsedMessage::recipients`.
    pub position: usize,
    pub result: std::result::Result<(), String>,
}

impl DispatchOutcome {
    fn from_receipt(position: usize, recipient_id: String, receipt: SendReceipt) -> Self {
        let result = if receipt.success {
            Ok(())
        } else {
            Err(receipt.error.unwrap_or_else(|| "unknown error".to_string()))
        };
        Self {
            recipient_id,
            position,
            result,
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// All outcomes of one dispatch, in completion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub outcomes: Vec<DispatchOutcome>,
}

impl DispatchReport {
    pub fn failures(&self) -> impl Iterator<Item = &DispatchOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }
}

/// Outcomes kept by a coordinator's [`OutcomeLog`] before the oldest drop.
pub const OUTCOME_LOG_CAPACITY: usize = 512;

/// Bounded record of the most recent outcomes seen by a coordinator.
///
/// Entries are appended in completion order. Once `capacity` is reached the
/// oldest entry is dropped for each new one; durable history belongs to
/// [`crate::logging::OutcomeLogger`].
#[derive(Clone, Debug)]
pub struct OutcomeLog {
    entries: Arc<Mutex<VecDeque<DispatchOutcome>>>,
    capacity: usize,
}

impl Default for OutcomeLog {
    fn default() -> Self {
        Self::with_capacity(OUTCOME_LOG_CAPACITY)
    }
}

impl OutcomeLog {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    pub fn append(&self, outcome: DispatchOutcome) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(outcome);
    }

    pub fn entries(&self) -> Vec<DispatchOutcome> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Fail unless the message addresses at least one recipient.
pub fn ensure_recipients(message: &ParsedMessage, marker: &str) -> Result<()> {
    if message.has_recipients() {
        Ok(())
    } else {
        Err(Error::NoRecipients {
            marker: marker.to_string(),
        })
    }
}

pub struct DispatchCoordinator {
    transport: Arc<dyn Transport>,
    marker: String,
    log: OutcomeLog,
}

impl DispatchCoordinator {
    pub fn new(transport: Arc<dyn Transport>, marker: &str) -> Self {
        Self {
            transport,
            marker: marker.to_string(),
            log: OutcomeLog::default(),
        }
    }

    pub fn log(&self) -> &OutcomeLog {
        &self.log
    }

    /// Send `message` to each recipient and report failures to `presentation`.
    pub async fn dispatch(
        &self,
        message: &ParsedMessage,
        presentation: &dyn Presentation,
    ) -> Result<DispatchReport> {
        ensure_recipients(message, &self.marker)?;

        let transport = self.transport.as_ref();
        let body = message.body.as_str();
        let mut pending: FuturesUnordered<_> = message
            .recipients
            .iter()
            .enumerate()
            .map(|(position, recipient_id)| async move {
                let receipt = transport.send(recipient_id, body).await;
                (position, recipient_id.clone(), receipt)
            })
            .collect();

        let mut report = DispatchReport::default();
        while let Some((position, recipient_id, receipt)) = pending.next().await {
            let outcome = DispatchOutcome::from_receipt(position, recipient_id, receipt);
            match &outcome.result {
                Ok(()) => debug!(recipient = %outcome.recipient_id, "send succeeded"),
                Err(error) => {
                    warn!(recipient = %outcome.recipient_id, %error, "send failed");
                    presentation.append(
                        PresentationKind::Notice,
                        &failure_notice(&outcome.recipient_id, error),
                    );
                }
            }
            self.log.append(outcome.clone());
            report.outcomes.push(outcome);
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{RecordingPresentation, ScriptedTransport};

    fn message(recipients: &[&str], body: &str) -> ParsedMessage {
        ParsedMessage {
            recipients: recipients.iter().map(|r| r.to_string()).collect(),
            body: body.to_string(),
        }
    }

    #[tokio::test]
    async fn test_no_recipients_fails_fast() {
        let transport = Arc::new(ScriptedTransport::default());
        let coordinator = DispatchCoordinator::new(transport.clone(), "Instance");
        let presentation = RecordingPresentation::default();

        let err = coordinator
            .dispatch(&message(&[], "non-empty body"), &presentation)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoRecipients { .. }));
        assert!(transport.calls().is_empty());
        assert!(presentation.entries().is_empty());
        assert!(coordinator.log().is_empty());
    }

    #[tokio::test]
    async fn test_one_failure_one_notice() {
        let transport = Arc::new(ScriptedTransport::default().failing("B", "instance not running"));
        let coordinator = DispatchCoordinator::new(transport.clone(), "Instance");
        let presentation = RecordingPresentation::default();

        let report = coordinator
            .dispatch(&message(&["A", "B"], "hello"), &presentation)
            .await
            .unwrap();

        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(report.success_count(), 1);
        let failed: Vec<_> = report.failures().map(|o| o.recipient_id.as_str()).collect();
        assert_eq!(failed, vec!["B"]);

        let notices = presentation.entries();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].0, PresentationKind::Notice);
        assert_eq!(notices[0].1, "Failed to send to B: instance not running");
    }

    #[tokio::test]
    async fn test_duplicates_send_once_per_occurrence() {
        let transport = Arc::new(ScriptedTransport::default());
        let coordinator = DispatchCoordinator::new(transport.clone(), "Instance");
        let presentation = RecordingPresentation::default();

        coordinator
            .dispatch(&message(&["A", "A", "B"], "ping"), &presentation)
            .await
            .unwrap();

        let mut calls = transport.calls();
        calls.sort();
        assert_eq!(
            calls,
            vec![
                ("A".to_string(), "ping".to_string()),
                ("A".to_string(), "ping".to_string()),
                ("B".to_string(), "ping".to_string()),
            ]
        );
        assert_eq!(coordinator.log().len(), 3);
    }

    #[tokio::test]
    async fn test_empty_body_is_sendable() {
        let transport = Arc::new(ScriptedTransport::default());
        let coordinator = DispatchCoordinator::new(transport.clone(), "Instance");
        let report = coordinator
            .dispatch(&message(&["A"], ""), &RecordingPresentation::default())
            .await
            .unwrap();
        assert_eq!(report.success_count(), 1);
        assert_eq!(transport.calls(), vec![("A".to_string(), String::new())]);
    }

    #[tokio::test]
    async fn test_failure_without_error_text() {
        let transport = Arc::new(ScriptedTransport::default().rejecting_silently("A"));
        let coordinator = DispatchCoordinator::new(transport, "Instance");
        let presentation = RecordingPresentation::default();
        coordinator
            .dispatch(&message(&["A"], "x"), &presentation)
            .await
            .unwrap();
        assert_eq!(presentation.entries()[0].1, "Failed to send to A: unknown error");
    }

    #[tokio::test]
    async fn test_completion_order_is_logged() {
        let transport = Arc::new(ScriptedTransport::default().delayed("A", 50));
        let coordinator = DispatchCoordinator::new(transport, "Instance");
        let report = coordinator
            .dispatch(&message(&["A", "B"], "x"), &RecordingPresentation::default())
            .await
            .unwrap();
        let order: Vec<_> = report.outcomes.iter().map(|o| o.recipient_id.as_str()).collect();
        assert_eq!(order, vec!["B", "A"]);
        assert_eq!(report.outcomes[0].position, 1);
        assert_eq!(coordinator.log().entries()[0].recipient_id, "B");
    }

    #[test]
    fn test_outcome_log_drops_oldest_past_capacity() {
        let log = OutcomeLog::with_capacity(2);
        for (position, id) in ["A", "B", "C"].iter().enumerate() {
            log.append(DispatchOutcome {
                recipient_id: id.to_string(),
                position,
                result: Ok(()),
            });
        }
        let ids: Vec<_> = log.entries().into_iter().map(|o| o.recipient_id).collect();
        assert_eq!(ids, vec!["B", "C"]);
        assert_eq!(OutcomeLog::default().capacity, OUTCOME_LOG_CAPACITY);
    }

    #[test]
    fn test_receipt_wire_format() {
        let ok: SendReceipt = serde_json::from_str(r#"{"success":true}"#).unwrap();
        assert_eq!(ok, SendReceipt::ok());
        let bad: SendReceipt =
            serde_json::from_str(r#"{"success":false,"error":"missing"}"#).unwrap();
        assert_eq!(bad, SendReceipt::failed("missing"));
    }
}
