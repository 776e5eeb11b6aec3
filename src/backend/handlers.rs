//! Handlers for UI actions and directory refreshes.

use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::Sender;
use tokio::task::JoinSet;
use tracing::{info, warn};

use super::state::{BackendServices, DirectoryPoller, RefreshRequest, RefreshSlot};
use crate::dispatch::DispatchCoordinator;
use crate::lifecycle::LifecycleRequest;
use crate::logging::LogEntry;
use crate::mention::ParsedMessage;
use crate::presentation::{ChannelPresentation, Presentation, PresentationKind};
use crate::protocol::{BackendAction, GuiEvent};

/// What the main loop should do after an action.
#[derive(Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Shutdown,
}

/// Loop state the handlers act on.
pub struct LoopState {
    pub poller: DirectoryPoller,
    pub refresh: RefreshSlot,
    /// Dispatch and lifecycle tasks; awaited on shutdown
    pub inflight: JoinSet<()>,
}

/// Handle a backend action from the UI
pub fn handle_backend_action(
    action: BackendAction,
    services: &BackendServices,
    coordinator: &Arc<DispatchCoordinator>,
    state: &mut LoopState,
    event_tx: &Sender<GuiEvent>,
) -> Flow {
    match action {
        BackendAction::Dispatch(message) => {
            info!(recipients = message.recipients.len(), "dispatching message");
            state.inflight.spawn(run_dispatch(
                message,
                Arc::clone(coordinator),
                services.clone(),
                event_tx.clone(),
            ));
        }
        BackendAction::Lifecycle(request) => {
            info!(?request, "lifecycle request");
            state.inflight.spawn(run_lifecycle(
                request,
                services.clone(),
                state.refresh.requester(),
                event_tx.clone(),
            ));
        }
        BackendAction::RefreshDirectory => {
            state.refresh.request();
            state.poller.mark_refreshed(Instant::now());
        }
        BackendAction::SetAutoRefresh(enabled) => {
            state.poller.set_enabled(enabled);
            let status = if enabled { "on" } else { "off" };
            let _ = event_tx.send(GuiEvent::Present {
                kind: PresentationKind::Notice,
                content: format!("Auto refresh: {}", status),
            });
        }
        BackendAction::Shutdown => return Flow::Shutdown,
    }
    Flow::Continue
}

async fn run_dispatch(
    message: ParsedMessage,
    coordinator: Arc<DispatchCoordinator>,
    services: BackendServices,
    event_tx: Sender<GuiEvent>,
) {
    let presentation = ChannelPresentation::new(event_tx.clone());
    match coordinator.dispatch(&message, &presentation).await {
        Ok(report) => {
            if let Some(logger) = &services.outcome_log {
                for outcome in &report.outcomes {
                    logger.log(LogEntry::from_outcome(outcome, &message.body));
                }
            }
            let _ = event_tx.send(GuiEvent::DispatchFinished(report));
        }
        Err(e) => {
            warn!("dispatch rejected: {}", e);
            presentation.append(PresentationKind::Notice, &e.to_string());
        }
    }
}

async fn run_lifecycle(
    request: LifecycleRequest,
    services: BackendServices,
    refresh: RefreshRequest,
    event_tx: Sender<GuiEvent>,
) {
    let receipt = services.control.apply(&request).await;
    if !receipt.success {
        warn!(?request, error = ?receipt.error, "lifecycle request failed");
    }
    ChannelPresentation::new(event_tx).append(PresentationKind::Notice, &request.notice(&receipt));
    // Clean-up can stop some instances even when it reports failure.
    if receipt.success || request == LifecycleRequest::CleanAll {
        refresh.request();
    }
}

/// Fetch a fresh listing into the shared directory.
///
/// On failure the previous snapshot stays in place.
pub async fn refresh_directory(services: &BackendServices, event_tx: &Sender<GuiEvent>) {
    match services.source.fetch().await {
        Ok(recipients) => {
            let count = recipients.len();
            services.directory.replace(recipients);
            let _ = event_tx.send(GuiEvent::DirectoryUpdated(count));
        }
        Err(e) => {
            warn!("directory refresh failed: {}", e);
            let _ = event_tx.send(GuiEvent::Error(e.to_string()));
        }
    }
}
