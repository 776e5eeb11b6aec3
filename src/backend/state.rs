//! State owned by the backend loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;
use tokio::task::JoinHandle;

use super::handlers::refresh_directory;
use crate::directory::{DirectorySource, SharedDirectory};
use crate::dispatch::Transport;
use crate::lifecycle::InstanceControl;
use crate::logging::OutcomeLogger;
use crate::protocol::GuiEvent;

/// Collaborators the backend runs against.
#[derive(Clone)]
pub struct BackendServices {
    pub transport: Arc<dyn Transport>,
    pub source: Arc<dyn DirectorySource>,
    pub control: Arc<dyn InstanceControl>,
    /// Cache the poller refreshes and the session reads
    pub directory: SharedDirectory,
    pub outcome_log: Option<OutcomeLogger>,
    pub marker: String,
}

/// Fixed-interval directory refresh timer that can be switched off.
#[derive(Debug, Clone)]
pub struct DirectoryPoller {
    interval: Duration,
    enabled: bool,
    last_refresh: Option<Instant>,
}

impl DirectoryPoller {
    pub fn new(interval: Duration, enabled: bool) -> Self {
        Self {
            interval,
            enabled,
            last_refresh: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Whether a periodic refresh is due at `now`.
    pub fn due(&self, now: Instant) -> bool {
        if !self.enabled {
            return false;
        }
        match self.last_refresh {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.interval,
        }
    }

    /// Record a refresh (periodic or manual) at `now`.
    pub fn mark_refreshed(&mut self, now: Instant) {
        self.last_refresh = Some(now);
    }
}

/// Asks the loop for a directory refresh from inside a spawned task.
#[derive(Clone, Default)]
pub struct RefreshRequest(Arc<AtomicBool>);

impl RefreshRequest {
    pub fn request(&self) {
        self.0.store(true, Ordering::Release);
    }

    fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

/// Runs directory fetches as their own task, at most one at a time.
///
/// A request made while a fetch is running is remembered and started once
/// that fetch finishes, so the listing never lags a lifecycle change.
#[derive(Default)]
pub struct RefreshSlot {
    task: Option<JoinHandle<()>>,
    requested: RefreshRequest,
}

impl RefreshSlot {
    pub fn requester(&self) -> RefreshRequest {
        self.requested.clone()
    }

    pub fn request(&self) {
        self.requested.request();
    }

    pub fn is_busy(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Start a pending refresh if none is running. Must be called from
    /// within the backend runtime.
    pub fn tick(&mut self, services: &BackendServices, event_tx: &Sender<GuiEvent>) {
        if self.is_busy() || !self.requested.take() {
            return;
        }
        let services = services.clone();
        let event_tx = event_tx.clone();
        self.task = Some(tokio::spawn(async move {
            refresh_directory(&services, &event_tx).await;
        }));
    }

    /// Drop a running fetch. Nothing is published for it.
    pub fn abort(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
