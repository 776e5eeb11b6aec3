//! Backend main event loop: UI actions, directory polling, dispatch tasks.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use tokio::runtime::Runtime;
use tokio::task::JoinSet;
use tracing::{debug, info};

use super::handlers::{self, Flow, LoopState};
use super::state::{BackendServices, DirectoryPoller, RefreshSlot};
use crate::dispatch::DispatchCoordinator;
use crate::protocol::{BackendAction, GuiEvent};

/// How long the loop sleeps between checks for actions and poll deadlines
const TICK: Duration = Duration::from_millis(50);

/// Poll timing for the backend loop
#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub refresh_interval: Duration,
    pub auto_refresh: bool,
}

/// Run the backend event loop on a tokio runtime.
///
/// Blocks the calling thread until [`BackendAction::Shutdown`] arrives or the
/// action channel closes. In-flight dispatches and lifecycle requests are
/// awaited, never cancelled, before [`GuiEvent::Stopped`] is sent. A running
/// directory fetch is dropped.
pub fn run_backend(
    services: BackendServices,
    poll: PollSettings,
    action_rx: Receiver<BackendAction>,
    event_tx: Sender<GuiEvent>,
) {
    let rt = match Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            let _ = event_tx.send(GuiEvent::Error(format!(
                "Failed to create Tokio runtime: {}",
                e
            )));
            let _ = event_tx.send(GuiEvent::Stopped);
            return;
        }
    };

    rt.block_on(async move {
        let coordinator = Arc::new(DispatchCoordinator::new(
            Arc::clone(&services.transport),
            &services.marker,
        ));
        let mut state = LoopState {
            poller: DirectoryPoller::new(poll.refresh_interval, poll.auto_refresh),
            refresh: RefreshSlot::default(),
            inflight: JoinSet::new(),
        };

        'outer: loop {
            // Drain pending actions from the UI (non-blocking)
            loop {
                match action_rx.try_recv() {
                    Ok(action) => {
                        let flow = handlers::handle_backend_action(
                            action,
                            &services,
                            &coordinator,
                            &mut state,
                            &event_tx,
                        );
                        if flow == Flow::Shutdown {
                            break 'outer;
                        }
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        debug!("action channel closed");
                        break 'outer;
                    }
                }
            }

            let now = Instant::now();
            if state.poller.due(now) {
                state.refresh.request();
                state.poller.mark_refreshed(now);
            }
            // Fetches run as their own task so actions never wait on them
            state.refresh.tick(&services, &event_tx);

            // Reap finished dispatch tasks
            while state.inflight.try_join_next().is_some() {}

            tokio::time::sleep(TICK).await;
        }

        state.refresh.abort();
        info!(pending = state.inflight.len(), "backend stopping");
        while state.inflight.join_next().await.is_some() {}
        let _ = event_tx.send(GuiEvent::Stopped);
    });
}
