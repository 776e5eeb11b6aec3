use crate::dispatch::DispatchReport;
use crate::lifecycle::LifecycleRequest;
use crate::mention::ParsedMessage;
use crate::presentation::PresentationKind;

/// Actions sent from the UI to the Backend
#[derive(Debug, Clone)]
pub enum BackendAction {
    /// Send a parsed message to each of its recipients
    Dispatch(ParsedMessage),
    /// Start or stop an instance, or clean up all of them
    Lifecycle(LifecycleRequest),
    /// Fetch the directory now, regardless of the poll timer
    RefreshDirectory,
    /// Turn periodic directory polling on or off
    SetAutoRefresh(bool),
    /// Finish in-flight dispatches and stop
    Shutdown,
}

/// Events sent from the Backend to the UI
#[derive(Debug, Clone)]
pub enum GuiEvent {
    /// Something to display (notice, rendered fragment, ...)
    Present {
        kind: PresentationKind,
        content: String,
    },
    /// The shared directory was refreshed and now holds this many entries
    DirectoryUpdated(usize),
    /// Every send of one dispatch has completed
    DispatchFinished(DispatchReport),
    /// Backend-level error (not tied to a single recipient)
    Error(String),
    /// Backend loop exited
    Stopped,
}
