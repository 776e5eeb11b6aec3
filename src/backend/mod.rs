/// Backend submodules for dispatch and directory polling
///
/// This module breaks the backend into focused components:
/// - `connection`: HTTP client for the session manager API
/// - `handlers`: UI action handling, dispatch tasks, directory refresh
/// - `main_loop`: Core event loop running on its own tokio runtime
/// - `state`: Poll timer and the collaborators the loop runs against
mod connection;
mod handlers;
mod main_loop;
mod state;

// Re-export the main backend entry points
pub use connection::HttpClient;
pub use main_loop::{run_backend, PollSettings};
pub use state::{BackendServices, DirectoryPoller};
