//! Composer session state, separated from the terminal adapter.
//!
//! `ChatSession` holds everything one composer needs between events: input
//! text, cursor, suggestion state and a handle on the directory cache. It is
//! pure state with no threads, so it is exercised directly in tests.
//!
//! `AttachedSession` owns the running backend. It is created by
//! [`AttachedSession::attach`] when a view attaches and torn down by
//! [`AttachedSession::detach`] (or on drop), which stops the poll timer,
//! waits for in-flight dispatches and flushes the outcome log.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{debug, warn};

use crate::autocomplete::{MentionAutocomplete, SuggestionState};
use crate::backend::{run_backend, BackendServices, HttpClient, PollSettings};
use crate::config::Settings;
use crate::directory::{Directory, SharedDirectory};
use crate::dispatch::ensure_recipients;
use crate::error::{Error, Result};
use crate::lifecycle::LifecycleRequest;
use crate::logging::OutcomeLogger;
use crate::markdown::render_markdown;
use crate::mention::{MentionParser, ParsedMessage};
use crate::presentation::{suggestion_panel, ChannelPresentation, Presentation, PresentationKind};
use crate::protocol::{BackendAction, GuiEvent};

pub struct ChatSession {
    directory: SharedDirectory,
    parser: MentionParser,
    autocomplete: MentionAutocomplete,
    /// Current message being composed
    message_input: String,
    /// Byte offset of the cursor in `message_input`
    cursor: usize,
}

impl ChatSession {
    pub fn new(marker: &str, directory: SharedDirectory) -> Self {
        Self {
            directory,
            parser: MentionParser::new(marker),
            autocomplete: MentionAutocomplete::new(marker),
            message_input: String::new(),
            cursor: 0,
        }
    }

    pub fn marker(&self) -> &str {
        self.parser.marker()
    }

    pub fn directory(&self) -> &SharedDirectory {
        &self.directory
    }

    pub fn input(&self) -> &str {
        &self.message_input
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn suggestions(&self) -> &SuggestionState {
        self.autocomplete.state()
    }

    /// Apply an edit event: new text and cursor. Suggestions are recomputed
    /// against the latest directory snapshot.
    pub fn edit(&mut self, text: impl Into<String>, cursor: usize) -> &SuggestionState {
        self.message_input = text.into();
        self.cursor = cursor.min(self.message_input.len());
        let snapshot = self.directory.snapshot();
        self.autocomplete
            .update(&self.message_input, self.cursor, &snapshot)
    }

    pub fn select_next(&mut self) {
        self.autocomplete.select_next();
    }

    pub fn select_previous(&mut self) {
        self.autocomplete.select_previous();
    }

    pub fn dismiss_suggestions(&mut self) {
        self.autocomplete.close();
    }

    /// Commit the highlighted suggestion. Returns false when nothing is
    /// highlighted.
    pub fn accept_suggestion(&mut self) -> bool {
        match self
            .autocomplete
            .commit_active(&self.message_input, self.cursor)
        {
            Some(done) => {
                self.message_input = done.text;
                self.cursor = done.cursor;
                true
            }
            None => false,
        }
    }

    /// Commit a specific recipient for the open suggestion session.
    pub fn accept_recipient(&mut self, recipient_id: &str) -> bool {
        match self
            .autocomplete
            .commit(&self.message_input, self.cursor, recipient_id)
        {
            Some(done) => {
                self.message_input = done.text;
                self.cursor = done.cursor;
                true
            }
            None => false,
        }
    }

    /// Text for the suggestion panel in its current state.
    pub fn suggestion_panel(&self) -> String {
        suggestion_panel(self.autocomplete.state(), self.marker())
    }

    /// Parse the composed text for sending.
    ///
    /// On success the composer is cleared. On failure the input is kept so
    /// the user can fix it.
    pub fn submit(&mut self) -> Result<ParsedMessage> {
        let text = self.message_input.trim();
        if text.is_empty() {
            return Err(Error::EmptyMessage);
        }
        let parsed = self.parser.parse(text);
        ensure_recipients(&parsed, self.marker())?;

        debug!(recipients = ?parsed.recipients, "message submitted");
        self.message_input.clear();
        self.cursor = 0;
        self.autocomplete.close();
        Ok(parsed)
    }

    /// Render inbound instance content for display.
    pub fn render_inbound(&self, content: &str) -> String {
        render_markdown(content)
    }
}

/// A session with a running backend thread.
pub struct AttachedSession {
    pub session: ChatSession,
    action_tx: Sender<BackendAction>,
    event_rx: Receiver<GuiEvent>,
    /// Local output (suggestions, outbound echo) on the same event stream
    presentation: ChannelPresentation,
    outcome_log: Option<OutcomeLogger>,
    backend: Option<JoinHandle<()>>,
}

impl AttachedSession {
    /// Build the HTTP backend from `settings` and start it.
    pub fn attach(settings: &Settings) -> Result<Self> {
        settings.validate()?;
        let http = Arc::new(HttpClient::new(
            &settings.server_url,
            settings.request_timeout(),
        )?);
        let outcome_log = if settings.log_outcomes {
            match OutcomeLogger::new() {
                Ok(logger) => Some(logger),
                Err(e) => {
                    warn!("outcome logging disabled: {}", e);
                    None
                }
            }
        } else {
            None
        };
        let services = BackendServices {
            transport: http.clone(),
            source: http.clone(),
            control: http,
            directory: SharedDirectory::default(),
            outcome_log,
            marker: settings.marker_word.clone(),
        };
        let poll = PollSettings {
            refresh_interval: settings.refresh_interval(),
            auto_refresh: settings.auto_refresh,
        };
        Ok(Self::attach_with(services, poll))
    }

    /// Start a backend against the given collaborators.
    pub fn attach_with(services: BackendServices, poll: PollSettings) -> Self {
        let (action_tx, action_rx) = unbounded::<BackendAction>();
        let (event_tx, event_rx) = unbounded::<GuiEvent>();
        let session = ChatSession::new(&services.marker, services.directory.clone());
        let presentation = ChannelPresentation::new(event_tx.clone());
        let outcome_log = services.outcome_log.clone();

        let backend = thread::spawn(move || {
            run_backend(services, poll, action_rx, event_tx);
        });

        Self {
            session,
            action_tx,
            event_rx,
            presentation,
            outcome_log,
            backend: Some(backend),
        }
    }

    /// Events from the backend. The receiver can be cloned onto another
    /// thread.
    pub fn events(&self) -> &Receiver<GuiEvent> {
        &self.event_rx
    }

    pub fn send_action(&self, action: BackendAction) {
        let _ = self.action_tx.send(action);
    }

    /// Submit the composed message and hand it to the backend. The
    /// submitted text is echoed as outbound output.
    pub fn submit(&mut self) -> Result<ParsedMessage> {
        let text = self.session.input().trim().to_string();
        let parsed = self.session.submit()?;
        self.presentation
            .append(PresentationKind::Outbound, &format!("you: {}", text));
        self.send_action(BackendAction::Dispatch(parsed.clone()));
        Ok(parsed)
    }

    /// Publish the current suggestion panel. Returns false when no
    /// suggestion session is open.
    pub fn show_suggestions(&self) -> bool {
        if !self.session.suggestions().is_open() {
            return false;
        }
        self.presentation
            .append(PresentationKind::Suggestions, &self.session.suggestion_panel());
        true
    }

    /// Ask the manager to start, stop or clean up instances. The directory
    /// is refreshed once the request succeeds.
    pub fn request_lifecycle(&self, request: LifecycleRequest) {
        self.send_action(BackendAction::Lifecycle(request));
    }

    /// Stop the backend, waiting for in-flight dispatches.
    pub fn detach(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if let Some(handle) = self.backend.take() {
            let _ = self.action_tx.send(BackendAction::Shutdown);
            if handle.join().is_err() {
                warn!("backend thread panicked");
            }
        }
        // Backend is gone, so every outcome has been queued.
        if let Some(logger) = self.outcome_log.take() {
            logger.shutdown();
        }
    }
}

impl Drop for AttachedSession {
    fn drop(&mut self) {
        self.teardown();
    }
}
