//! Output sink for rendered fragments, suggestion panels and notices.

use crossbeam_channel::Sender;

use crate::autocomplete::{SuggestionMode, SuggestionState};
use crate::protocol::GuiEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentationKind {
    /// Markup produced by the markdown renderer.
    Rendered,
    /// Suggestion panel contents.
    Suggestions,
    /// System notices (send failures, validation errors, refresh status).
    Notice,
    /// Echo of text the user submitted.
    Outbound,
}

/// Fire-and-forget display sink. Implementations must not block.
pub trait Presentation: Send + Sync {
    fn append(&self, kind: PresentationKind, content: &str);
}

/// Forwards everything to the UI as [`GuiEvent::Present`].
#[derive(Clone)]
pub struct ChannelPresentation {
    event_tx: Sender<GuiEvent>,
}

impl ChannelPresentation {
    pub fn new(event_tx: Sender<GuiEvent>) -> Self {
        Self { event_tx }
    }
}

impl Presentation for ChannelPresentation {
    fn append(&self, kind: PresentationKind, content: &str) {
        // A closed channel means the UI is gone; nothing left to show.
        let _ = self.event_tx.send(GuiEvent::Present {
            kind,
            content: content.to_string(),
        });
    }
}

/// Notice shown when a single recipient's send fails.
pub fn failure_notice(recipient_id: &str, error: &str) -> String {
    format!("Failed to send to {}: {}", recipient_id, error)
}

/// Plain-text suggestion panel, one line per match, active entry marked `>`.
pub fn suggestion_panel(state: &SuggestionState, marker: &str) -> String {
    match state.mode {
        SuggestionMode::Closed => String::new(),
        SuggestionMode::OpenAll if state.matches.is_empty() => "no instances available".into(),
        SuggestionMode::OpenFiltered if state.matches.is_empty() => "no matches".into(),
        _ => state
            .matches
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let mark = if state.active == Some(i) { '>' } else { ' ' };
                let detail = r.detail.as_deref().unwrap_or("no description");
                format!("{} @{}{} - {}", mark, marker, r.id, detail)
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}
