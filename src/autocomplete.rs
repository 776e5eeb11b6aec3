//! Cursor-driven `@mention` autocomplete.
//!
//! The suggestion state is recomputed from scratch on every edit from the
//! text before the cursor and the current directory snapshot:
//!
//! - `@` right before the cursor opens the full list;
//! - `@query` right before the cursor (query = non-empty run without
//!   whitespace or `@`) opens the filtered list;
//! - anything else closes it.
//!
//! Committing a suggestion rewrites `[anchor, cursor)` into the canonical
//! mention token.

use crate::directory::Recipient;
use crate::mention::{canonical_token, DEFAULT_MARKER, MENTION_SIGIL};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SuggestionMode {
    #[default]
    Closed,
    OpenAll,
    OpenFiltered,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SuggestionState {
    pub mode: SuggestionMode,
    /// Byte offset of the triggering `@`. Meaningless while closed.
    pub anchor: usize,
    pub query: String,
    pub matches: Vec<Recipient>,
    /// Index into `matches` of the highlighted entry.
    pub active: Option<usize>,
}

impl SuggestionState {
    pub fn is_open(&self) -> bool {
        self.mode != SuggestionMode::Closed
    }

    pub fn active_recipient(&self) -> Option<&Recipient> {
        self.active.and_then(|i| self.matches.get(i))
    }
}

/// Text and cursor after a suggestion was committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub cursor: usize,
}

#[derive(Debug, Clone)]
pub struct MentionAutocomplete {
    marker: String,
    state: SuggestionState,
}

impl MentionAutocomplete {
    pub fn new(marker: &str) -> Self {
        Self {
            marker: marker.to_string(),
            state: SuggestionState::default(),
        }
    }

    pub fn state(&self) -> &SuggestionState {
        &self.state
    }

    /// Recompute suggestions for an edit event.
    pub fn update(&mut self, text: &str, cursor: usize, directory: &[Recipient]) -> &SuggestionState {
        self.state = compute_state(text, cursor, directory);
        &self.state
    }

    pub fn close(&mut self) {
        self.state = SuggestionState::default();
    }

    /// Move the highlight down one entry, wrapping around.
    pub fn select_next(&mut self) {
        self.cycle(1);
    }

    /// Move the highlight up one entry, wrapping around.
    pub fn select_previous(&mut self) {
        self.cycle(-1);
    }

    fn cycle(&mut self, direction: isize) {
        let len = self.state.matches.len();
        if !self.state.is_open() || len == 0 {
            return;
        }
        let next = match self.state.active {
            Some(idx) => (idx as isize + direction).rem_euclid(len as isize) as usize,
            None => 0,
        };
        self.state.active = Some(next);
    }

    /// Replace the pending `@query` with the token for `recipient_id`.
    ///
    /// Returns `None` (and leaves the state alone) when no suggestion session
    /// is open or the cursor no longer lies after the anchor.
    pub fn commit(&mut self, text: &str, cursor: usize, recipient_id: &str) -> Option<Completion> {
        if !self.state.is_open() {
            return None;
        }
        let anchor = self.state.anchor;
        if anchor > cursor || !text.is_char_boundary(anchor) || !text.is_char_boundary(cursor) {
            return None;
        }
        let token = canonical_token(&self.marker, recipient_id);
        let mut out = String::with_capacity(text.len() + token.len());
        out.push_str(&text[..anchor]);
        out.push_str(&token);
        out.push_str(&text[cursor..]);
        self.close();
        Some(Completion {
            text: out,
            cursor: anchor + token.len(),
        })
    }

    /// Commit the highlighted suggestion, if any.
    pub fn commit_active(&mut self, text: &str, cursor: usize) -> Option<Completion> {
        let id = self.state.active_recipient()?.id.clone();
        self.commit(text, cursor, &id)
    }
}

impl Default for MentionAutocomplete {
    fn default() -> Self {
        Self::new(DEFAULT_MARKER)
    }
}

fn compute_state(text: &str, cursor: usize, directory: &[Recipient]) -> SuggestionState {
    let Some(before) = text.get(..cursor) else {
        return SuggestionState::default();
    };

    if before.ends_with(MENTION_SIGIL) {
        return SuggestionState {
            mode: SuggestionMode::OpenAll,
            anchor: cursor - MENTION_SIGIL.len_utf8(),
            query: String::new(),
            matches: directory.to_vec(),
            active: if directory.is_empty() { None } else { Some(0) },
        };
    }

    let Some(at) = before.rfind(MENTION_SIGIL) else {
        return SuggestionState::default();
    };
    let query = &before[at + MENTION_SIGIL.len_utf8()..];
    if query.is_empty() || query.chars().any(char::is_whitespace) {
        return SuggestionState::default();
    }

    let needle = query.to_lowercase();
    let matches: Vec<Recipient> = directory
        .iter()
        .filter(|r| r.matches_query(&needle))
        .cloned()
        .collect();
    let active = if matches.is_empty() { None } else { Some(0) };
    SuggestionState {
        mode: SuggestionMode::OpenFiltered,
        anchor: at,
        query: query.to_string(),
        matches,
        active,
    }
}
