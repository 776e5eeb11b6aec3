//! `@mention` token parsing.
//!
//! A mention is `@` followed by the configured marker word and a recipient
//! identifier, e.g. `@InstanceA` with marker `Instance` addresses `A`. The
//! identifier is the maximal run of word characters after the marker.

use regex::Regex;

/// Character that opens a mention token.
pub const MENTION_SIGIL: char = '@';

/// Marker word used when none is configured.
pub const DEFAULT_MARKER: &str = "Instance";

/// Build the canonical token inserted for `recipient_id`, including the
/// trailing space that separates it from following text.
pub fn canonical_token(marker: &str, recipient_id: &str) -> String {
    format!("{}{}{} ", MENTION_SIGIL, marker, recipient_id)
}

/// A mention found in raw input. `start..end` is a byte range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentionToken {
    pub recipient_id: String,
    pub start: usize,
    pub end: usize,
}

/// Result of parsing submitted text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedMessage {
    /// Addressed recipients in order of appearance, duplicates kept.
    pub recipients: Vec<String>,
    /// Input with every token (and the whitespace after it) removed, trimmed.
    pub body: String,
}

impl ParsedMessage {
    pub fn has_recipients(&self) -> bool {
        !self.recipients.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct MentionParser {
    marker: String,
    token_re: Regex,
    strip_re: Regex,
}

impl MentionParser {
    pub fn new(marker: &str) -> Self {
        let escaped = regex::escape(marker);
        let token_re = Regex::new(&format!(r"{}{}(\w+)", MENTION_SIGIL, escaped))
            .expect("escaped marker always forms a valid pattern");
        let strip_re = Regex::new(&format!(r"{}{}\w+\s*", MENTION_SIGIL, escaped))
            .expect("escaped marker always forms a valid pattern");
        Self {
            marker: marker.to_string(),
            token_re,
            strip_re,
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// All mention tokens in `text`, in textual order.
    pub fn tokens(&self, text: &str) -> Vec<MentionToken> {
        self.token_re
            .captures_iter(text)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let id = caps.get(1)?;
                Some(MentionToken {
                    recipient_id: id.as_str().to_string(),
                    start: whole.start(),
                    end: whole.end(),
                })
            })
            .collect()
    }

    /// Split `text` into its addressed recipients and the message body.
    pub fn parse(&self, text: &str) -> ParsedMessage {
        let recipients: Vec<String> = self
            .tokens(text)
            .into_iter()
            .map(|t| t.recipient_id)
            .collect();
        if recipients.is_empty() {
            return ParsedMessage {
                recipients,
                body: text.trim().to_string(),
            };
        }
        let body = self.strip_re.replace_all(text, "").trim().to_string();
        ParsedMessage { recipients, body }
    }
}

impl Default for MentionParser {
    fn default() -> Self {
        Self::new(DEFAULT_MARKER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_mention() {
        let parser = MentionParser::default();
        let parsed = parser.parse("Hello @InstanceA how are you");
        assert_eq!(parsed.recipients, vec!["A"]);
        assert_eq!(parsed.body, "Hello how are you");
    }

    #[test]
    fn test_multiple_mentions_in_order() {
        let parser = MentionParser::default();
        let parsed = parser.parse("@InstanceB @InstanceA run the tests");
        assert_eq!(parsed.recipients, vec!["B", "A"]);
        assert_eq!(parsed.body, "run the tests");
    }

    #[test]
    fn test_duplicates_are_preserved() {
        let parser = MentionParser::default();
        let parsed = parser.parse("@InstanceA hi @InstanceA");
        assert_eq!(parsed.recipients, vec!["A", "A"]);
        assert_eq!(parsed.body, "hi");
    }

    #[test]
    fn test_no_mentions_trims_input() {
        let parser = MentionParser::default();
        let parsed = parser.parse("  nobody addressed  ");
        assert!(parsed.recipients.is_empty());
        assert!(!parsed.has_recipients());
        assert_eq!(parsed.body, "nobody addressed");
    }

    #[test]
    fn test_marker_without_identifier_is_not_a_token() {
        let parser = MentionParser::default();
        let parsed = parser.parse("@Instance alone");
        assert!(parsed.recipients.is_empty());
        assert_eq!(parsed.body, "@Instance alone");
    }

    #[test]
    fn test_empty_body_after_stripping() {
        let parser = MentionParser::default();
        let parsed = parser.parse("@Instance1 @Instance2 ");
        assert_eq!(parsed.recipients, vec!["1", "2"]);
        assert_eq!(parsed.body, "");
    }

    #[test]
    fn test_identifier_stops_at_non_word_char() {
        let parser = MentionParser::default();
        let tokens = parser.tokens("Hi @InstanceX_1! and @Instance9.");
        assert_eq!(
            tokens,
            vec![
                MentionToken {
                    recipient_id: "X_1".into(),
                    start: 3,
                    end: 15,
                },
                MentionToken {
                    recipient_id: "9".into(),
                    start: 21,
                    end: 31,
                },
            ]
        );
        let parsed = parser.parse("Hi @InstanceX_1! and @Instance9.");
        assert_eq!(parsed.body, "Hi ! and .");
    }

    #[test]
    fn test_custom_marker_with_regex_metacharacters() {
        let parser = MentionParser::new("bot.");
        let parsed = parser.parse("@bot.7 status @botx8");
        assert_eq!(parsed.recipients, vec!["7"]);
        assert_eq!(parsed.body, "status @botx8");
        assert_eq!(parser.marker(), "bot.");
    }

    #[test]
    fn test_body_has_no_tokens_left() {
        let parser = MentionParser::default();
        let input = "@InstanceA do @InstanceB this @InstanceA now";
        let parsed = parser.parse(input);
        assert_eq!(parsed.recipients.len(), 3);
        assert!(!parsed.body.contains("@Instance"));
        assert_eq!(parsed.body, "do this now");
    }

    #[test]
    fn test_canonical_token() {
        assert_eq!(canonical_token("Instance", "A"), "@InstanceA ");
    }
}
