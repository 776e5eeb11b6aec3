//! Markdown-subset to markup rendering for inbound instance replies.
//!
//! Rendering is a fixed sequence of regex substitution passes over the
//! escaped text. The order in [`PASS_ORDER`] matters:
//! - fenced blocks run before everything else so their bodies can be
//!   stashed and restored untouched at the end;
//! - headings run before emphasis;
//! - bold runs before italic so `**` pairs are consumed before single `*`
//!   could match half of them.
//!
//! Nothing here can fail. Constructs that do not match are left as escaped
//! literal text.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::escape::{escape_attribute_quotes, escape_markup};

/// One substitution pass of the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    Escape,
    FencedBlocks,
    InlineCode,
    Headings,
    Bold,
    Italic,
    ListItems,
    Links,
    LineBreaks,
}

/// The order passes run in. Reordering changes output.
pub const PASS_ORDER: [Pass; 9] = [
    Pass::Escape,
    Pass::FencedBlocks,
    Pass::InlineCode,
    Pass::Headings,
    Pass::Bold,
    Pass::Italic,
    Pass::ListItems,
    Pass::Links,
    Pass::LineBreaks,
];

/// Label used for fenced blocks without a language.
pub const DEFAULT_FENCE_LABEL: &str = "code";

// Private-use code points delimiting stashed fence placeholders.
const STASH_OPEN: char = '\u{E000}';
const STASH_CLOSE: char = '\u{E001}';

static FENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?sm)^```(\w+)?[ \t]*\n(.*?)\n```[ \t]*$").expect("fence regex pattern is valid")
});
static INLINE_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"`([^`]+)`").expect("inline code regex pattern is valid"));
static H5_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^### (.*)$").expect("heading regex pattern is valid"));
static H4_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^## (.*)$").expect("heading regex pattern is valid"));
static H3_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^# (.*)$").expect("heading regex pattern is valid"));
static BOLD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("bold regex pattern is valid"));
static ITALIC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*([^*\n]+)\*").expect("italic regex pattern is valid"));
static BULLET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^- (.*)$").expect("bullet regex pattern is valid"));
static NUMBERED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\d+\. (.*)$").expect("numbered regex pattern is valid"));
static LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").expect("link regex pattern is valid")
});
static STASH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!("{}([0-9]+){}", STASH_OPEN, STASH_CLOSE))
        .expect("stash regex pattern is valid")
});

/// Finished fenced blocks, referenced from the text by index.
#[derive(Default)]
struct FenceStash {
    blocks: Vec<String>,
}

impl FenceStash {
    fn stash(&mut self, block: String) -> String {
        let placeholder = format!("{}{}{}", STASH_OPEN, self.blocks.len(), STASH_CLOSE);
        self.blocks.push(block);
        placeholder
    }

    fn restore(&self, text: &str) -> String {
        STASH_RE
            .replace_all(text, |caps: &Captures| {
                caps[1]
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| self.blocks.get(i))
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}

/// Render the markdown subset in `text` to a markup fragment.
pub fn render_markdown(text: &str) -> String {
    let mut stash = FenceStash::default();
    let mut out = text.to_string();
    for pass in PASS_ORDER {
        out = apply_pass(pass, &out, &mut stash);
    }
    stash.restore(&out)
}

fn apply_pass(pass: Pass, text: &str, stash: &mut FenceStash) -> String {
    match pass {
        Pass::Escape => escape_markup(text)
            .replace(STASH_OPEN, "&#xE000;")
            .replace(STASH_CLOSE, "&#xE001;"),
        Pass::FencedBlocks => FENCE_RE
            .replace_all(text, |caps: &Captures| {
                let label = caps.get(1).map_or(DEFAULT_FENCE_LABEL, |m| m.as_str());
                stash.stash(fenced_block(label, &caps[2]))
            })
            .into_owned(),
        Pass::InlineCode => INLINE_CODE_RE
            .replace_all(text, "<code>${1}</code>")
            .into_owned(),
        Pass::Headings => {
            let out = H5_RE.replace_all(text, "<h5>${1}</h5>");
            let out = H4_RE.replace_all(&out, "<h4>${1}</h4>");
            H3_RE.replace_all(&out, "<h3>${1}</h3>").into_owned()
        }
        Pass::Bold => BOLD_RE
            .replace_all(text, "<strong>${1}</strong>")
            .into_owned(),
        Pass::Italic => ITALIC_RE.replace_all(text, "<em>${1}</em>").into_owned(),
        Pass::ListItems => {
            let out = BULLET_RE.replace_all(text, "<li>${1}</li>");
            NUMBERED_RE.replace_all(&out, "<li>${1}</li>").into_owned()
        }
        Pass::Links => LINK_RE
            .replace_all(text, |caps: &Captures| {
                format!(
                    "<a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">{} <i class=\"external-link\"></i></a>",
                    escape_attribute_quotes(&caps[2]),
                    &caps[1]
                )
            })
            .into_owned(),
        Pass::LineBreaks => text.replace('\n', "<br>"),
    }
}

fn fenced_block(label: &str, body: &str) -> String {
    format!(
        "<div class=\"code-block\"><div class=\"code-header\">{}</div><pre><code>{}</code></pre></div>",
        label, body
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_escaped_with_line_breaks() {
        let input = "a < b & c > d\nsecond line";
        assert_eq!(
            render_markdown(input),
            "a &lt; b &amp; c &gt; d<br>second line"
        );
    }

    #[test]
    fn test_plain_text_without_reserved_chars_only_gains_breaks() {
        let input = "just words\nmore words";
        assert_eq!(render_markdown(input), input.replace('\n', "<br>"));
    }

    #[test]
    fn test_bold_and_inline_code() {
        let out = render_markdown("**bold** and `code`");
        assert_eq!(out, "<strong>bold</strong> and <code>code</code>");
    }

    #[test]
    fn test_bold_before_italic() {
        assert_eq!(
            render_markdown("*it* and **b**"),
            "<em>it</em> and <strong>b</strong>"
        );
    }

    #[test]
    fn test_stray_asterisks_stay_literal() {
        assert_eq!(render_markdown("a ** b"), "a ** b");
        assert_eq!(render_markdown("2 * 3"), "2 * 3");
    }

    #[test]
    fn test_fenced_block_with_label() {
        let out = render_markdown("```python\nprint(1)\n```");
        assert_eq!(
            out,
            "<div class=\"code-block\"><div class=\"code-header\">python</div><pre><code>print(1)</code></pre></div>"
        );
    }

    #[test]
    fn test_fenced_block_default_label() {
        let out = render_markdown("```\nls -la\n```");
        assert!(out.contains("<div class=\"code-header\">code</div>"));
        assert!(out.contains("<pre><code>ls -la</code></pre>"));
    }

    #[test]
    fn test_fenced_body_untouched_by_later_passes() {
        let input = "intro\n```rust\n# not a heading\nlet x = **y** * z;\n- item\n[a](b)\n```\nafter *this*";
        let out = render_markdown(input);
        assert!(out.contains(
            "<pre><code># not a heading\nlet x = **y** * z;\n- item\n[a](b)</code></pre>"
        ));
        assert!(out.starts_with("intro<br>"));
        assert!(out.ends_with("<br>after <em>this</em>"));
        assert!(!out.contains(STASH_OPEN));
    }

    #[test]
    fn test_fenced_body_is_escaped() {
        let out = render_markdown("```html\n<b>&</b>\n```");
        assert!(out.contains("<pre><code>&lt;b&gt;&amp;&lt;/b&gt;</code></pre>"));
    }

    #[test]
    fn test_two_fenced_blocks_non_greedy() {
        let out = render_markdown("```a\none\n```\nmid\n```b\ntwo\n```");
        assert!(out.contains("<div class=\"code-header\">a</div><pre><code>one</code>"));
        assert!(out.contains("<div class=\"code-header\">b</div><pre><code>two</code>"));
        assert!(out.contains("<br>mid<br>"));
    }

    #[test]
    fn test_unclosed_fence_degrades_to_literal() {
        let out = render_markdown("```rust\nfn main() {}");
        assert!(!out.contains("code-block"));
        assert!(out.contains("fn main() {}"));
    }

    #[test]
    fn test_heading_levels() {
        assert_eq!(render_markdown("# Title"), "<h3>Title</h3>");
        assert_eq!(render_markdown("## Sub"), "<h4>Sub</h4>");
        assert_eq!(render_markdown("### Small"), "<h5>Small</h5>");
        assert_eq!(render_markdown("#NoSpace"), "#NoSpace");
        assert_eq!(render_markdown("text # not"), "text # not");
    }

    #[test]
    fn test_list_items_without_container() {
        assert_eq!(
            render_markdown("- one\n- two"),
            "<li>one</li><br><li>two</li>"
        );
        assert_eq!(render_markdown("1. first\n22. second"), "<li>first</li><br><li>second</li>");
    }

    #[test]
    fn test_link_opens_new_context() {
        assert_eq!(
            render_markdown("[docs](https://example.com)"),
            "<a href=\"https://example.com\" target=\"_blank\" rel=\"noopener noreferrer\">docs <i class=\"external-link\"></i></a>"
        );
    }

    #[test]
    fn test_link_quote_cannot_break_attribute() {
        let out = render_markdown("[x](a\"b)");
        assert!(out.contains("href=\"a&quot;b\""));
    }

    #[test]
    fn test_no_raw_markup_from_input_survives() {
        let out = render_markdown("<img src=x> **<b>** `<i>`");
        assert!(!out.contains("<img"));
        assert!(!out.contains("<b>"));
        assert!(!out.contains("<i>"));
        assert_eq!(
            out,
            "&lt;img src=x&gt; <strong>&lt;b&gt;</strong> <code>&lt;i&gt;</code>"
        );
    }

    #[test]
    fn test_forged_placeholder_is_left_alone() {
        let input = format!("x {}7{} y", STASH_OPEN, STASH_CLOSE);
        assert_eq!(render_markdown(&input), "x &#xE000;7&#xE001; y");

        // Index 0 exists once the fence below is stashed.
        let input = format!("x {}0{} y\n```sh\nrm -rf\n```", STASH_OPEN, STASH_CLOSE);
        let out = render_markdown(&input);
        assert_eq!(out.matches("code-block").count(), 1);
        assert!(out.starts_with("x &#xE000;0&#xE001; y<br>"));
        assert!(!out.contains(STASH_OPEN));
    }

    #[test]
    fn test_closing_fence_must_be_its_own_line() {
        let out = render_markdown("```\ncode\n```trailing");
        assert!(!out.contains("code-block"));
        assert!(out.ends_with("trailing"));

        let out = render_markdown("```\ncode\n```  \nafter");
        assert!(out.contains("<pre><code>code</code></pre></div>"));
        assert!(out.ends_with("<br>after"));
    }

    #[test]
    fn test_pass_order_is_documented_order() {
        assert_eq!(PASS_ORDER[0], Pass::Escape);
        assert_eq!(PASS_ORDER[1], Pass::FencedBlocks);
        let bold = PASS_ORDER.iter().position(|p| *p == Pass::Bold);
        let italic = PASS_ORDER.iter().position(|p| *p == Pass::Italic);
        assert!(bold < italic);
        assert_eq!(PASS_ORDER[8], Pass::LineBreaks);
    }
}
