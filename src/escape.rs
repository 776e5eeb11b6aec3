//! Reserved-character escaping for arbitrary text placed into markup.

use std::borrow::Cow;

/// Escape `&`, `<` and `>` so the text can be embedded as markup content.
///
/// Quotes are left alone; use [`escape_attribute_quotes`] for text that ends
/// up inside a double-quoted attribute.
pub fn escape_markup(text: &str) -> Cow<'_, str> {
    html_escape::encode_text(text)
}

/// Escape `"` in text that has already been through [`escape_markup`].
pub fn escape_attribute_quotes(text: &str) -> Cow<'_, str> {
    if text.contains('"') {
        Cow::Owned(text.replace('"', "&quot;"))
    } else {
        Cow::Borrowed(text)
    }
}
