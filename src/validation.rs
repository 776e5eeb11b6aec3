//! Input validation for settings and recipient identifiers

use reqwest::Url;

/// Longest accepted marker word, in characters
const MAX_MARKER_LEN: usize = 32;

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Validates the word that follows `@` in a mention token
pub fn validate_marker_word(marker: &str) -> Result<(), String> {
    if marker.is_empty() {
        return Err("Marker word cannot be empty".to_string());
    }

    if marker.chars().count() > MAX_MARKER_LEN {
        return Err(format!(
            "Marker word too long (max {} characters)",
            MAX_MARKER_LEN
        ));
    }

    // '@' or whitespace would break token detection in the composer
    if let Some(c) = marker.chars().find(|&c| !is_word_char(c)) {
        return Err(format!("Invalid character '{}' in marker word", c));
    }

    Ok(())
}

/// Validates a recipient identifier (the part after the marker word)
pub fn validate_recipient_id(id: &str) -> Result<(), String> {
    if id.is_empty() {
        return Err("Recipient id cannot be empty".to_string());
    }

    if let Some(c) = id.chars().find(|&c| !is_word_char(c)) {
        return Err(format!("Invalid character '{}' in recipient id", c));
    }

    Ok(())
}

/// Validates the session manager base URL
pub fn validate_server_url(url: &str) -> Result<Url, String> {
    if url.is_empty() {
        return Err("Server URL cannot be empty".to_string());
    }

    let parsed = Url::parse(url).map_err(|e| format!("Invalid server URL '{}': {}", url, e))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(format!("Unsupported URL scheme '{}'", other)),
    }

    if parsed.host_str().map_or(true, str::is_empty) {
        return Err("Server URL must include a host".to_string());
    }

    Ok(parsed)
}

/// Validates the directory polling interval in seconds
pub fn validate_refresh_interval(secs: u64) -> Result<(), String> {
    if !(1..=3600).contains(&secs) {
        return Err("Refresh interval must be between 1 and 3600 seconds".to_string());
    }
    Ok(())
}
