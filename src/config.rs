use serde::{Deserialize, Serialize};
use directories::ProjectDirs;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::mention::DEFAULT_MARKER;
use crate::validation;

// Default configuration
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_REFRESH_SECS: u64 = 5;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the session manager (`/api/send`, `/api/instances`)
    pub server_url: String,
    /// Word between `@` and the recipient id in mention tokens
    pub marker_word: String,
    pub refresh_interval_secs: u64,
    pub auto_refresh: bool,
    pub request_timeout_secs: u64,
    /// Persist dispatch outcomes to the data directory
    pub log_outcomes: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            marker_word: DEFAULT_MARKER.to_string(),
            refresh_interval_secs: DEFAULT_REFRESH_SECS,
            auto_refresh: true,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            log_outcomes: true,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        validation::validate_server_url(&self.server_url).map_err(Error::InvalidSetting)?;
        validation::validate_marker_word(&self.marker_word).map_err(Error::InvalidSetting)?;
        validation::validate_refresh_interval(self.refresh_interval_secs)
            .map_err(Error::InvalidSetting)?;
        if self.request_timeout_secs == 0 {
            return Err(Error::InvalidSetting(
                "Request timeout must be at least 1 second".into(),
            ));
        }
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

pub fn settings_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("org", "mention-relay", "mention-relay")?;
    let dir = proj.config_dir();
    if let Err(e) = fs::create_dir_all(dir) {
        tracing::warn!("Failed to create config dir: {}", e);
        return None;
    }
    Some(dir.join("settings.json"))
}

/// Load settings from the default location. Missing or unreadable files
/// yield `None`; the caller falls back to defaults.
pub fn load_settings() -> Option<Settings> {
    load_settings_from(&settings_path()?).ok()
}

pub fn load_settings_from(path: &Path) -> Result<Settings> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    if let Some(path) = settings_path() {
        save_settings_to(settings, &path)?;
    }
    Ok(())
}

pub fn save_settings_to(settings: &Settings, path: &Path) -> Result<()> {
    let mut file = fs::File::create(path)?;
    let data = serde_json::to_string_pretty(settings)?;
    file.write_all(data.as_bytes())?;
    Ok(())
}
