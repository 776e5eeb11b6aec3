use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Submitted text addressed nobody. Raised before any transport call.
    #[error("no recipients: address at least one instance with @{marker}<id>")]
    NoRecipients { marker: String },

    #[error("Please enter a message")]
    EmptyMessage,

    #[error("invalid instance id: {0}")]
    InvalidRecipient(String),

    #[error("invalid setting: {0}")]
    InvalidSetting(String),

    /// The directory endpoint answered but reported a failure.
    #[error("directory refresh failed: {0}")]
    Directory(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
