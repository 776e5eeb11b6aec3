//! Recipient directory: the list of instances that can be addressed.
//!
//! The core only ever reads snapshots. The backend poller owns refreshes and
//! swaps the whole list in one go through [`SharedDirectory::replace`].

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// An addressable recipient.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Recipient {
    pub id: String,
    #[serde(rename = "details", default)]
    pub detail: Option<String>,
}

impl Recipient {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Case-insensitive substring match against the id or the detail.
    /// `query_lower` must already be lowercase.
    pub fn matches_query(&self, query_lower: &str) -> bool {
        self.id.to_lowercase().contains(query_lower)
            || self
                .detail
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(query_lower))
    }
}

/// Synchronous read of the latest known recipient list.
pub trait Directory {
    fn snapshot(&self) -> Vec<Recipient>;
}

impl Directory for Vec<Recipient> {
    fn snapshot(&self) -> Vec<Recipient> {
        self.clone()
    }
}

impl Directory for [Recipient] {
    fn snapshot(&self) -> Vec<Recipient> {
        self.to_vec()
    }
}

/// Where fresh directory listings come from.
#[async_trait]
pub trait DirectorySource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<Recipient>>;
}

/// Directory cache shared between the poller (writer) and the session
/// (reader).
#[derive(Clone, Default, Debug)]
pub struct SharedDirectory {
    inner: Arc<RwLock<Vec<Recipient>>>,
}

impl SharedDirectory {
    pub fn new(recipients: Vec<Recipient>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(recipients)),
        }
    }

    pub fn replace(&self, recipients: Vec<Recipient>) {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *guard = recipients;
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Directory for SharedDirectory {
    fn snapshot(&self) -> Vec<Recipient> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
