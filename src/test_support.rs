//! Scripted collaborators shared by the unit and integration tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::directory::{DirectorySource, Recipient};
use crate::dispatch::{SendReceipt, Transport};
use crate::error::{Error, Result};
use crate::lifecycle::{ControlReceipt, InstanceControl, LifecycleRequest};
use crate::presentation::{Presentation, PresentationKind};

/// Succeeds for everyone unless told otherwise; records every call.
#[derive(Default)]
pub struct ScriptedTransport {
    failures: HashMap<String, Option<String>>,
    delays_ms: HashMap<String, u64>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedTransport {
    pub fn failing(mut self, recipient: &str, error: &str) -> Self {
        self.failures
            .insert(recipient.to_string(), Some(error.to_string()));
        self
    }

    pub fn rejecting_silently(mut self, recipient: &str) -> Self {
        self.failures.insert(recipient.to_string(), None);
        self
    }

    pub fn delayed(mut self, recipient: &str, millis: u64) -> Self {
        self.delays_ms.insert(recipient.to_string(), millis);
        self
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, recipient_id: &str, body: &str) -> SendReceipt {
        if let Some(ms) = self.delays_ms.get(recipient_id) {
            tokio::time::sleep(Duration::from_millis(*ms)).await;
        }
        self.calls
            .lock()
            .unwrap()
            .push((recipient_id.to_string(), body.to_string()));
        match self.failures.get(recipient_id) {
            Some(Some(error)) => SendReceipt::failed(error.clone()),
            Some(None) => SendReceipt {
                success: false,
                error: None,
            },
            None => SendReceipt::ok(),
        }
    }
}

/// Returns a fixed listing, or an error when constructed with `failing`.
pub struct StaticSource {
    listing: std::result::Result<Vec<Recipient>, String>,
    fetches: Mutex<usize>,
    delay_ms: u64,
}

impl StaticSource {
    pub fn new(listing: Vec<Recipient>) -> Self {
        Self {
            listing: Ok(listing),
            fetches: Mutex::new(0),
            delay_ms: 0,
        }
    }

    pub fn failing(error: &str) -> Self {
        Self {
            listing: Err(error.to_string()),
            fetches: Mutex::new(0),
            delay_ms: 0,
        }
    }

    /// Every fetch sleeps this long before answering.
    pub fn delayed(mut self, millis: u64) -> Self {
        self.delay_ms = millis;
        self
    }

    pub fn fetches(&self) -> usize {
        *self.fetches.lock().unwrap()
    }
}

#[async_trait]
impl DirectorySource for StaticSource {
    async fn fetch(&self) -> Result<Vec<Recipient>> {
        *self.fetches.lock().unwrap() += 1;
        if self.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }
        self.listing.clone().map_err(Error::Directory)
    }
}

/// Accepts every lifecycle request unless told otherwise; records calls.
#[derive(Default)]
pub struct ScriptedControl {
    failures: HashMap<String, String>,
    calls: Mutex<Vec<LifecycleRequest>>,
}

impl ScriptedControl {
    /// Fail requests for `recipient` (or "*" for clean-up) with `error`.
    pub fn failing(mut self, recipient: &str, error: &str) -> Self {
        self.failures
            .insert(recipient.to_string(), error.to_string());
        self
    }

    pub fn calls(&self) -> Vec<LifecycleRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl InstanceControl for ScriptedControl {
    async fn apply(&self, request: &LifecycleRequest) -> ControlReceipt {
        self.calls.lock().unwrap().push(request.clone());
        let key = match request {
            LifecycleRequest::Start(id) | LifecycleRequest::Stop(id) => id.as_str(),
            LifecycleRequest::CleanAll => "*",
        };
        match self.failures.get(key) {
            Some(error) => ControlReceipt::failed(error.clone()),
            None => ControlReceipt::ok(),
        }
    }
}

#[derive(Default)]
pub struct RecordingPresentation {
    entries: Mutex<Vec<(PresentationKind, String)>>,
}

impl RecordingPresentation {
    pub fn entries(&self) -> Vec<(PresentationKind, String)> {
        self.entries.lock().unwrap().clone()
    }
}

impl Presentation for RecordingPresentation {
    fn append(&self, kind: PresentationKind, content: &str) {
        self.entries
            .lock()
            .unwrap()
            .push((kind, content.to_string()));
    }
}
