//! HTTP connection to the session manager.
//!
//! - `POST {server}/api/send` with `{"instance_id", "message"}` answers
//!   `{"success", "error"?}`
//! - `GET {server}/api/instances` answers `{"success", "instances", "error"?}`
//! - `POST {server}/api/start/<id>`, `POST {server}/api/stop/<id>` and
//!   `POST {server}/api/clean` answer `{"success", "error"?, "message"?}`
//!
//! The manager reports failures in the JSON body, often with a non-2xx
//! status, so the body is decoded regardless of status.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::directory::{DirectorySource, Recipient};
use crate::dispatch::{SendReceipt, Transport};
use crate::error::{Error, Result};
use crate::lifecycle::{ControlReceipt, InstanceControl, LifecycleRequest};
use crate::validation;

#[derive(Serialize)]
struct SendRequest<'a> {
    instance_id: &'a str,
    message: &'a str,
}

#[derive(Deserialize)]
struct InstancesResponse {
    success: bool,
    #[serde(default)]
    instances: Vec<Recipient>,
    #[serde(default)]
    error: Option<String>,
}

/// Transport and directory source backed by the manager's HTTP API.
#[derive(Clone, Debug)]
pub struct HttpClient {
    client: Client,
    base: Url,
    send_url: Url,
    instances_url: Url,
}

impl HttpClient {
    pub fn new(server_url: &str, timeout: Duration) -> Result<Self> {
        let mut base = validation::validate_server_url(server_url).map_err(Error::InvalidSetting)?;
        // Keep any path prefix: join() replaces the last segment otherwise.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let join = |p: &str| {
            base.join(p)
                .map_err(|e| Error::InvalidSetting(format!("Invalid server URL: {}", e)))
        };
        let send_url = join("api/send")?;
        let instances_url = join("api/instances")?;

        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base,
            send_url,
            instances_url,
        })
    }

    pub fn send_url(&self) -> &Url {
        &self.send_url
    }

    pub fn instances_url(&self) -> &Url {
        &self.instances_url
    }

    /// Endpoint for a lifecycle request.
    pub fn control_url(&self, request: &LifecycleRequest) -> Result<Url> {
        let path = match request {
            LifecycleRequest::Start(id) => format!("api/start/{}", id),
            LifecycleRequest::Stop(id) => format!("api/stop/{}", id),
            LifecycleRequest::CleanAll => "api/clean".to_string(),
        };
        self.base
            .join(&path)
            .map_err(|e| Error::InvalidRecipient(format!("{}: {}", path, e)))
    }

    async fn post_control(&self, request: &LifecycleRequest) -> Result<ControlReceipt> {
        let url = self.control_url(request)?;
        let response = self.client.post(url).send().await?;
        let status = response.status();
        let receipt: ControlReceipt = response.json().await?;
        debug!(?request, %status, success = receipt.success, "control response");
        Ok(receipt)
    }

    async fn post_send(&self, recipient_id: &str, body: &str) -> Result<SendReceipt> {
        let response = self
            .client
            .post(self.send_url.clone())
            .json(&SendRequest {
                instance_id: recipient_id,
                message: body,
            })
            .send()
            .await?;
        let status = response.status();
        let receipt: SendReceipt = response.json().await?;
        debug!(recipient = recipient_id, %status, success = receipt.success, "send response");
        Ok(receipt)
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn send(&self, recipient_id: &str, body: &str) -> SendReceipt {
        self.post_send(recipient_id, body)
            .await
            .unwrap_or_else(|e| SendReceipt::failed(e.to_string()))
    }
}

#[async_trait]
impl InstanceControl for HttpClient {
    async fn apply(&self, request: &LifecycleRequest) -> ControlReceipt {
        self.post_control(request)
            .await
            .unwrap_or_else(|e| ControlReceipt::failed(e.to_string()))
    }
}

#[async_trait]
impl DirectorySource for HttpClient {
    async fn fetch(&self) -> Result<Vec<Recipient>> {
        let response: InstancesResponse = self
            .client
            .get(self.instances_url.clone())
            .send()
            .await?
            .json()
            .await?;
        if response.success {
            Ok(response.instances)
        } else {
            Err(Error::Directory(
                response.error.unwrap_or_else(|| "unknown error".to_string()),
            ))
        }
    }
}
