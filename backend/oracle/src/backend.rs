//! Backend client: completion and failure notifications.

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::errors::{OracleError, Result};
use crate::events::BackendEvent;

#[async_trait]
pub trait Backend: Send + Sync {
    /// Deliver one event. Sent once; the caller decides what a failure means.
    async fn notify(&self, event: &BackendEvent) -> Result<()>;
}

pub struct HttpBackend {
    client: Client,
    base_url: String,
    auth_token: String,
}

impl HttpBackend {
    pub fn new(client: Client, base_url: &str, auth_token: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token: auth_token.to_string(),
        }
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn notify(&self, event: &BackendEvent) -> Result<()> {
        let url = format!("{}{}", self.base_url, event.path);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.auth_token)
            .json(&event.body)
            .send()
            .await
            .map_err(|e| OracleError::Dispatch(format!("POST {url}: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(OracleError::Dispatch(format!("POST {url}: {status}")));
        }
        debug!(path = %event.path, "Backend notified");
        Ok(())
    }
}
