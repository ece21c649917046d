//! Relayer client: fire-and-forget transaction requests plus read-only queries.
//!
//! ## Resilience
//!
//! * Dispatches are sent once. A transport error or non-2xx answer is a
//!   [`OracleError::Dispatch`]; the caller resolves the activity as
//!   `InitialError`.
//! * Queries are idempotent and retried with exponential back-off, up to
//!   [`MAX_QUERY_ATTEMPTS`] tries.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::errors::{OracleError, Result};
use crate::models::{lenient, ActivityType};

const MAX_QUERY_ATTEMPTS: u32 = 3;
const INITIAL_BACKOFF_MILLIS: u64 = 250;

/// One transaction request. Serialises to
/// `{ transaction_type, activity_id, url_callback, ..fields }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelayerRequest {
    #[serde(skip)]
    pub path: String,
    pub transaction_type: ActivityType,
    pub activity_id: i64,
    pub url_callback: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[async_trait]
pub trait Relayer: Send + Sync {
    /// Hand a transaction to the Relayer. Returns once it was accepted.
    async fn dispatch(&self, request: &RelayerRequest) -> Result<()>;

    /// Read a single on-chain integer (balance, gains).
    async fn query(&self, path: &str) -> Result<i64>;
}

pub struct HttpRelayer {
    client: Client,
    base_url: String,
    auth_token: String,
}

impl HttpRelayer {
    pub fn new(client: Client, base_url: &str, auth_token: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token: auth_token.to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn query_once(&self, url: &str) -> Result<i64> {
        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.auth_token)
            .send()
            .await?
            .error_for_status()?;
        let body: Value = resp.json().await?;
        lenient::value_to_i64(&body).ok_or_else(|| {
            OracleError::Dispatch(format!("relayer query {url} returned a non-integer: {body}"))
        })
    }
}

#[async_trait]
impl Relayer for HttpRelayer {
    async fn dispatch(&self, request: &RelayerRequest) -> Result<()> {
        let url = self.url(&request.path);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.auth_token)
            .json(request)
            .send()
            .await
            .map_err(|e| OracleError::Dispatch(format!("POST {url}: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(OracleError::Dispatch(format!("POST {url}: {status} {body}")));
        }
        debug!(
            activity_id = request.activity_id,
            activity_type = %request.transaction_type,
            "Relayer accepted transaction"
        );
        Ok(())
    }

    async fn query(&self, path: &str) -> Result<i64> {
        let url = self.url(path);
        let mut backoff = INITIAL_BACKOFF_MILLIS;
        let mut attempt = 1;
        loop {
            match self.query_once(&url).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < MAX_QUERY_ATTEMPTS && e.is_retryable() => {
                    warn!("Relayer query {url} failed (will retry in {backoff}ms): {e}");
                    tokio::time::sleep(Duration::from_millis(backoff)).await;
                    backoff *= 2;
                    attempt += 1;
                }
                Err(OracleError::Http(e)) => {
                    return Err(OracleError::Dispatch(format!("GET {url}: {e}")))
                }
                Err(e) => return Err(e),
            }
        }
    }
}
