//! Bundle requests with bounded retries
//!
//! A request is retried while its failure says the remote may recover on
//! its own: the host could not be reached, the server failed, or it asked
//! us to slow down. Everything else is final on the first attempt.

use std::time::Duration;

use reqwest::{Client, Method, Response, StatusCode};
use studysync_domain::{CloudBundle, SyncError};
use tracing::{debug, warn};
use url::Url;

use crate::errors::{status_error, InfraError};

/// Attempt budget and backoff for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts (initial try + retries), at least one
    pub max_attempts: usize,
    /// Delay before the first retry; doubles for each further retry
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, base_backoff: Duration::from_millis(200) }
    }
}

impl RetryPolicy {
    pub fn with_attempts(max_attempts: usize) -> Self {
        Self { max_attempts: max_attempts.max(1), ..Self::default() }
    }

    fn delay(&self, retry: usize) -> Duration {
        let shift = retry.saturating_sub(1).min(8) as u32;
        self.base_backoff.saturating_mul(1 << shift)
    }
}

/// Failures worth another attempt
fn is_transient(err: &SyncError) -> bool {
    err.is_connectivity() || matches!(err, SyncError::Server(_) | SyncError::RateLimit(_))
}

/// Authenticated GET/PATCH of bundle documents
#[derive(Clone)]
pub struct BundleClient {
    client: Client,
    timeout: Duration,
    retry: RetryPolicy,
    api_token: Option<String>,
}

impl BundleClient {
    /// # Errors
    ///
    /// Returns `SyncError::Client` if the underlying client cannot be built
    pub fn new(
        timeout: Duration,
        retry: RetryPolicy,
        api_token: Option<String>,
    ) -> Result<Self, SyncError> {
        let client = Client::builder()
            .timeout(timeout)
            .no_proxy()
            .build()
            .map_err(|e| SyncError::Client(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, timeout, retry, api_token })
    }

    /// The document at `url`, `None` on 404
    pub async fn get(&self, url: &Url) -> Result<Option<CloudBundle>, SyncError> {
        let response = self.execute(Method::GET, url, None).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        read_bundle(response).await.map(Some)
    }

    /// Merge `bundle` into the document at `url`; returns the stored result
    pub async fn patch(&self, url: &Url, bundle: &CloudBundle) -> Result<CloudBundle, SyncError> {
        let response = self.execute(Method::PATCH, url, Some(bundle)).await?;
        read_bundle(response).await
    }

    /// Send until success, a 404, a final failure or the attempt budget runs
    /// out. Non-success statuses other than 404 come back as errors.
    async fn execute(
        &self,
        method: Method,
        url: &Url,
        body: Option<&CloudBundle>,
    ) -> Result<Response, SyncError> {
        let attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let err = match self.send_once(method.clone(), url, body).await {
                Ok(response) => return Ok(response),
                Err(err) => err,
            };
            if attempt >= attempts || !is_transient(&err) {
                return Err(err);
            }

            let delay = self.retry.delay(attempt);
            warn!(%method, %url, attempt, ?delay, error = %err, "Bundle request failed; retrying");
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            attempt += 1;
        }
    }

    async fn send_once(
        &self,
        method: Method,
        url: &Url,
        body: Option<&CloudBundle>,
    ) -> Result<Response, SyncError> {
        let mut request = self.client.request(method.clone(), url.clone());
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }
        if let Some(bundle) = body {
            request = request.json(bundle);
        }

        let response = request.send().await.map_err(|err| {
            if err.is_timeout() {
                SyncError::Timeout(self.timeout)
            } else {
                SyncError::from(InfraError::from(err))
            }
        })?;

        let status = response.status();
        debug!(%method, %url, %status, "Bundle response");
        if status.is_success() || status == StatusCode::NOT_FOUND {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        Err(status_error(status, &text))
    }
}

async fn read_bundle(response: Response) -> Result<CloudBundle, SyncError> {
    let status = response.status();
    if !status.is_success() {
        return Err(status_error(status, ""));
    }

    response
        .json::<CloudBundle>()
        .await
        .map_err(|e| SyncError::Serialization(format!("Failed to parse bundle: {}", e)))
}
