//! HTTP client for the remote bundle API
//!
//! # Endpoints
//!
//! - `GET   {base}/users/{user_id}/bundle`: the stored document, 404 if none
//! - `PATCH {base}/users/{user_id}/bundle`: merge-upsert, returns the stored
//!   document
//!
//! The API has no push channel, so [`RemoteDocumentStore::subscribe`] polls
//! the document and yields it whenever its write metadata changes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use studysync_core::RemoteDocumentStore;
use studysync_domain::constants::{DEFAULT_REMOTE_POLL_INTERVAL_MS, DEFAULT_REQUEST_TIMEOUT_MS};
use studysync_domain::{CloudBundle, SyncConfig, SyncError};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::http::{BundleClient, RetryPolicy};

/// Configuration for [`HttpDocumentStore`]
#[derive(Debug, Clone)]
pub struct HttpDocumentStoreConfig {
    /// API root, e.g. `https://sync.example.com/v1`
    pub base_url: String,
    pub timeout: Duration,
    /// Total attempts per request (initial try + retries)
    pub max_attempts: usize,
    pub poll_interval: Duration,
    /// Bearer token sent with every request
    pub api_token: Option<String>,
}

impl Default for HttpDocumentStoreConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            max_attempts: 3,
            poll_interval: Duration::from_millis(DEFAULT_REMOTE_POLL_INTERVAL_MS),
            api_token: None,
        }
    }
}

impl HttpDocumentStoreConfig {
    pub fn from_sync_config(base_url: impl Into<String>, sync: &SyncConfig) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: sync.request_timeout(),
            poll_interval: sync.poll_interval(),
            ..Self::default()
        }
    }

    pub fn with_api_token(mut self, token: Option<String>) -> Self {
        self.api_token = token;
        self
    }
}

/// Remote document store reached over HTTP
pub struct HttpDocumentStore {
    client: Arc<BundleClient>,
    base_url: Url,
    poll_interval: Duration,
}

impl HttpDocumentStore {
    /// # Errors
    ///
    /// Returns `SyncError::Client` if the base URL is invalid or the HTTP
    /// client cannot be built
    pub fn new(config: HttpDocumentStoreConfig) -> Result<Self, SyncError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| SyncError::Client(format!("Invalid remote URL {}: {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(SyncError::Client(format!("Remote URL {} cannot be a base", base_url)));
        }

        let client = BundleClient::new(
            config.timeout,
            RetryPolicy::with_attempts(config.max_attempts),
            config.api_token,
        )?;

        Ok(Self { client: Arc::new(client), base_url, poll_interval: config.poll_interval })
    }

    fn endpoint(&self, user_id: &str) -> Result<BundleEndpoint, SyncError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SyncError::Client(format!("Remote URL {} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(["users", user_id, "bundle"]);

        Ok(BundleEndpoint { client: Arc::clone(&self.client), url })
    }
}

/// One user's bundle resource
#[derive(Clone)]
struct BundleEndpoint {
    client: Arc<BundleClient>,
    url: Url,
}

impl BundleEndpoint {
    async fn get(&self) -> Result<Option<CloudBundle>, SyncError> {
        self.client.get(&self.url).await
    }

    async fn patch(&self, bundle: &CloudBundle) -> Result<CloudBundle, SyncError> {
        self.client.patch(&self.url, bundle).await
    }
}

/// Fields that change on every stored write
fn write_marker(bundle: &CloudBundle) -> (i64, Option<i64>, String) {
    (bundle.client_updated_at, bundle.last_synced, bundle.session_id.clone())
}

#[async_trait]
impl RemoteDocumentStore for HttpDocumentStore {
    #[instrument(skip(self))]
    async fn fetch(&self, user_id: &str) -> Result<Option<CloudBundle>, SyncError> {
        let bundle = self.endpoint(user_id)?.get().await?;
        debug!(found = bundle.is_some(), "Fetched remote bundle");
        Ok(bundle)
    }

    #[instrument(skip(self, bundle), fields(buckets = bundle.buckets.len()))]
    async fn merge_upsert(
        &self,
        user_id: &str,
        bundle: &CloudBundle,
    ) -> Result<CloudBundle, SyncError> {
        let stored = self.endpoint(user_id)?.patch(bundle).await?;
        debug!(last_synced = ?stored.last_synced, "Merged bundle into remote document");
        Ok(stored)
    }

    async fn subscribe(&self, user_id: &str) -> Result<BoxStream<'static, CloudBundle>, SyncError> {
        let endpoint = self.endpoint(user_id)?;
        // the current document is the baseline, not a change
        let baseline = endpoint.get().await?.as_ref().map(write_marker);
        let interval = self.poll_interval;

        Ok(stream::unfold((endpoint, baseline), move |(endpoint, mut last_seen)| async move {
            loop {
                tokio::time::sleep(interval).await;
                match endpoint.get().await {
                    Ok(Some(bundle)) => {
                        let marker = write_marker(&bundle);
                        if last_seen.as_ref() != Some(&marker) {
                            last_seen = Some(marker);
                            return Some((bundle, (endpoint, last_seen)));
                        }
                    }
                    Ok(None) => {}
                    Err(err) => warn!(error = %err, "Remote bundle poll failed"),
                }
            }
        })
        .boxed())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;
    use studysync_domain::{Bucket, BucketMap};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn store_for(server: &MockServer) -> HttpDocumentStore {
        HttpDocumentStore::new(HttpDocumentStoreConfig {
            base_url: format!("{}/v1/", server.uri()),
            timeout: Duration::from_secs(2),
            max_attempts: 1,
            poll_interval: Duration::from_millis(20),
            api_token: Some("secret".into()),
        })
        .expect("store")
    }

    fn bundle(at: i64) -> CloudBundle {
        CloudBundle::new(BucketMap::from([(Bucket::Marks, json!({"a": at}))]), at, "dev-1")
    }

    #[tokio::test]
    async fn test_fetch_missing_document_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/users/u1/bundle"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        assert!(store_for(&server).fetch("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fetch_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/users/u1/bundle"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(bundle(7)))
            .expect(1)
            .mount(&server)
            .await;

        let fetched = store_for(&server).fetch("u1").await.unwrap().unwrap();
        assert_eq!(fetched.client_updated_at, 7);
    }

    #[tokio::test]
    async fn test_user_id_is_escaped_in_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/users/a%2Fb/bundle"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        assert!(store_for(&server).fetch("a/b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_merge_upsert_patches_camel_case_body() {
        let server = MockServer::start().await;
        let mut stored = bundle(9);
        stored.last_synced = Some(10);
        Mock::given(method("PATCH"))
            .and(path("/v1/users/u1/bundle"))
            .and(body_partial_json(json!({
                "clientUpdatedAt": 9,
                "sessionId": "dev-1",
                "buckets": { "marks": { "a": 9 } }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(&stored))
            .expect(1)
            .mount(&server)
            .await;

        let result = store_for(&server).merge_upsert("u1", &bundle(9)).await.unwrap();
        assert_eq!(result.last_synced, Some(10));
    }

    #[tokio::test]
    async fn test_error_statuses_are_classified() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(401).set_body_string("token expired"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let store = store_for(&server);
        assert!(matches!(store.merge_upsert("u1", &bundle(1)).await, Err(SyncError::Auth(_))));
        assert!(matches!(store.fetch("u1").await, Err(SyncError::RateLimit(_))));
    }

    #[tokio::test]
    async fn test_subscribe_yields_only_changed_documents() {
        let server = MockServer::start().await;
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        Mock::given(method("GET"))
            .and(path("/v1/users/u1/bundle"))
            .respond_with(move |_req: &wiremock::Request| -> ResponseTemplate {
                // baseline and two unchanged polls, then a new write
                let at = if counter.fetch_add(1, Ordering::SeqCst) < 3 { 1 } else { 2 };
                ResponseTemplate::new(200).set_body_json(bundle(at))
            })
            .mount(&server)
            .await;

        let mut feed = store_for(&server).subscribe("u1").await.unwrap();
        let changed = tokio::time::timeout(Duration::from_secs(2), feed.next())
            .await
            .expect("change within timeout")
            .expect("stream open");

        assert_eq!(changed.client_updated_at, 2);
        assert!(calls.load(Ordering::SeqCst) >= 4);
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let config = HttpDocumentStoreConfig {
            base_url: "not a url".into(),
            ..HttpDocumentStoreConfig::default()
        };
        assert!(matches!(HttpDocumentStore::new(config), Err(SyncError::Client(_))));
    }
}
