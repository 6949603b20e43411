//! Cloud sync engine against the HTTP bundle API (wiremock)

#[path = "support.rs"]
mod support;

use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use studysync_common::time::MockClock;
use studysync_core::{CloudSyncEngine, LocalStore, PushOutcome, StoreKeys};
use studysync_domain::{Bucket, BucketMap, CloudBundle, SyncError};
use studysync_infra::{HttpDocumentStore, HttpDocumentStoreConfig, MemoryStore};
use support::{fast_sync_config, init_tracing};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn remote_at(base_url: String) -> Arc<HttpDocumentStore> {
    Arc::new(
        HttpDocumentStore::new(HttpDocumentStoreConfig {
            base_url,
            timeout: Duration::from_secs(2),
            max_attempts: 2,
            poll_interval: Duration::from_millis(50),
            api_token: None,
        })
        .expect("remote"),
    )
}

fn engine(store: MemoryStore, remote: Arc<HttpDocumentStore>) -> CloudSyncEngine {
    CloudSyncEngine::new(
        "user-1",
        Arc::new(store),
        remote,
        Arc::new(MockClock::at_millis(50_000)),
        StoreKeys::default(),
        fast_sync_config(),
    )
}

#[tokio::test]
async fn test_full_sync_pulls_then_pushes_merged_buckets() {
    init_tracing();
    let server = MockServer::start().await;
    let remote_doc = CloudBundle::new(
        BucketMap::from([(Bucket::Subjects, json!(["biology"]))]),
        40_000,
        "other-device",
    );
    Mock::given(method("GET"))
        .and(path("/users/user-1/bundle"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&remote_doc))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/users/user-1/bundle"))
        .and(body_partial_json(json!({
            "clientUpdatedAt": 50_000,
            "buckets": { "subjects": ["biology"], "notes": "local draft" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(&remote_doc))
        .expect(1)
        .mount(&server)
        .await;

    let store = MemoryStore::new();
    store.set(&StoreKeys::default().bucket(Bucket::Notes), "\"local draft\"").unwrap();
    let engine = engine(store.clone(), remote_at(server.uri()));

    let outcome = engine.full_sync().await.unwrap();

    assert_eq!(outcome, PushOutcome::Pushed { client_updated_at: 50_000 });
    assert_eq!(
        store.get(&StoreKeys::default().bucket(Bucket::Subjects)).unwrap().as_deref(),
        Some("[\"biology\"]")
    );
}

#[tokio::test]
async fn test_server_error_is_reported_not_queued() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database down"))
        .expect(2)
        .mount(&server)
        .await;

    let engine = engine(MemoryStore::new(), remote_at(server.uri()));
    let err = engine.push_user_bundle(None).await.unwrap_err();

    assert!(matches!(err, SyncError::Server(_)));
    assert_eq!(engine.status().pending_writes, 0);
}

#[tokio::test]
async fn test_unreachable_server_queues_write() {
    init_tracing();
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let engine = engine(MemoryStore::new(), remote_at(format!("http://{addr}")));
    let outcome = engine
        .push_user_bundle(Some(BucketMap::from([(Bucket::Todos, json!(["revise"]))])))
        .await
        .unwrap();

    assert_eq!(outcome, PushOutcome::Queued { pending: 1 });
}

#[tokio::test]
async fn test_flush_after_server_recovers() {
    init_tracing();
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let store = MemoryStore::new();
    let offline = engine(store.clone(), remote_at(format!("http://{addr}")));
    offline
        .push_user_bundle(Some(BucketMap::from([(Bucket::Marks, json!({"a": 1}))])))
        .await
        .unwrap();
    offline
        .push_user_bundle(Some(BucketMap::from([(Bucket::Marks, json!({"a": 2, "b": 3}))])))
        .await
        .unwrap();

    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(body_partial_json(json!({ "buckets": { "marks": { "a": 2, "b": 3 } } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(CloudBundle::default()))
        .expect(1)
        .mount(&server)
        .await;

    let online = engine(store, remote_at(server.uri()));
    assert_eq!(online.flush_pending_queue().await.unwrap(), 2);
    assert_eq!(online.status().pending_writes, 0);
}
