//! Cloud sync between devices of one user through the in-memory remote

#[path = "support.rs"]
mod support;

use std::sync::Arc;

use serde_json::json;
use studysync_common::assert_eventually_async;
use studysync_core::{PushOutcome, RemoteDocumentStore, SyncEvent};
use studysync_domain::{Bucket, BucketMap, CloudBundle};
use studysync_infra::{InMemoryDocumentStore, MemoryStore};
use support::{init_tracing, Device, SETTLE};

#[tokio::test]
async fn test_edit_on_one_device_reaches_the_other() {
    init_tracing();
    let remote = Arc::new(InMemoryDocumentStore::new());
    let laptop = Device::new(MemoryStore::new(), remote.clone(), "user-1");
    let phone = Device::new(MemoryStore::new(), remote.clone(), "user-1");
    laptop.engine.start().await.unwrap();
    phone.engine.start().await.unwrap();
    let mut laptop_events = laptop.engine.subscribe_events();

    laptop.edit(Bucket::Todos, json!(["read chapter 3"]));

    assert_eventually_async!(SETTLE, async {
        phone.bucket(Bucket::Todos) == Some(json!(["read chapter 3"]))
    });

    // the laptop saw its own write come back and ignored it
    let mut pushed = Vec::new();
    let mut applied = Vec::new();
    while let Ok(event) = laptop_events.try_recv() {
        match event {
            SyncEvent::Pushed { client_updated_at } => pushed.push(client_updated_at),
            SyncEvent::RemoteApplied { client_updated_at, .. } => applied.push(client_updated_at),
            _ => {}
        }
    }
    assert!(!pushed.is_empty());
    assert!(pushed.iter().all(|at| !applied.contains(at)));

    laptop.engine.stop().await.unwrap();
    phone.engine.stop().await.unwrap();
}

#[tokio::test]
async fn test_hydrated_data_is_not_pushed_back() {
    init_tracing();
    let remote = Arc::new(InMemoryDocumentStore::new());
    let laptop = Device::new(MemoryStore::new(), remote.clone(), "user-1");
    let phone = Device::new(MemoryStore::new(), remote.clone(), "user-1");
    laptop.engine.start().await.unwrap();
    phone.engine.start().await.unwrap();

    laptop.edit(Bucket::Notes, json!("photosynthesis"));
    assert_eventually_async!(SETTLE, async {
        phone.bucket(Bucket::Notes) == Some(json!("photosynthesis"))
    });

    // give a debounced push from the phone every chance to fire
    tokio::time::sleep(std::time::Duration::from_millis(300)).await;
    let stored = remote.document("user-1").unwrap();
    assert_eq!(stored.session_id, laptop.engine.session_id().as_str());
    assert!(phone.engine.status().last_pushed_at.map_or(true, |at| at < stored.client_updated_at));

    laptop.engine.stop().await.unwrap();
    phone.engine.stop().await.unwrap();
}

#[tokio::test]
async fn test_sign_in_pulls_existing_document() {
    init_tracing();
    let remote = Arc::new(InMemoryDocumentStore::new());
    remote
        .merge_upsert(
            "user-1",
            &CloudBundle::new(
                BucketMap::from([
                    (Bucket::DailyGoal, json!({"minutes": 90})),
                    (Bucket::Subjects, serde_json::Value::Null),
                ]),
                1_000,
                "old-device",
            ),
        )
        .await
        .unwrap();

    let tablet = Device::new(MemoryStore::new(), remote.clone(), "user-1");
    tablet.engine.start().await.unwrap();

    assert_eq!(tablet.bucket(Bucket::DailyGoal), Some(json!({"minutes": 90})));
    assert_eq!(tablet.bucket(Bucket::Subjects), None);
    assert_eq!(tablet.engine.status().last_remote_seen, Some(1_000));

    tablet.engine.stop().await.unwrap();
}

#[tokio::test]
async fn test_offline_edits_flush_on_reconnect() {
    init_tracing();
    let remote = Arc::new(InMemoryDocumentStore::new());
    let laptop = Device::new(MemoryStore::new(), remote.clone(), "user-1");
    laptop.engine.start().await.unwrap();

    laptop.network.set_online(false);
    let first = laptop
        .engine
        .push_user_bundle(Some(BucketMap::from([(Bucket::Marks, json!({"math": 80}))])))
        .await
        .unwrap();
    assert_eq!(first, PushOutcome::Queued { pending: 1 });
    let second = laptop
        .engine
        .push_user_bundle(Some(BucketMap::from([(Bucket::Marks, json!({"math": 85, "bio": 70}))])))
        .await
        .unwrap();
    assert_eq!(second, PushOutcome::Queued { pending: 2 });
    assert_eq!(laptop.engine.status().pending_writes, 2);

    laptop.network.set_online(true);

    assert_eventually_async!(SETTLE, async { laptop.engine.status().pending_writes == 0 });
    let stored = remote.document("user-1").unwrap();
    assert_eq!(stored.buckets[&Bucket::Marks], json!({"math": 85, "bio": 70}));

    laptop.engine.stop().await.unwrap();
}

#[tokio::test]
async fn test_unreachable_remote_queues_then_flushes_on_restart() {
    init_tracing();
    let remote = Arc::new(InMemoryDocumentStore::new());
    let store = MemoryStore::new();
    let laptop = Device::new(store.clone(), remote.clone(), "user-1");

    remote.set_reachable(false);
    let outcome = laptop
        .engine
        .push_user_bundle(Some(BucketMap::from([(Bucket::Profile, json!({"name": "Ada"}))])))
        .await
        .unwrap();
    assert_eq!(outcome, PushOutcome::Queued { pending: 1 });
    assert!(remote.document("user-1").is_none());

    // a new session on the same store finds the queue
    remote.set_reachable(true);
    let relaunched = Device::new(store, remote.clone(), "user-1");
    relaunched.engine.start().await.unwrap();

    assert_eq!(relaunched.engine.status().pending_writes, 0);
    assert_eq!(remote.document("user-1").unwrap().buckets[&Bucket::Profile], json!({"name": "Ada"}));

    relaunched.engine.stop().await.unwrap();
}

#[tokio::test]
async fn test_sibling_tab_edit_is_pushed() {
    init_tracing();
    let remote = Arc::new(InMemoryDocumentStore::new());
    let store = MemoryStore::new();
    let syncing_tab = Device::new(store.clone(), remote.clone(), "user-1");
    syncing_tab.engine.start().await.unwrap();

    // another tab of the profile writes without running an engine
    let quiet_tab = Device::new(store.sibling(), remote.clone(), "user-1");
    quiet_tab.edit(Bucket::Resources, json!([{"url": "https://example.org/notes"}]));

    assert_eventually_async!(SETTLE, async {
        remote
            .document("user-1")
            .is_some_and(|doc| doc.buckets.contains_key(&Bucket::Resources))
    });

    syncing_tab.engine.stop().await.unwrap();
}

#[tokio::test]
async fn test_users_do_not_share_documents() {
    init_tracing();
    let remote = Arc::new(InMemoryDocumentStore::new());
    let alice = Device::new(MemoryStore::new(), remote.clone(), "alice");
    let bob = Device::new(MemoryStore::new(), remote.clone(), "bob");
    alice.engine.start().await.unwrap();
    bob.engine.start().await.unwrap();

    alice.edit(Bucket::Achievements, json!(["first-week"]));
    assert_eventually_async!(SETTLE, async { remote.document("alice").is_some() });

    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    assert_eq!(bob.bucket(Bucket::Achievements), None);

    alice.engine.stop().await.unwrap();
    bob.engine.stop().await.unwrap();
}
