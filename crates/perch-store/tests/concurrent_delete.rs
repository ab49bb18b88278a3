//! Concurrency tests for the in-memory session store
//!
//! Logout and expiry may race on one key; `delete` must stay idempotent and
//! report at most one removal in total.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use perch_store::{MemorySessionStore, SessionStore};
use perch_types::{CredentialId, SubjectId};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_deletes_remove_once() {
    let store = Arc::new(MemorySessionStore::new());
    let id = CredentialId::new();
    store
        .put(id, &SubjectId::from(1u64), Duration::from_secs(60))
        .await
        .unwrap();

    let tasks = (0..16).map(|_| {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.delete(id).await.unwrap() })
    });

    let removed: u64 = join_all(tasks).await.into_iter().map(|r| r.unwrap()).sum();

    assert_eq!(removed, 1);
    assert_eq!(store.get(id).await.unwrap(), None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_distinct_keys_do_not_interfere() {
    let store = Arc::new(MemorySessionStore::new());
    let subject = SubjectId::from(9u64);
    let ids: Vec<CredentialId> = (0..32).map(|_| CredentialId::new()).collect();

    let puts = ids.iter().map(|id| {
        let store = Arc::clone(&store);
        let subject = subject.clone();
        let id = *id;
        tokio::spawn(async move {
            store.put(id, &subject, Duration::from_secs(60)).await.unwrap();
        })
    });
    join_all(puts).await;

    // Revoke every other entry
    for id in ids.iter().step_by(2) {
        assert_eq!(store.delete(*id).await.unwrap(), 1);
    }

    for (i, id) in ids.iter().enumerate() {
        let live = store.get(*id).await.unwrap();
        if i % 2 == 0 {
            assert_eq!(live, None);
        } else {
            assert_eq!(live, Some(subject.clone()));
        }
    }
}
