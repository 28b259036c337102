use std::sync::Arc;
use std::time::Duration;

use edge_offload::scheduler::{FetchOutcome, HostId, JobStore, ResultKey};

fn host(name: &str) -> HostId {
    HostId::new(name)
}

#[tokio::test]
async fn test_ids_follow_queue_order_under_concurrent_submit() {
    let store = Arc::new(JobStore::new());

    let mut handles = Vec::new();
    for i in 0..50 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store
                .submit(host(&format!("10.0.0.{}", i % 5)), i.to_string(), "p".into())
                .await
        }));
    }
    let mut ids = Vec::new();
    for h in handles {
        ids.push(h.await.unwrap());
    }

    // Unique and dense
    ids.sort_unstable();
    assert_eq!(ids, (0..50).collect::<Vec<_>>());

    // Queue order matches id order
    assert_eq!(store.queued_job_ids().await, (0..50).collect::<Vec<_>>());

    // And the backend sees them in that order
    for expected in 0..50 {
        let job = store.next_job().await;
        assert_eq!(job.job_id, expected);
    }
    assert!(store.queue_is_empty().await);
}

#[tokio::test]
async fn test_result_lifecycle_pending_ready_purged() {
    let store = JobStore::new();
    let a = host("10.0.0.1");

    let id = store.submit(a.clone(), "1.3".into(), "p".into()).await;
    let key = ResultKey::new(a.clone(), id);

    assert_eq!(store.fetch(&key).await, FetchOutcome::Pending);
    // Polling a pending result does not consume it
    assert_eq!(store.fetch(&key).await, FetchOutcome::Pending);
    assert_eq!(store.outstanding_results().await, 1);

    let job = store.next_job().await;
    assert!(store.complete(&job.key(), "done".into()).await);

    assert_eq!(
        store.fetch(&key).await,
        FetchOutcome::Delivered("done".into())
    );
    // Delivered exactly once, then purged
    assert_eq!(store.fetch(&key).await, FetchOutcome::Unknown);
    assert_eq!(store.outstanding_results().await, 0);
}

#[tokio::test]
async fn test_result_is_scoped_to_submitting_host() {
    let store = JobStore::new();
    let id = store.submit(host("10.0.0.1"), "1".into(), "p".into()).await;

    let foreign = ResultKey::new(host("10.0.0.2"), id);
    assert_eq!(store.fetch(&foreign).await, FetchOutcome::Unknown);

    let job = store.next_job().await;
    store.complete(&job.key(), "out".into()).await;
    assert_eq!(store.fetch(&foreign).await, FetchOutcome::Unknown);

    // The owner still gets it
    let owner = ResultKey::new(host("10.0.0.1"), id);
    assert_eq!(store.fetch(&owner).await, FetchOutcome::Delivered("out".into()));
}

#[tokio::test]
async fn test_complete_only_resolves_pending_entries() {
    let store = JobStore::new();
    let a = host("10.0.0.1");
    let id = store.submit(a.clone(), "1".into(), "p".into()).await;
    let key = ResultKey::new(a.clone(), id);

    assert!(store.complete(&key, "first".into()).await);
    assert!(!store.complete(&key, "second".into()).await);
    assert!(!store.complete(&ResultKey::new(a, 99), "ghost".into()).await);

    assert_eq!(store.fetch(&key).await, FetchOutcome::Delivered("first".into()));
}

#[tokio::test]
async fn test_next_job_blocks_until_submit() {
    let store = Arc::new(JobStore::new());

    let waiter = {
        let store = store.clone();
        tokio::spawn(async move { store.next_job().await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!waiter.is_finished());

    let id = store.submit(host("10.0.0.7"), "2".into(), "p".into()).await;
    let job = tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .expect("backend should wake on submit")
        .unwrap();
    assert_eq!(job.job_id, id);
    assert_eq!(job.input, "2");
}

#[tokio::test]
async fn test_queued_hosts_are_distinct_in_arrival_order() {
    let store = JobStore::new();
    for name in ["b", "a", "b", "c", "a"] {
        store.submit(host(name), "1".into(), "p".into()).await;
    }
    assert_eq!(
        store.queued_hosts().await,
        vec![host("b"), host("a"), host("c")]
    );

    // Dispatch removes the job from the queue immediately
    store.next_job().await;
    assert_eq!(store.queued_job_ids().await, vec![1, 2, 3, 4]);
}
