//! End-to-end request sequencing scenarios with real timers.
//!
//! Time is paused, so fetch latencies are exact and the runtime jumps
//! straight to the next timer once everything else is idle.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use millpond::prelude::*;
use millpond::{assert_errored, assert_loaded, assert_status};
use tokio::time::sleep;

/// A study listing whose latency depends on the page: page 1 is slow.
fn slow_first_page(
    calls: Arc<AtomicUsize>,
) -> impl Fn(u32) -> futures::future::BoxFuture<'static, Result<String, String>> + Send + Sync + 'static
{
    use futures::FutureExt;

    move |page: u32| {
        calls.fetch_add(1, Ordering::SeqCst);
        async move {
            let latency = if page == 1 { 500 } else { 10 };
            sleep(Duration::from_millis(latency)).await;
            Ok(format!("studies page {}", page))
        }
        .boxed()
    }
}

// ============================================================================
// Basic lifecycle
// ============================================================================

#[tokio::test(start_paused = true)]
async fn idle_to_loaded_then_new_args() {
    let calls = Arc::new(AtomicUsize::new(0));
    let studies = Resource::new("studies", slow_first_page(calls.clone()));
    assert_status!(studies, Status::Idle);

    studies.request(2, false);
    assert_status!(studies, Status::Loading);
    assert_eq!(studies.snapshot().args(), Some(&2));

    sleep(Duration::from_millis(20)).await;
    assert_loaded!(studies, "studies page 2".to_string());

    studies.request(3, false);
    assert_status!(studies, Status::Loading);
    assert_eq!(studies.snapshot().args(), Some(&3));

    sleep(Duration::from_millis(20)).await;
    assert_loaded!(studies, "studies page 3".to_string());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

// ============================================================================
// Last request wins
// ============================================================================

#[tokio::test(start_paused = true)]
async fn slow_earlier_request_never_clobbers_faster_later_one() {
    let calls = Arc::new(AtomicUsize::new(0));
    let studies = Resource::new("studies", slow_first_page(calls.clone()));

    assert_eq!(studies.request(1, false), Dispatch::Issued { seq: 1 });
    assert_eq!(studies.request(2, false), Dispatch::Issued { seq: 2 });

    sleep(Duration::from_millis(11)).await;
    assert_loaded!(studies, "studies page 2".to_string());

    // Let the slow page-1 fetch finish.
    sleep(Duration::from_millis(600)).await;
    assert_loaded!(studies, "studies page 2".to_string());
    assert_eq!(studies.snapshot().args(), Some(&2));
    assert_eq!(studies.snapshot().request_seq(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn reset_at_sign_out_discards_in_flight_fetch() {
    let calls = Arc::new(AtomicUsize::new(0));
    let studies = Resource::new("studies", slow_first_page(calls));

    studies.request(1, false);
    sleep(Duration::from_millis(100)).await;
    studies.reset();

    sleep(Duration::from_millis(600)).await;
    assert_status!(studies, Status::Idle);
    assert!(studies.view().data.is_none());
}

// ============================================================================
// Coalescing
// ============================================================================

#[tokio::test(start_paused = true)]
async fn repeated_requests_while_loading_fetch_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let studies = Resource::new("studies", slow_first_page(calls.clone()));

    let dispatches: Vec<Dispatch> = (0..10).map(|_| studies.request(1, false)).collect();
    assert!(dispatches[0].is_issued());
    assert!(dispatches[1..].iter().all(|d| *d == Dispatch::Coalesced));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    sleep(Duration::from_millis(600)).await;
    assert_loaded!(studies, "studies page 1".to_string());

    // Cached now; still a single fetch.
    assert_eq!(studies.request(1, false), Dispatch::Cached);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn concurrent_consumers_share_one_fetch() {
    let calls = Arc::new(AtomicUsize::new(0));
    let studies = Resource::new("studies", slow_first_page(calls.clone()));

    let consumers: Vec<_> = (0..5)
        .map(|_| {
            let studies = studies.clone();
            tokio::spawn(async move {
                studies.request(2, false);
                studies.subscribe().wait_settled().await
            })
        })
        .collect();

    for consumer in consumers {
        let state = consumer.await.unwrap().unwrap();
        assert_eq!(state.data(), Some(&"studies page 2".to_string()));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Errors and retry
// ============================================================================

#[tokio::test(start_paused = true)]
async fn error_then_forced_retry() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = attempts.clone();
    let studies: Resource<u32, String, String> = Resource::new("studies", move |_: u32| {
        let attempt = counter.fetch_add(1, Ordering::SeqCst);
        async move {
            sleep(Duration::from_millis(5)).await;
            if attempt == 0 {
                Err("network down".to_string())
            } else {
                Ok("A".to_string())
            }
        }
    });

    studies.request(1, false);
    sleep(Duration::from_millis(10)).await;
    assert_errored!(studies, "network down");
    assert!(studies.view().data.is_none());

    // No automatic retry.
    assert_eq!(studies.request(1, false), Dispatch::Cached);
    sleep(Duration::from_millis(10)).await;
    assert_eq!(attempts.load(Ordering::SeqCst), 1);

    assert!(studies.request(1, true).is_issued());
    sleep(Duration::from_millis(10)).await;
    assert_loaded!(studies, "A".to_string());
    assert!(studies.view().error.is_none());
}

#[tokio::test(start_paused = true)]
async fn failure_keeps_last_good_data() {
    let studies: Resource<u32, String, String> = Resource::new("studies", |page: u32| async move {
        sleep(Duration::from_millis(5)).await;
        if page == 1 {
            Ok("page one".to_string())
        } else {
            Err(format!("page {} is unavailable", page))
        }
    });

    studies.request(1, false);
    sleep(Duration::from_millis(10)).await;
    studies.request(2, false);
    sleep(Duration::from_millis(10)).await;

    assert_errored!(studies, "page 2 is unavailable");
    assert_eq!(studies.view().data, Some("page one".to_string()));
}

// ============================================================================
// Observing
// ============================================================================

#[tokio::test(start_paused = true)]
async fn subscription_sees_loading_then_loaded() {
    let calls = Arc::new(AtomicUsize::new(0));
    let studies = Resource::new("studies", slow_first_page(calls));
    let mut updates = studies.subscribe();

    studies.request(2, false);
    let loading = updates.changed().await.unwrap();
    assert_eq!(loading.status, Status::Loading);

    let loaded = updates.changed().await.unwrap();
    assert_eq!(loaded.status, Status::Loaded);
    assert_eq!(loaded.data, Some("studies page 2".to_string()));
}

#[tokio::test]
async fn subscription_ends_when_resource_is_dropped() {
    let studies = Resource::new("studies", |_: u32| async { Ok::<u32, String>(1) });
    let mut updates = studies.subscribe();
    drop(studies);

    assert!(updates.changed().await.is_none());
}
