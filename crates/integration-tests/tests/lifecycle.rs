//! Polling lifecycle tests
//!
//! Drive the client end to end over a scripted gateway with a paused clock.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use docbatch_core::application::{JobCache, JobLifecycleManager};
use docbatch_core::domain::job::fixtures;
use docbatch_core::port::job_gateway::mocks::MockJobGateway;
use docbatch_core::port::time_provider::FixedTimeProvider;
use docbatch_sdk::{
    AppError, DocbatchClient, Job, JobKey, JobStatus, PollConfig, PollOutcome, Session,
};

fn client(gateway: Arc<MockJobGateway>, max_failures: u32) -> DocbatchClient {
    DocbatchClient::with_gateway(
        gateway,
        Session::authenticated("token"),
        PollConfig {
            interval: Duration::from_secs(2),
            max_consecutive_failures: max_failures,
        },
    )
}

fn key() -> JobKey {
    JobKey::new("ws-1", "job-1")
}

/// Terminal state stops the subscription; no fetch happens afterwards
#[tokio::test(start_paused = true)]
async fn test_terminal_status_stops_polling() {
    let gateway = Arc::new(MockJobGateway::with_jobs([
        fixtures::job("job-1", JobStatus::Pending, 10, 0, 0),
        fixtures::job("job-1", JobStatus::Processing, 10, 4, 1),
        fixtures::job("job-1", JobStatus::Completed, 10, 10, 1),
    ]));
    let client = client(gateway.clone(), 5);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let outcome = watch_to_end(&client, key(), move |job| {
        sink.lock().unwrap().push(job.status)
    })
    .await;

    match outcome {
        PollOutcome::Terminal(job) => assert_eq!(job.status, JobStatus::Completed),
        other => panic!("expected terminal outcome, got {:?}", other),
    }
    assert_eq!(
        *seen.lock().unwrap(),
        vec![JobStatus::Pending, JobStatus::Processing, JobStatus::Completed]
    );

    tokio::time::advance(Duration::from_secs(60)).await;
    tokio::task::yield_now().await;
    assert_eq!(gateway.fetch_count(), 3);
}

/// A response that lands after cancel is discarded
#[tokio::test(start_paused = true)]
async fn test_cancel_discards_in_flight_response() {
    let gateway = Arc::new(MockJobGateway::with_jobs([fixtures::job(
        "job-1",
        JobStatus::Processing,
        10,
        2,
        0,
    )]));
    let release = gateway.gate_next_fetch();
    let client = client(gateway.clone(), 5);

    let updates = Arc::new(AtomicUsize::new(0));
    let counter = updates.clone();
    let subscription = client.poll(key(), Duration::from_secs(1), move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    while gateway.fetch_count() == 0 {
        tokio::task::yield_now().await;
    }
    subscription.cancel();
    let _ = release.send(());

    let outcome = subscription.join().await.unwrap();
    assert_eq!(outcome, PollOutcome::Cancelled);
    assert_eq!(updates.load(Ordering::SeqCst), 0);
    assert_eq!(gateway.fetch_count(), 1);
    assert!(client.cached("job-1").is_none());
}

/// Dropping the subscription stops further fetches
#[tokio::test(start_paused = true)]
async fn test_dropped_subscription_stops_fetching() {
    let gateway = Arc::new(MockJobGateway::with_jobs([fixtures::job(
        "job-1",
        JobStatus::Processing,
        10,
        2,
        0,
    )]));
    let client = client(gateway.clone(), 5);

    let subscription = client.poll(key(), Duration::from_secs(1), |_| {});
    while gateway.fetch_count() == 0 {
        tokio::task::yield_now().await;
    }
    drop(subscription);

    tokio::time::advance(Duration::from_secs(30)).await;
    tokio::task::yield_now().await;
    assert_eq!(gateway.fetch_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unauthorized_terminates_polling() {
    let gateway = Arc::new(MockJobGateway::new());
    gateway.push_error(AppError::Unauthorized("token expired".into()));
    let client = client(gateway.clone(), 5);

    let err = client
        .wait_for_completion(key(), |_| {})
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));
    assert_eq!(gateway.fetch_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_not_found_terminates_polling() {
    let gateway = Arc::new(MockJobGateway::new());
    gateway.push_error(AppError::NotFound("job job-1".into()));
    let client = client(gateway.clone(), 5);

    let err = client
        .wait_for_completion(key(), |_| {})
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert_eq!(gateway.fetch_count(), 1);
}

/// Consecutive transient failures escalate once the threshold is reached
#[tokio::test(start_paused = true)]
async fn test_transient_failures_escalate_to_lost_connection() {
    let gateway = Arc::new(MockJobGateway::new());
    for _ in 0..5 {
        gateway.push_error(AppError::Transient("connection refused".into()));
    }
    let client = client(gateway.clone(), 5);

    let err = client
        .wait_for_completion(key(), |_| {})
        .await
        .unwrap_err();
    match err {
        AppError::LostConnection {
            failures,
            last_error,
        } => {
            assert_eq!(failures, 5);
            assert!(last_error.contains("connection refused"));
        }
        other => panic!("expected LostConnection, got {:?}", other),
    }
    assert_eq!(gateway.fetch_count(), 5);
}

/// A success between failures resets the count
#[tokio::test(start_paused = true)]
async fn test_success_resets_failure_count() {
    let gateway = Arc::new(MockJobGateway::new());
    for _ in 0..2 {
        gateway.push_error(AppError::ServerError {
            status: 503,
            detail: "busy".into(),
        });
    }
    gateway.push_job(fixtures::job("job-1", JobStatus::Processing, 4, 2, 0));
    for _ in 0..2 {
        gateway.push_error(AppError::Transient("timeout".into()));
    }
    gateway.push_job(fixtures::job("job-1", JobStatus::Failed, 4, 4, 4));
    let client = client(gateway.clone(), 3);

    let job = client.wait_for_completion(key(), |_| {}).await.unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(gateway.fetch_count(), 6);
}

/// Two subscriptions on the same job share one cache entry; the latest
/// arrival wins.
#[tokio::test(start_paused = true)]
async fn test_subscriptions_share_cache() {
    let gateway = Arc::new(MockJobGateway::with_jobs([
        fixtures::job("job-1", JobStatus::Processing, 10, 3, 0),
        fixtures::job("job-1", JobStatus::Processing, 10, 6, 0),
        fixtures::job("job-1", JobStatus::Completed, 10, 10, 0),
    ]));
    let manager = JobLifecycleManager::new(
        gateway.clone(),
        Arc::new(JobCache::new(Arc::new(FixedTimeProvider(1_700_000_000_000)))),
        PollConfig::default(),
    );

    let first = manager.poll(key(), Duration::from_secs(1), |_| {});
    let second = manager.poll(key(), Duration::from_secs(1), |_| {});

    let first = first.join().await.unwrap();
    let second = second.join().await.unwrap();
    assert!(matches!(first, PollOutcome::Terminal(_)));
    assert!(matches!(second, PollOutcome::Terminal(_)));

    let cached = manager.cached("job-1").unwrap();
    assert_eq!(cached.job.status, JobStatus::Completed);
    assert_eq!(cached.observed_at, 1_700_000_000_000);
    assert!(cached.arrival >= 2);
}

/// A response issued first but arriving last overwrites a newer-issued one
#[tokio::test(start_paused = true)]
async fn test_late_arrival_wins_across_subscriptions() {
    let gateway = Arc::new(MockJobGateway::new());
    let release = gateway.gate_next_fetch();
    // The held fetch pops its response only after the gate opens
    gateway.push_job(fixtures::job("job-1", JobStatus::Completed, 10, 10, 0));
    gateway.push_job(fixtures::job("job-1", JobStatus::Processing, 10, 3, 0));
    let manager = JobLifecycleManager::new(
        gateway.clone(),
        Arc::new(JobCache::new(Arc::new(FixedTimeProvider(1_700_000_000_000)))),
        PollConfig::default(),
    );

    let slow = manager.poll(key(), Duration::from_secs(1), |_| {});
    while gateway.fetch_count() == 0 {
        tokio::task::yield_now().await;
    }

    let fast = manager.poll(key(), Duration::from_secs(1), |_| {});
    assert!(matches!(fast.join().await.unwrap(), PollOutcome::Terminal(_)));
    let cached = manager.cached("job-1").unwrap();
    assert_eq!(cached.arrival, 1);
    assert_eq!(cached.job.status, JobStatus::Completed);

    let _ = release.send(());
    while manager.cached("job-1").map_or(0, |c| c.arrival) < 2 {
        tokio::task::yield_now().await;
    }

    let cached = manager.cached("job-1").unwrap();
    assert_eq!(cached.job.status, JobStatus::Processing);
    assert_eq!(cached.job.completed_items, 3);

    slow.cancel();
    assert_eq!(slow.join().await.unwrap(), PollOutcome::Cancelled);
}

async fn watch_to_end<F>(client: &DocbatchClient, key: JobKey, on_update: F) -> PollOutcome
where
    F: FnMut(&Job) + Send + 'static,
{
    client.manager().watch(key, on_update).join().await.unwrap()
}
