mod common;

use common::{CountingStore, FailingStore};
use futures::future::join_all;
use gen_guard::clock::ManualClock;
use gen_guard::resilience::{Admission, RateLimitConfig, SlidingWindowLimiter};
use gen_guard::store::{DocumentStore, MemoryStore};
use gen_guard::Error;
use std::sync::Arc;
use std::time::Duration;

const START: i64 = 1_700_000_000_000;

fn limiter(store: Arc<dyn DocumentStore>, clock: &Arc<ManualClock>) -> SlidingWindowLimiter {
    SlidingWindowLimiter::new(store, RateLimitConfig::default()).with_clock(clock.clone())
}

#[tokio::test]
async fn test_sixth_request_in_window_is_rejected() {
    let clock = Arc::new(ManualClock::new(START));
    let limiter = limiter(Arc::new(MemoryStore::new()), &clock);

    for _ in 0..5 {
        assert!(matches!(
            limiter.check("userX").await.unwrap(),
            Admission::Allowed { .. }
        ));
        clock.advance(Duration::from_secs(1));
    }

    let err = limiter.check("userX").await.unwrap_err();
    match err {
        Error::RateLimitExceeded { wait_minutes } => assert!(wait_minutes > 0),
        other => panic!("expected rate limit, got {:?}", other),
    }
    assert!(err.user_message().contains("minute"));

    clock.advance(Duration::from_secs(10 * 60));
    assert!(matches!(
        limiter.check("userX").await.unwrap(),
        Admission::Allowed { .. }
    ));
}

#[tokio::test]
async fn test_identities_have_separate_windows() {
    let clock = Arc::new(ManualClock::new(START));
    let limiter = limiter(Arc::new(MemoryStore::new()), &clock);

    for _ in 0..5 {
        limiter.check("alice").await.unwrap();
    }
    assert!(limiter.check("alice").await.is_err());
    assert_eq!(
        limiter.check("bob").await.unwrap(),
        Admission::Allowed { remaining: 4 }
    );
}

#[tokio::test]
async fn test_store_outage_fails_open() {
    let clock = Arc::new(ManualClock::new(START));
    let limiter = limiter(Arc::new(FailingStore), &clock);

    for _ in 0..10 {
        let admission = limiter.check("userX").await.unwrap();
        let failure = admission.soft_failure().expect("fail-open admission");
        assert_eq!(failure.component, "rate_limiter");
    }
}

#[tokio::test]
async fn test_concurrent_checks_never_overshoot_with_atomic_store() {
    let clock = Arc::new(ManualClock::new(START));
    let limiter = limiter(Arc::new(MemoryStore::new()), &clock);

    let results = join_all((0..20).map(|_| limiter.check("burst"))).await;
    let allowed = results.iter().filter(|r| r.is_ok()).count();
    let rejected = results
        .iter()
        .filter(|r| matches!(r, Err(Error::RateLimitExceeded { .. })))
        .count();

    assert_eq!(allowed, 5);
    assert_eq!(rejected, 15);
}

#[tokio::test]
async fn test_window_document_shape() {
    let clock = Arc::new(ManualClock::new(START));
    let store = Arc::new(CountingStore::new());
    let limiter = SlidingWindowLimiter::new(
        store.clone(),
        RateLimitConfig::new().with_collection("limits"),
    )
    .with_clock(clock.clone());

    limiter.check("teacher-1").await.unwrap();
    clock.advance(Duration::from_millis(250));
    limiter.check("teacher-1").await.unwrap();

    let doc = store.get("limits", "teacher-1").await.unwrap().unwrap();
    assert_eq!(doc, serde_json::json!({ "requests": [START, START + 250] }));
}
