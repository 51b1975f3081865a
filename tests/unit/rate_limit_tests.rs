// ==============================
// tests/unit/rate_limit_tests.rs
// ==============================
//! This test suite is designed to validate the functionality of the `RateLimiter`
use backend_lib::middleware::RateLimiter;
use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::Span;

fn rate_limiter() -> Arc<RateLimiter> {
    Arc::new(RateLimiter::new(4, 2.0, Duration::from_secs(180), Span::none()))
}

#[tokio::test(start_paused = true)]
async fn test_rate_limiter_allows_burst_of_four() {
    let rate_limiter = rate_limiter();

    for _ in 0..4 {
        assert!(rate_limiter.allow("127.0.0.1"));
    }

    // Fifth immediate request is denied
    assert!(!rate_limiter.allow("127.0.0.1"));
}

#[tokio::test(start_paused = true)]
async fn test_rate_limiter_refills_over_time() {
    let rate_limiter = rate_limiter();
    for _ in 0..4 {
        rate_limiter.allow("127.0.0.2");
    }

    tokio::time::advance(Duration::from_millis(500)).await;
    assert!(rate_limiter.allow("127.0.0.2"));
    assert!(!rate_limiter.allow("127.0.0.2"));

    tokio::time::advance(Duration::from_secs(2)).await;
    for _ in 0..4 {
        assert!(rate_limiter.allow("127.0.0.2"));
    }
    assert!(!rate_limiter.allow("127.0.0.2"));
}

#[tokio::test(start_paused = true)]
async fn test_different_clients_tracked_separately() {
    let rate_limiter = rate_limiter();

    // Exhaust client 1
    for _ in 0..4 {
        rate_limiter.allow("192.168.0.1");
    }
    assert!(!rate_limiter.allow("192.168.0.1"));

    // Client 2 should still be allowed
    assert!(rate_limiter.allow("192.168.0.2"));
    assert_eq!(rate_limiter.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_callers_share_one_budget() {
    let rate_limiter = rate_limiter();
    let mut handles = Vec::new();
    for _ in 0..16 {
        let rate_limiter = Arc::clone(&rate_limiter);
        handles.push(tokio::spawn(async move { rate_limiter.allow("10.1.1.1") }));
    }

    let mut allowed = 0;
    for handle in handles {
        if handle.await.unwrap() {
            allowed += 1;
        }
    }
    assert_eq!(allowed, 4);
}

#[tokio::test(start_paused = true)]
async fn test_sweeper_evicts_idle_clients_and_stops() {
    let rate_limiter = rate_limiter();
    rate_limiter.allow("idle");

    let shutdown = CancellationToken::new();
    let sweeper = rate_limiter.spawn_sweeper(Duration::from_secs(60), shutdown.clone());

    tokio::time::sleep(Duration::from_secs(150)).await;
    assert_eq!(rate_limiter.len(), 1);

    tokio::time::sleep(Duration::from_secs(100)).await;
    assert!(rate_limiter.is_empty());

    shutdown.cancel();
    sweeper.await.unwrap();
}
