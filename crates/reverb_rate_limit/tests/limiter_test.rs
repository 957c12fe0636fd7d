//! Sliding-window behaviour of the per-key rate limiter.

use reverb_rate_limit::RateLimiter;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn test_calls_within_ceiling_never_wait() {
    let limiter = RateLimiter::new(5);
    let start = Instant::now();
    for _ in 0..5 {
        limiter.wait_if_needed("key-a").await;
    }
    assert_eq!(start.elapsed(), Duration::ZERO);
    assert_eq!(limiter.calls_in_window("key-a").await, 5);
}

#[tokio::test(start_paused = true)]
async fn test_call_past_ceiling_waits_for_oldest_to_age_out() {
    let limiter = RateLimiter::new(3);
    let start = Instant::now();

    limiter.wait_if_needed("key-a").await;
    tokio::time::advance(Duration::from_secs(10)).await;
    limiter.wait_if_needed("key-a").await;
    limiter.wait_if_needed("key-a").await;

    limiter.wait_if_needed("key-a").await;
    assert!(start.elapsed() >= Duration::from_secs(60));
    assert!(start.elapsed() < Duration::from_secs(61));
}

#[tokio::test(start_paused = true)]
async fn test_keys_are_throttled_independently() {
    let limiter = RateLimiter::new(1);
    let start = Instant::now();
    limiter.wait_if_needed("key-a").await;
    limiter.wait_if_needed("key-b").await;
    limiter.wait_if_needed("key-c").await;
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_callers_never_overshoot() {
    let limiter = Arc::new(RateLimiter::new(2));
    let start = Instant::now();

    let mut handles = Vec::new();
    for _ in 0..5 {
        let limiter = Arc::clone(&limiter);
        handles.push(tokio::spawn(async move {
            limiter.wait_if_needed("shared").await;
            Instant::now()
        }));
    }

    let mut admitted = Vec::new();
    for handle in handles {
        admitted.push(handle.await.expect("task panicked").duration_since(start));
    }
    admitted.sort();

    assert_eq!(admitted[0], Duration::ZERO);
    assert_eq!(admitted[1], Duration::ZERO);
    assert!(admitted[2] >= Duration::from_secs(60));
    assert!(admitted[3] >= Duration::from_secs(60));
    assert!(admitted[4] >= Duration::from_secs(120));
}
