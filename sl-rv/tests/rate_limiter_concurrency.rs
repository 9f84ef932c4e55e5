//! Shared geocoding budget under concurrent load

use sl_rv::services::RateLimiter;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinSet;

#[tokio::test]
async fn slots_are_spaced_across_tasks() {
    // 20 per second, no burst beyond one: 6 slots need at least 250ms
    let limiter = Arc::new(RateLimiter::new(20, 1).unwrap());
    let started = Instant::now();

    let mut set = JoinSet::new();
    for _ in 0..6 {
        let limiter = Arc::clone(&limiter);
        set.spawn(async move { limiter.acquire().await });
    }
    while let Some(joined) = set.join_next().await {
        joined.unwrap();
    }

    assert!(started.elapsed() >= Duration::from_millis(240));
    assert_eq!(limiter.granted(), 6);
}

#[tokio::test]
async fn waiters_are_served_in_arrival_order() {
    let limiter = Arc::new(RateLimiter::new(10, 1).unwrap());
    let order = Arc::new(Mutex::new(Vec::new()));

    // Drain the single burst token so everyone queues
    limiter.acquire().await;

    let mut set = JoinSet::new();
    for i in 0..5 {
        let limiter = Arc::clone(&limiter);
        let order = Arc::clone(&order);
        set.spawn(async move {
            limiter.acquire().await;
            order.lock().await.push(i);
        });
        // Let task i reach the queue before task i + 1 is spawned
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    while let Some(joined) = set.join_next().await {
        joined.unwrap();
    }

    assert_eq!(*order.lock().await, vec![0, 1, 2, 3, 4]);
}
