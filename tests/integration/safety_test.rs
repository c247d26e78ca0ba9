//! Safety Layer Integration Tests
//!
//! Covers spec.md §8's CircuitBreaker round trip and ResourceLimiter
//! `current_tasks` invariant, and end-to-end scenario 5 (bounded
//! concurrency).

use std::sync::Arc;
use std::time::Duration;

use upgrade_orchestrator::safety::{CircuitBreaker, CircuitBreakerConfig, ResourceLimit, ResourceLimiter};

fn fast_breaker() -> CircuitBreaker {
    CircuitBreaker::new(CircuitBreakerConfig {
        failure_threshold: 3,
        window_size: 10,
        error_rate_threshold: 0.9,
        recovery_timeout: Duration::from_millis(50),
        half_open_max_calls: 2,
        success_threshold: 2,
    })
}

#[tokio::test]
async fn opens_after_consecutive_failures_then_closes_after_recovery() {
    let breaker = fast_breaker();

    for _ in 0..3 {
        let _ = breaker.call(|| async { Err::<(), _>("boom") }).await;
    }
    assert_eq!(breaker.get_state().await, upgrade_orchestrator::safety::CircuitState::Open);

    // Still open before recovery_timeout elapses.
    let rejected = breaker.call(|| async { Ok::<_, &str>(()) }).await;
    assert!(rejected.is_err());

    tokio::time::sleep(Duration::from_millis(60)).await;

    // First post-recovery call probes into half-open; one success alone
    // (success_threshold=2) is not enough to close.
    breaker.call(|| async { Ok::<_, &str>(()) }).await.unwrap();
    assert_eq!(breaker.get_state().await, upgrade_orchestrator::safety::CircuitState::HalfOpen);

    breaker.call(|| async { Ok::<_, &str>(()) }).await.unwrap();
    assert_eq!(breaker.get_state().await, upgrade_orchestrator::safety::CircuitState::Closed);
}

#[tokio::test]
async fn half_open_failure_reopens_the_circuit() {
    let breaker = fast_breaker();
    for _ in 0..3 {
        let _ = breaker.call(|| async { Err::<(), _>("boom") }).await;
    }
    tokio::time::sleep(Duration::from_millis(60)).await;

    let _ = breaker.call(|| async { Err::<(), _>("still failing") }).await;
    assert_eq!(breaker.get_state().await, upgrade_orchestrator::safety::CircuitState::Open);
}

#[tokio::test]
async fn resource_limiter_restores_in_flight_count_after_every_outcome() {
    let limiter = ResourceLimiter::new(ResourceLimit {
        max_concurrent_tasks: 4,
        ..Default::default()
    });

    let ok = limiter.execute(|| async { Ok::<_, &str>(()) }).await;
    assert!(ok.is_ok());
    assert_eq!(limiter.get_stats().await.current_tasks, 0);

    let failed = limiter.execute(|| async { Err::<(), _>("boom") }).await;
    assert!(failed.is_err());
    assert_eq!(limiter.get_stats().await.current_tasks, 0);
}

#[tokio::test]
async fn resource_limiter_rejects_beyond_max_concurrent_tasks() {
    let limiter = Arc::new(ResourceLimiter::new(ResourceLimit {
        max_concurrent_tasks: 2,
        ..Default::default()
    }));

    let hold = |limiter: Arc<ResourceLimiter>| async move {
        limiter
            .execute(|| async {
                tokio::time::sleep(Duration::from_millis(150)).await;
                Ok::<_, &str>(())
            })
            .await
    };

    let a = tokio::spawn(hold(Arc::clone(&limiter)));
    let b = tokio::spawn(hold(Arc::clone(&limiter)));
    tokio::time::sleep(Duration::from_millis(20)).await;

    let rejected = limiter.execute(|| async { Ok::<_, &str>(()) }).await;
    assert!(rejected.is_err());

    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();
    assert_eq!(limiter.get_stats().await.current_tasks, 0);
}
