//! Circuit Breaker
//!
//! Protects each agent from cascading LLM/provider failures via the classic
//! three-state machine. Ported from
//! `backend/packages/safety/circuit_breaker.py`: the Python original guards
//! its state behind an `asyncio.Lock` held only around the admission check
//! and the outcome recording, never across the wrapped call itself — the
//! same discipline is kept here with `tokio::sync::Mutex`, so a slow call
//! never blocks unrelated admission checks on other agents' breakers
//! (each agent owns its own `CircuitBreaker` instance).

use std::collections::VecDeque;
use std::future::Future;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub window_size: usize,
    pub error_rate_threshold: f64,
    pub recovery_timeout: Duration,
    pub half_open_max_calls: u32,
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            window_size: 10,
            error_rate_threshold: 0.5,
            recovery_timeout: Duration::from_secs(60),
            half_open_max_calls: 3,
            success_threshold: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CircuitBreakerStats {
    pub state: CircuitState,
    pub total_calls: u64,
    pub successful_calls: u64,
    pub failed_calls: u64,
    pub consecutive_successes: u32,
    pub consecutive_failures: u32,
    #[serde(skip)]
    pub last_success_at: Option<Instant>,
    #[serde(skip)]
    pub last_failure_at: Option<Instant>,
    pub current_error_rate: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError<E> {
    #[error("circuit breaker open")]
    Open,
    #[error(transparent)]
    Inner(E),
}

struct Inner {
    state: CircuitState,
    consecutive_failures: u32,
    consecutive_successes: u32,
    half_open_calls: u32,
    window: VecDeque<bool>,
    total_calls: u64,
    successful_calls: u64,
    failed_calls: u64,
    last_success_at: Option<Instant>,
    last_failure_at: Option<Instant>,
}

impl Inner {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            consecutive_successes: 0,
            half_open_calls: 0,
            window: VecDeque::new(),
            total_calls: 0,
            successful_calls: 0,
            failed_calls: 0,
            last_success_at: None,
            last_failure_at: None,
        }
    }

    fn error_rate(&self) -> f64 {
        if self.window.is_empty() {
            return 0.0;
        }
        let failures = self.window.iter().filter(|ok| !**ok).count();
        failures as f64 / self.window.len() as f64
    }
}

/// Per-agent circuit breaker. Not `Clone` — each agent owns exactly one.
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self { config, inner: Mutex::new(Inner::new()) }
    }

    /// Wraps any fallible async call with admission control and outcome
    /// recording. `f` is only invoked while the breaker is CLOSED or
    /// admitting a HALF_OPEN probe.
    pub async fn call<T, E, F, Fut>(&self, f: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        {
            let mut inner = self.inner.lock().await;
            match inner.state {
                CircuitState::Open => {
                    let elapsed = inner.last_failure_at.map(|t| t.elapsed()).unwrap_or(Duration::MAX);
                    if elapsed > self.config.recovery_timeout {
                        inner.state = CircuitState::HalfOpen;
                        inner.half_open_calls = 1;
                        inner.consecutive_successes = 0;
                        inner.consecutive_failures = 0;
                    } else {
                        return Err(CircuitBreakerError::Open);
                    }
                }
                CircuitState::HalfOpen => {
                    if inner.half_open_calls >= self.config.half_open_max_calls {
                        return Err(CircuitBreakerError::Open);
                    }
                    inner.half_open_calls += 1;
                }
                CircuitState::Closed => {}
            }
        }

        let outcome = f().await;

        let mut inner = self.inner.lock().await;
        inner.total_calls += 1;
        match &outcome {
            Ok(_) => {
                inner.successful_calls += 1;
                inner.consecutive_successes += 1;
                inner.consecutive_failures = 0;
                inner.last_success_at = Some(Instant::now());
                push_window(&mut inner.window, self.config.window_size, true);

                if inner.state == CircuitState::HalfOpen {
                    if inner.consecutive_successes >= self.config.success_threshold {
                        inner.state = CircuitState::Closed;
                        inner.consecutive_successes = 0;
                        inner.consecutive_failures = 0;
                        inner.half_open_calls = 0;
                    } else if inner.half_open_calls >= self.config.half_open_max_calls {
                        inner.state = CircuitState::Open;
                        inner.half_open_calls = 0;
                    }
                }
            }
            Err(_) => {
                inner.failed_calls += 1;
                inner.consecutive_failures += 1;
                inner.consecutive_successes = 0;
                inner.last_failure_at = Some(Instant::now());
                push_window(&mut inner.window, self.config.window_size, false);

                match inner.state {
                    CircuitState::HalfOpen => {
                        inner.state = CircuitState::Open;
                        inner.half_open_calls = 0;
                        inner.consecutive_failures = 0;
                    }
                    CircuitState::Closed => {
                        let rate_trip = inner.error_rate() >= self.config.error_rate_threshold
                            && inner.window.len() >= self.config.window_size;
                        if inner.consecutive_failures >= self.config.failure_threshold || rate_trip {
                            inner.state = CircuitState::Open;
                        }
                    }
                    CircuitState::Open => {}
                }
            }
        }

        outcome.map_err(CircuitBreakerError::Inner)
    }

    pub async fn get_state(&self) -> CircuitState {
        self.inner.lock().await.state
    }

    pub async fn get_stats(&self) -> CircuitBreakerStats {
        let inner = self.inner.lock().await;
        CircuitBreakerStats {
            state: inner.state,
            total_calls: inner.total_calls,
            successful_calls: inner.successful_calls,
            failed_calls: inner.failed_calls,
            consecutive_successes: inner.consecutive_successes,
            consecutive_failures: inner.consecutive_failures,
            last_success_at: inner.last_success_at,
            last_failure_at: inner.last_failure_at,
            current_error_rate: inner.error_rate(),
        }
    }

    /// Force-open without touching counters.
    pub async fn manual_open(&self) {
        let mut inner = self.inner.lock().await;
        inner.state = CircuitState::Open;
        inner.last_failure_at = Some(Instant::now());
    }

    /// Force-closed without touching counters.
    pub async fn manual_close(&self) {
        let mut inner = self.inner.lock().await;
        inner.state = CircuitState::Closed;
        inner.half_open_calls = 0;
    }

    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        *inner = Inner::new();
    }
}

fn push_window(window: &mut VecDeque<bool>, max: usize, outcome: bool) {
    window.push_back(outcome);
    while window.len() > max {
        window.pop_front();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: 3,
            window_size: 10,
            error_rate_threshold: 0.9,
            recovery_timeout: Duration::from_millis(10),
            half_open_max_calls: 2,
            success_threshold: 2,
        }
    }

    #[tokio::test]
    async fn opens_after_consecutive_failures() {
        let cb = CircuitBreaker::new(fast_config());
        for _ in 0..3 {
            let _ = cb.call(|| async { Err::<(), _>("boom") }).await;
        }
        assert_eq!(cb.get_state().await, CircuitState::Open);
    }

    #[tokio::test]
    async fn rejects_while_open() {
        let cb = CircuitBreaker::new(fast_config());
        cb.manual_open().await;
        let result = cb.call(|| async { Ok::<_, &str>(1) }).await;
        assert!(matches!(result, Err(CircuitBreakerError::Open)));
    }

    #[tokio::test]
    async fn transitions_to_half_open_after_recovery_timeout() {
        let cb = CircuitBreaker::new(fast_config());
        cb.manual_open().await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        let _ = cb.call(|| async { Ok::<_, &str>(1) }).await;
        // One success in half-open, below success_threshold of 2.
        assert_eq!(cb.get_state().await, CircuitState::HalfOpen);
    }

    #[tokio::test]
    async fn half_open_closes_after_success_threshold() {
        let cb = CircuitBreaker::new(fast_config());
        cb.manual_open().await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        let _ = cb.call(|| async { Ok::<_, &str>(1) }).await;
        let _ = cb.call(|| async { Ok::<_, &str>(1) }).await;
        assert_eq!(cb.get_state().await, CircuitState::Closed);
    }

    #[tokio::test]
    async fn half_open_reopens_on_any_failure() {
        let cb = CircuitBreaker::new(fast_config());
        cb.manual_open().await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        let _ = cb.call(|| async { Err::<(), _>("boom") }).await;
        assert_eq!(cb.get_state().await, CircuitState::Open);
    }

    #[tokio::test]
    async fn manual_reset_clears_counters() {
        let cb = CircuitBreaker::new(fast_config());
        for _ in 0..3 {
            let _ = cb.call(|| async { Err::<(), _>("boom") }).await;
        }
        cb.reset().await;
        let stats = cb.get_stats().await;
        assert_eq!(stats.state, CircuitState::Closed);
        assert_eq!(stats.consecutive_failures, 0);
        assert_eq!(stats.total_calls, 0);
    }
}
