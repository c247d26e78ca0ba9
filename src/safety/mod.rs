//! Safety Layer
//!
//! `CircuitBreaker` (per-agent failure containment) and `ResourceLimiter`
//! (process-shared admission control). Every LLM invocation in every agent
//! is wrapped as `circuit_breaker.call(resource_limiter.execute(llm_call))`
//! — see `SafetyLayer::guard` below for the composed helper.

pub mod circuit_breaker;
pub mod resource_limiter;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitBreakerStats, CircuitState};
pub use resource_limiter::{
    ResourceExceededError, ResourceKind, ResourceLimit, ResourceLimiter, ResourceLimiterError, ResourceStats,
};

use std::future::Future;
use std::sync::Arc;

/// Composition helper implementing the mandatory wrapping discipline:
/// `circuit_breaker.call(resource_limiter.execute(llm_call))`. Each agent
/// owns its `CircuitBreaker`; the `ResourceLimiter` is shared process-wide.
pub struct SafetyLayer {
    pub resource_limiter: Arc<ResourceLimiter>,
}

impl SafetyLayer {
    pub fn new(resource_limiter: Arc<ResourceLimiter>) -> Self {
        Self { resource_limiter }
    }

    /// Runs `f` through this process's `ResourceLimiter`, then through the
    /// caller's own `CircuitBreaker`. The nested error type flattens both
    /// layers' failure kinds into a single string for callers that just
    /// need to know why an LLM call didn't happen.
    pub async fn guard<T, E, F, Fut>(
        &self,
        circuit_breaker: &CircuitBreaker,
        f: F,
    ) -> Result<T, String>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send,
        E: std::fmt::Display,
    {
        let limiter = Arc::clone(&self.resource_limiter);
        let outcome = circuit_breaker
            .call(move || async move { limiter.execute(f).await })
            .await;

        outcome.map_err(|e| match e {
            CircuitBreakerError::Open => "circuit breaker open".to_string(),
            CircuitBreakerError::Inner(ResourceLimiterError::Exceeded(ex)) => ex.to_string(),
            CircuitBreakerError::Inner(ResourceLimiterError::Inner(inner)) => inner.to_string(),
        })
    }
}
