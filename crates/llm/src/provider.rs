//! LLM Provider Trait
//!
//! A single capability — `generate`/`stream_generate` — implemented by every
//! concrete provider. Generalized from the teacher's richer multi-provider
//! `LlmProvider` trait (chat history, tool calling, multimodal, reasoning
//! effort) down to the contract this orchestrator actually needs; the wire
//! format behind `generate` is explicitly out of scope for this crate.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::warn;

use super::types::{GenerateChunk, GenerateOptions, GenerateResponse, LlmError, LlmResult, ProviderConfig};

#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn model(&self) -> &str;

    fn config(&self) -> &ProviderConfig;

    /// Full, non-streaming completion.
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        options: &GenerateOptions,
    ) -> LlmResult<GenerateResponse>;

    /// Streamed completion. The default implementation falls back to
    /// `generate` and yields the full content as a single chunk, matching
    /// the spec's "non-streaming fallback yields the full content as a
    /// single chunk" contract.
    async fn stream_generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        options: &GenerateOptions,
        tx: mpsc::Sender<GenerateChunk>,
    ) -> LlmResult<GenerateResponse> {
        let response = self.generate(prompt, system_prompt, options).await?;
        let _ = tx
            .send(GenerateChunk { delta: response.content.clone(), done: true })
            .await;
        Ok(response)
    }

    async fn health_check(&self) -> LlmResult<()>;
}

pub fn missing_api_key_error(provider: &str) -> LlmError {
    LlmError::AuthenticationFailed { message: format!("API key not configured for {provider}") }
}

pub fn parse_http_error(status: u16, body: &str, provider: &str) -> LlmError {
    match status {
        401 => LlmError::AuthenticationFailed { message: format!("{provider}: invalid API key") },
        403 => LlmError::AuthenticationFailed { message: format!("{provider}: access denied") },
        404 => LlmError::ModelNotFound { model: body.to_string() },
        429 => LlmError::RateLimited { message: body.to_string(), retry_after: None },
        400 => LlmError::InvalidRequest { message: body.to_string() },
        500..=599 => LlmError::ServerError { message: body.to_string(), status: Some(status) },
        _ => LlmError::Other { message: format!("HTTP {status}: {body}") },
    }
}

/// Retries a `generate` call on transient provider errors with exponential
/// backoff: wait `2^attempt` seconds, capped at `max_retries`. All other
/// provider errors propagate immediately.
pub async fn generate_with_retry<F, Fut>(max_retries: u32, mut call: F) -> LlmResult<GenerateResponse>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = LlmResult<GenerateResponse>>,
{
    let mut attempt = 0;
    loop {
        match call().await {
            Ok(response) => return Ok(response),
            Err(err) if err.is_retryable() && attempt < max_retries => {
                let wait = std::time::Duration::from_secs(2u64.saturating_pow(attempt));
                warn!(attempt, wait_secs = wait.as_secs(), error = %err, "retrying after transient provider error");
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_api_key_error_names_provider() {
        let err = missing_api_key_error("openai");
        assert!(matches!(err, LlmError::AuthenticationFailed { message } if message.contains("openai")));
    }

    #[test]
    fn parse_http_error_maps_status_codes() {
        assert!(matches!(parse_http_error(401, "x", "openai"), LlmError::AuthenticationFailed { .. }));
        assert!(matches!(parse_http_error(429, "x", "openai"), LlmError::RateLimited { .. }));
        assert!(matches!(parse_http_error(500, "x", "openai"), LlmError::ServerError { .. }));
    }

    #[tokio::test]
    async fn generate_with_retry_stops_on_non_retryable_error() {
        let mut calls = 0;
        let result = generate_with_retry(3, || {
            calls += 1;
            async { Err::<GenerateResponse, _>(LlmError::InvalidRequest { message: "bad".into() }) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn generate_with_retry_exhausts_attempts_on_rate_limit() {
        let mut calls = 0;
        let result = generate_with_retry(2, || {
            calls += 1;
            async { Err::<GenerateResponse, _>(LlmError::RateLimited { message: "slow down".into(), retry_after: None }) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls, 3); // initial attempt + 2 retries
    }
}
