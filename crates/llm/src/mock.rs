//! Mock Provider
//!
//! An in-memory `LlmProvider` for agent unit tests — no network calls, a
//! canned or scripted response, and a call counter for assertions.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;

use super::provider::LlmProvider;
use super::types::{GenerateChunk, GenerateOptions, GenerateResponse, LlmError, LlmResult, ProviderConfig};

pub struct MockProvider {
    config: ProviderConfig,
    response: String,
    fail_after: Option<usize>,
    calls: AtomicUsize,
}

impl MockProvider {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            config: ProviderConfig { api_key: None, base_url: None, model: "mock".into() },
            response: response.into(),
            fail_after: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Fail every call starting at the given 0-indexed call count, to
    /// exercise circuit breaker / retry paths in tests.
    pub fn failing_after(mut self, count: usize) -> Self {
        self.fail_after = Some(count);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    async fn generate(
        &self,
        _prompt: &str,
        _system_prompt: Option<&str>,
        _options: &GenerateOptions,
    ) -> LlmResult<GenerateResponse> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(threshold) = self.fail_after {
            if call >= threshold {
                return Err(LlmError::ServerError { message: "mock failure".into(), status: Some(500) });
            }
        }
        Ok(GenerateResponse::ok(self.response.clone()))
    }

    async fn stream_generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        options: &GenerateOptions,
        tx: mpsc::Sender<GenerateChunk>,
    ) -> LlmResult<GenerateResponse> {
        let response = self.generate(prompt, system_prompt, options).await?;
        let _ = tx.send(GenerateChunk { delta: response.content.clone(), done: true }).await;
        Ok(response)
    }

    async fn health_check(&self) -> LlmResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_canned_response() {
        let provider = MockProvider::new("hello");
        let result = provider.generate("hi", None, &GenerateOptions::default()).await.unwrap();
        assert_eq!(result.content, "hello");
    }

    #[tokio::test]
    async fn fails_after_threshold() {
        let provider = MockProvider::new("hello").failing_after(1);
        assert!(provider.generate("hi", None, &GenerateOptions::default()).await.is_ok());
        assert!(provider.generate("hi", None, &GenerateOptions::default()).await.is_err());
    }
}
