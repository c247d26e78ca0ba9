//! Upgrade Orchestrator LLM
//!
//! A single-capability LLM provider abstraction: `generate`/`stream_generate`
//! with `max_tokens`/`temperature`/`model_id` options and exponential
//! backoff retry on rate-limit errors. Concrete provider wire formats are
//! intentionally out of scope beyond one OpenAI-compatible adapter and an
//! in-memory mock for tests.

pub mod http_client;
pub mod mock;
pub mod openai;
pub mod provider;
pub mod types;

pub use http_client::build_http_client;
pub use mock::MockProvider;
pub use openai::OpenAiCompatibleProvider;
pub use provider::{generate_with_retry, missing_api_key_error, parse_http_error, LlmProvider};
pub use types::*;
