//! Shared agent scaffolding
//!
//! Every concrete agent in `crate::agents` is a thin wrapper around this
//! runtime: memory access, the mandatory safety-layer wrapping around LLM
//! calls, defensive JSON parsing of the model's response, and report
//! persistence. Grounded on the shared constructor/execute shape every
//! agent in `backend/packages/agents/*.py` follows (see
//! `requirement_analyzer.py`: context gather -> LLM call -> parse -> store).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use orchestrator_core::agent::{AgentResult, AgentTask};
use orchestrator_llm::{GenerateOptions, LlmProvider};
use serde_json::Value;
use tracing::warn;

use crate::memory::{ContextType, MemoryHub};
use crate::safety::{CircuitBreaker, ResourceLimiter, SafetyLayer};

/// Shared handles every agent needs: the report bus, the process-shared
/// resource envelope, and an LLM provider. Cheap to clone (everything
/// behind an `Arc`).
#[derive(Clone)]
pub struct AgentRuntime {
    pub memory: Arc<MemoryHub>,
    pub resource_limiter: Arc<ResourceLimiter>,
    pub llm: Arc<dyn LlmProvider>,
}

impl AgentRuntime {
    pub fn new(memory: Arc<MemoryHub>, resource_limiter: Arc<ResourceLimiter>, llm: Arc<dyn LlmProvider>) -> Self {
        Self { memory, resource_limiter, llm }
    }

    /// `circuit_breaker.call(resource_limiter.execute(llm_call))`, the
    /// mandatory composition discipline from the Safety Layer.
    pub async fn call_llm(
        &self,
        circuit_breaker: &CircuitBreaker,
        prompt: &str,
        system_prompt: Option<&str>,
        options: &GenerateOptions,
    ) -> Result<String, String> {
        let safety = SafetyLayer::new(Arc::clone(&self.resource_limiter));
        let llm = Arc::clone(&self.llm);
        let prompt = prompt.to_string();
        let system_prompt = system_prompt.map(|s| s.to_string());
        let options = options.clone();
        safety
            .guard(circuit_breaker, move || async move {
                llm.generate(&prompt, system_prompt.as_deref(), &options).await
            })
            .await
            .map(|response| response.content)
    }

    /// Read a declared upstream report. Returns `None` (a soft condition,
    /// not an error) when the key is absent — callers annotate
    /// `missing_upstream` on the result rather than failing the task.
    pub async fn read_upstream(&self, context_type: ContextType, key: &str) -> Option<Value> {
        match self.memory.get(context_type, key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, key, "failed to read upstream report");
                None
            }
        }
    }

    /// Same as `read_upstream`, but records the key into `consumed` when a
    /// value was actually present — the per-execute accumulator `finish_ok`
    /// stamps into `metadata.consumed` (§4.2 step 5, §8's
    /// `metadata.consumed` universal invariant).
    pub async fn read_upstream_tracked(&self, context_type: ContextType, key: &str, consumed: &mut Vec<String>) -> Option<Value> {
        let value = self.read_upstream(context_type, key).await;
        if value.is_some() {
            consumed.push(key.to_string());
        }
        value
    }

    /// Persist an agent's structured output to `A_CTX` under
    /// `{AgentName}:{kind}:{timestamp}` and mirror it into `S_CTX` under
    /// `latest_{kind}_analysis` for the next phase to discover.
    pub async fn store_analysis(&self, agent_name: &str, kind: &str, value: Value, ttl_seconds: Option<i64>) {
        let timestamp = Utc::now().timestamp();
        let agent_key = format!("{agent_name}:{kind}:{timestamp}");
        if let Err(e) = self
            .memory
            .put(ContextType::ACtx, &agent_key, value.clone(), ttl_seconds, vec![agent_name.to_string(), kind.to_string()], HashMap::new())
            .await
        {
            warn!(error = %e, agent_key, "failed to store agent-scoped analysis");
        }

        let shared_key = format!("latest_{kind}_analysis");
        if let Err(e) = self.memory.put(ContextType::SCtx, &shared_key, value, ttl_seconds, vec![], HashMap::new()).await {
            warn!(error = %e, shared_key, "failed to mirror analysis to shared context");
        }
    }
}

/// Best-effort JSON parse of an LLM response: on success return the parsed
/// value; on failure, return a `raw_analysis` envelope rather than a hard
/// failure — per the agent contract's "parse the provider response" step.
pub fn parse_structured_response(text: &str) -> Value {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => value,
        Err(_) => extract_json_block(text)
            .and_then(|block| serde_json::from_str(&block).ok())
            .unwrap_or_else(|| serde_json::json!({ "raw_analysis": text })),
    }
}

/// LLMs frequently wrap JSON in a ```json fenced block; try to recover that
/// before giving up and falling back to `raw_analysis`.
fn extract_json_block(text: &str) -> Option<String> {
    let start = text.find("```json").map(|i| i + 7).or_else(|| text.find("```").map(|i| i + 3))?;
    let rest = &text[start..];
    let end = rest.find("```")?;
    Some(rest[..end].trim().to_string())
}

pub struct Timer(Instant);

impl Timer {
    pub fn start() -> Self {
        Self(Instant::now())
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.0.elapsed().as_millis()
    }
}

/// Fold a successful agent body into a completed `AgentResult`, stamping the
/// timing, model, and consumed-upstream-keys metadata the agent contract
/// requires (§4.2 step 5: "at minimum agent name, version, model used,
/// elapsed wall time, and the list of upstream keys actually consumed").
/// `consumed` is the list of upstream keys the agent actually read a value
/// back for — callers accumulate it alongside `missing_upstream` as they
/// call `read_upstream`.
pub fn finish_ok(agent_name: &str, version: &str, model: &str, data: HashMap<String, Value>, consumed: Vec<String>, timer: Timer) -> AgentResult {
    let mut result = AgentResult::completed(agent_name, version, data).with_timing_ms(timer.elapsed_ms());
    result.metadata.insert("model".to_string(), Value::String(model.to_string()));
    result
        .metadata
        .insert("consumed".to_string(), Value::Array(consumed.into_iter().map(Value::String).collect()));
    result
}

pub fn finish_err(agent_name: &str, version: &str, error: impl Into<String>, timer: Timer) -> AgentResult {
    AgentResult::failed(agent_name, version, error).with_timing_ms(timer.elapsed_ms())
}

/// Build an `AgentTask`'s primary text input, used by every agent's
/// `execute` to pull its main instruction out of `task.inputs`.
pub fn task_text(task: &AgentTask, key: &str) -> Option<String> {
    task.input_str(key).map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_structured_response_parses_plain_json() {
        let value = parse_structured_response(r#"{"ok": true}"#);
        assert_eq!(value["ok"], Value::Bool(true));
    }

    #[test]
    fn parse_structured_response_extracts_fenced_block() {
        let text = "Here is the analysis:\n```json\n{\"gaps\": []}\n```\nDone.";
        let value = parse_structured_response(text);
        assert!(value["gaps"].is_array());
    }

    #[test]
    fn parse_structured_response_falls_back_to_raw_analysis() {
        let value = parse_structured_response("not json at all");
        assert_eq!(value["raw_analysis"], Value::String("not json at all".into()));
    }
}
