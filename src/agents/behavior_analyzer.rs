//! BehaviorAnalyzer
//!
//! Current-state analyzer (phase 2): infers the project's runtime behavior
//! from code and (optionally) dynamic-analysis traces — request flows,
//! side effects, external integrations. Non-critical.

use async_trait::async_trait;
use orchestrator_core::agent::{Agent, AgentKind, AgentResult, AgentTask};
use orchestrator_llm::GenerateOptions;

use crate::safety::CircuitBreaker;

use super::support::{finish_err, finish_ok, parse_structured_response, task_text, AgentRuntime, Timer};

pub const VERSION: &str = "1.0.0";

pub struct BehaviorAnalyzer {
    runtime: AgentRuntime,
    circuit_breaker: CircuitBreaker,
}

impl BehaviorAnalyzer {
    pub fn new(runtime: AgentRuntime) -> Self {
        Self { runtime, circuit_breaker: CircuitBreaker::new(Default::default()) }
    }
}

#[async_trait]
impl Agent for BehaviorAnalyzer {
    fn name(&self) -> &str {
        "BehaviorAnalyzer"
    }

    fn version(&self) -> &str {
        VERSION
    }

    fn kind(&self) -> AgentKind {
        AgentKind::BehaviorAnalyzer
    }

    async fn execute(&self, task: AgentTask) -> AgentResult {
        let timer = Timer::start();
        let project_summary = task_text(&task, "project_summary").unwrap_or_else(|| "(no project summary provided)".to_string());
        let dynamic_traces = task_text(&task, "dynamic_traces");

        let prompt = match &dynamic_traces {
            Some(traces) => format!(
                "Infer runtime behavior (request flows, side effects, external \
                 integrations) from this project summary and these dynamic-analysis \
                 traces. Return JSON with keys `flows` (string array), `side_effects` \
                 (string array), `integrations` (string array).\n\nSummary:\n{project_summary}\n\nTraces:\n{traces}"
            ),
            None => format!(
                "Infer likely runtime behavior (request flows, side effects, external \
                 integrations) from this project summary alone. Return JSON with keys \
                 `flows` (string array), `side_effects` (string array), `integrations` (string array).\n\n{project_summary}"
            ),
        };

        let raw = match self.runtime.call_llm(&self.circuit_breaker, &prompt, None, &GenerateOptions::default()).await {
            Ok(text) => text,
            Err(e) => return finish_err(self.name(), self.version(), e, timer),
        };

        let parsed = parse_structured_response(&raw);
        self.runtime.store_analysis(self.name(), "behavior_analysis", parsed.clone(), Some(86_400)).await;

        let mut data = std::collections::HashMap::new();
        data.insert("analysis".to_string(), parsed);
        if dynamic_traces.is_none() {
            let mut result = finish_ok(self.name(), self.version(), self.runtime.llm.model(), data, Vec::new(), timer);
            result.annotate_missing_upstream("dynamic_traces");
            return result;
        }
        finish_ok(self.name(), self.version(), self.runtime.llm.model(), data, Vec::new(), timer)
    }
}
