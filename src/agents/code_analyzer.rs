//! CodeAnalyzer
//!
//! Current-state analyzer (phase 2): summarizes the project's existing
//! code — module boundaries, public API surface, test coverage hotspots —
//! as input to the Gap phase. Same shape as `StaticAnalyzer`; non-critical.

use async_trait::async_trait;
use orchestrator_core::agent::{Agent, AgentKind, AgentResult, AgentTask};
use orchestrator_llm::GenerateOptions;

use crate::safety::CircuitBreaker;

use super::support::{finish_err, finish_ok, parse_structured_response, task_text, AgentRuntime, Timer};

pub const VERSION: &str = "1.0.0";

pub struct CodeAnalyzer {
    runtime: AgentRuntime,
    circuit_breaker: CircuitBreaker,
}

impl CodeAnalyzer {
    pub fn new(runtime: AgentRuntime) -> Self {
        Self { runtime, circuit_breaker: CircuitBreaker::new(Default::default()) }
    }
}

#[async_trait]
impl Agent for CodeAnalyzer {
    fn name(&self) -> &str {
        "CodeAnalyzer"
    }

    fn version(&self) -> &str {
        VERSION
    }

    fn kind(&self) -> AgentKind {
        AgentKind::CodeAnalyzer
    }

    async fn execute(&self, task: AgentTask) -> AgentResult {
        let timer = Timer::start();
        let project_summary = task_text(&task, "project_summary").unwrap_or_else(|| "(no project summary provided)".to_string());

        let prompt = format!(
            "Summarize this project's existing code: module boundaries, public API \
             surface, and likely test coverage hotspots. Return JSON with keys \
             `modules` (string array), `public_api` (string array), `coverage_hotspots` (string array).\n\n{project_summary}"
        );

        let raw = match self.runtime.call_llm(&self.circuit_breaker, &prompt, None, &GenerateOptions::default()).await {
            Ok(text) => text,
            Err(e) => return finish_err(self.name(), self.version(), e, timer),
        };

        let parsed = parse_structured_response(&raw);
        self.runtime.store_analysis(self.name(), "code_analysis", parsed.clone(), Some(86_400)).await;

        let mut data = std::collections::HashMap::new();
        data.insert("analysis".to_string(), parsed);
        finish_ok(self.name(), self.version(), self.runtime.llm.model(), data, Vec::new(), timer)
    }
}
