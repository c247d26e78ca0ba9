//! StaticAnalyzer
//!
//! One of the five current-state analyzers (phase 2). Hands the project
//! structure summary gathered upstream to the LLM and asks it to
//! summarize structural concerns — dead code, cyclic dependencies,
//! style-guide drift. Non-critical: its failure only annotates the phase
//! summary.

use async_trait::async_trait;
use orchestrator_core::agent::{Agent, AgentKind, AgentResult, AgentTask};
use orchestrator_llm::GenerateOptions;

use crate::safety::CircuitBreaker;

use super::support::{finish_err, finish_ok, parse_structured_response, task_text, AgentRuntime, Timer};

pub const VERSION: &str = "1.0.0";

pub struct StaticAnalyzer {
    runtime: AgentRuntime,
    circuit_breaker: CircuitBreaker,
}

impl StaticAnalyzer {
    pub fn new(runtime: AgentRuntime) -> Self {
        Self { runtime, circuit_breaker: CircuitBreaker::new(Default::default()) }
    }
}

#[async_trait]
impl Agent for StaticAnalyzer {
    fn name(&self) -> &str {
        "StaticAnalyzer"
    }

    fn version(&self) -> &str {
        VERSION
    }

    fn kind(&self) -> AgentKind {
        AgentKind::StaticAnalyzer
    }

    async fn execute(&self, task: AgentTask) -> AgentResult {
        let timer = Timer::start();
        let project_summary = task_text(&task, "project_summary").unwrap_or_else(|| "(no project summary provided)".to_string());

        let prompt = format!(
            "Given this project structure summary, identify static-analysis concerns \
             (dead code, cyclic module dependencies, style-guide drift). Return JSON with \
             keys `findings` (string array) and `risk_level` (one of low/medium/high).\n\n{project_summary}"
        );

        let raw = match self.runtime.call_llm(&self.circuit_breaker, &prompt, None, &GenerateOptions::default()).await {
            Ok(text) => text,
            Err(e) => return finish_err(self.name(), self.version(), e, timer),
        };

        let parsed = parse_structured_response(&raw);
        self.runtime.store_analysis(self.name(), "static_analysis", parsed.clone(), Some(86_400)).await;

        let mut data = std::collections::HashMap::new();
        data.insert("analysis".to_string(), parsed);
        finish_ok(self.name(), self.version(), self.runtime.llm.model(), data, Vec::new(), timer)
    }
}
