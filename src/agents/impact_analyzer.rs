//! ImpactAnalyzer
//!
//! Current-state analyzer (phase 2): given `RequirementAnalyzer`'s spec and
//! `CodeAnalyzer`'s module breakdown, estimates the blast radius of the
//! requested change — which modules, tests, and downstream consumers are
//! affected. Non-critical.

use async_trait::async_trait;
use orchestrator_core::agent::{Agent, AgentKind, AgentResult, AgentTask};
use orchestrator_llm::GenerateOptions;

use crate::memory::ContextType;
use crate::safety::CircuitBreaker;

use super::support::{finish_err, finish_ok, parse_structured_response, task_text, AgentRuntime, Timer};

pub const VERSION: &str = "1.0.0";

pub struct ImpactAnalyzer {
    runtime: AgentRuntime,
    circuit_breaker: CircuitBreaker,
}

impl ImpactAnalyzer {
    pub fn new(runtime: AgentRuntime) -> Self {
        Self { runtime, circuit_breaker: CircuitBreaker::new(Default::default()) }
    }
}

#[async_trait]
impl Agent for ImpactAnalyzer {
    fn name(&self) -> &str {
        "ImpactAnalyzer"
    }

    fn version(&self) -> &str {
        VERSION
    }

    fn kind(&self) -> AgentKind {
        AgentKind::ImpactAnalyzer
    }

    async fn execute(&self, task: AgentTask) -> AgentResult {
        let timer = Timer::start();

        let mut consumed = Vec::new();
        let requirements = self.runtime.read_upstream_tracked(ContextType::SCtx, "requirements:latest", &mut consumed).await;
        let code_analysis = self
            .runtime
            .read_upstream_tracked(ContextType::SCtx, "latest_code_analysis_analysis", &mut consumed)
            .await;
        let mut missing = Vec::new();
        if requirements.is_none() {
            missing.push("RequirementAnalyzer");
        }
        if code_analysis.is_none() {
            missing.push("CodeAnalyzer");
        }

        let project_summary = task_text(&task, "project_summary").unwrap_or_default();
        let prompt = format!(
            "Given the requirement spec {req:?} and code analysis {code:?}, estimate the \
             blast radius of the requested change. Return JSON with keys \
             `affected_modules` (string array), `affected_tests` (string array), \
             `downstream_consumers` (string array).\n\nProject summary:\n{project_summary}",
            req = requirements,
            code = code_analysis,
        );

        let raw = match self.runtime.call_llm(&self.circuit_breaker, &prompt, None, &GenerateOptions::default()).await {
            Ok(text) => text,
            Err(e) => return finish_err(self.name(), self.version(), e, timer),
        };

        let parsed = parse_structured_response(&raw);
        self.runtime.store_analysis(self.name(), "impact_analysis", parsed.clone(), Some(86_400)).await;

        let mut data = std::collections::HashMap::new();
        data.insert("analysis".to_string(), parsed);
        let mut result = finish_ok(self.name(), self.version(), self.runtime.llm.model(), data, consumed, timer);
        for m in missing {
            result.annotate_missing_upstream(m);
        }
        result
    }
}
