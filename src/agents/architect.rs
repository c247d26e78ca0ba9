//! ArchitectAgent
//!
//! Consumes GapAnalyzer's report and proposes a target architecture: the
//! component list, their responsibilities, and the integration points
//! between them. Has no direct counterpart under `original_source/` (the
//! Python implementation folds architecture proposal into the planner); it
//! is synthesized here with the same agent shape as every other agent,
//! satisfying the Design phase named in spec.md §4.4 step 5.

use async_trait::async_trait;
use orchestrator_core::agent::{Agent, AgentKind, AgentResult, AgentTask};
use orchestrator_llm::GenerateOptions;
use serde::{Deserialize, Serialize};

use crate::memory::ContextType;
use crate::safety::CircuitBreaker;

use super::support::{finish_err, finish_ok, parse_structured_response, AgentRuntime, Timer};

pub const VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ComponentDesign {
    pub name: String,
    pub responsibility: String,
    pub depends_on: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ArchitectureProposal {
    pub components: Vec<ComponentDesign>,
    pub integration_notes: Vec<String>,
}

pub struct ArchitectAgent {
    runtime: AgentRuntime,
    circuit_breaker: CircuitBreaker,
}

impl ArchitectAgent {
    pub fn new(runtime: AgentRuntime) -> Self {
        Self { runtime, circuit_breaker: CircuitBreaker::new(Default::default()) }
    }
}

#[async_trait]
impl Agent for ArchitectAgent {
    fn name(&self) -> &str {
        "ArchitectAgent"
    }

    fn version(&self) -> &str {
        VERSION
    }

    fn kind(&self) -> AgentKind {
        AgentKind::ArchitectAgent
    }

    async fn execute(&self, _task: AgentTask) -> AgentResult {
        let timer = Timer::start();
        let mut consumed = Vec::new();
        let gap_report = self.runtime.read_upstream_tracked(ContextType::OCtx, "gap_report:latest", &mut consumed).await;
        let missing_gap_report = gap_report.is_none();

        let prompt = format!(
            "Given this gap report, propose a target architecture. Return JSON with keys \
             `components` (array of objects with `name`, `responsibility`, `depends_on` \
             string array) and `integration_notes` (string array).\n\nGap report: {}",
            gap_report.clone().unwrap_or(serde_json::Value::Null)
        );

        let raw = match self.runtime.call_llm(&self.circuit_breaker, &prompt, None, &GenerateOptions::default()).await {
            Ok(text) => text,
            Err(e) => return finish_err(self.name(), self.version(), e, timer),
        };

        let parsed = parse_structured_response(&raw);
        self.runtime.store_analysis(self.name(), "architecture_proposal", parsed.clone(), Some(86_400)).await;
        self.runtime
            .memory
            .write(ContextType::OCtx, "architecture_proposal:latest", parsed.clone(), Some(86_400))
            .await
            .ok();

        let mut data = std::collections::HashMap::new();
        data.insert("architecture".to_string(), parsed);
        let mut result = finish_ok(self.name(), self.version(), self.runtime.llm.model(), data, consumed, timer);
        if missing_gap_report {
            result.annotate_missing_upstream("GapAnalyzer");
        }
        result
    }
}
