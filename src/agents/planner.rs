//! PlannerAgent
//!
//! Critical agent (§9). Consumes ExternalResearcher, GapAnalyzer, and
//! OrchestratorDesigner (when present), and produces an `ExecutionPlan`:
//! milestones, ordered steps, and an estimated-effort-per-step breakdown.
//! Stored as `execution_plan_{timestamp}` in `O_CTX` per the key-naming
//! convention (§4.2). Grounded on
//! `backend/packages/agents/planner_agent.py`.

use chrono::Utc;
use async_trait::async_trait;
use orchestrator_core::agent::{Agent, AgentKind, AgentResult, AgentTask};
use orchestrator_llm::GenerateOptions;
use serde::{Deserialize, Serialize};

use crate::memory::ContextType;
use crate::safety::CircuitBreaker;

use super::support::{finish_err, finish_ok, parse_structured_response, AgentRuntime, Timer};

pub const VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PlanStep {
    pub name: String,
    pub description: String,
    pub estimated_effort_hours: f64,
    pub depends_on: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExecutionPlan {
    pub milestones: Vec<String>,
    pub steps: Vec<PlanStep>,
}

pub struct PlannerAgent {
    runtime: AgentRuntime,
    circuit_breaker: CircuitBreaker,
}

impl PlannerAgent {
    pub fn new(runtime: AgentRuntime) -> Self {
        Self { runtime, circuit_breaker: CircuitBreaker::new(Default::default()) }
    }
}

#[async_trait]
impl Agent for PlannerAgent {
    fn name(&self) -> &str {
        "PlannerAgent"
    }

    fn version(&self) -> &str {
        VERSION
    }

    fn kind(&self) -> AgentKind {
        AgentKind::PlannerAgent
    }

    async fn execute(&self, _task: AgentTask) -> AgentResult {
        let timer = Timer::start();
        let mut missing = Vec::new();
        let mut consumed = Vec::new();

        let research = self.runtime.read_upstream_tracked(ContextType::SCtx, "external_research:latest", &mut consumed).await;
        if research.is_none() {
            missing.push("ExternalResearcher");
        }
        let gap_report = self.runtime.read_upstream_tracked(ContextType::OCtx, "gap_report:latest", &mut consumed).await;
        if gap_report.is_none() {
            missing.push("GapAnalyzer");
        }
        // OrchestratorDesigner is optional (spec.md §4.4 step 5) — its
        // absence is never annotated as missing upstream.
        let integration_design = self
            .runtime
            .read_upstream_tracked(ContextType::OCtx, "integration_design:latest", &mut consumed)
            .await;

        let prompt = format!(
            "Build an execution plan from the gap report and research pack below. Return JSON \
             with keys `milestones` (string array) and `steps` (array of objects with `name`, \
             `description`, `estimated_effort_hours`, `depends_on` string array).\n\n\
             Gap report: {}\n\nResearch: {}\n\nIntegration design: {}",
            gap_report.clone().unwrap_or(serde_json::Value::Null),
            research.clone().unwrap_or(serde_json::Value::Null),
            integration_design.clone().unwrap_or(serde_json::Value::Null),
        );

        let raw = match self.runtime.call_llm(&self.circuit_breaker, &prompt, None, &GenerateOptions::default()).await {
            Ok(text) => text,
            Err(e) => return finish_err(self.name(), self.version(), e, timer),
        };

        let parsed = parse_structured_response(&raw);
        let timestamp = Utc::now().timestamp();
        let key = format!("execution_plan_{timestamp}");
        self.runtime
            .memory
            .write(ContextType::OCtx, &key, parsed.clone(), None)
            .await
            .ok();
        self.runtime
            .memory
            .write(ContextType::OCtx, "execution_plan:latest", parsed.clone(), None)
            .await
            .ok();

        let mut data = std::collections::HashMap::new();
        data.insert("execution_plan".to_string(), parsed);
        data.insert("memory_key".to_string(), serde_json::Value::String(key));
        let mut result = finish_ok(self.name(), self.version(), self.runtime.llm.model(), data, consumed, timer);
        for m in missing {
            result.annotate_missing_upstream(m);
        }
        result
    }
}
