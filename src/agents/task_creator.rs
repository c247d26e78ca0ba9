//! TaskCreatorAgent
//!
//! Decomposes PlannerAgent's execution plan into executable tasks — one per
//! concrete unit of work the CodeGenerator can act on. Consumes
//! ExternalResearcher, GapAnalyzer, and PlannerAgent. Stored as
//! `executable_tasks_{timestamp}` in `O_CTX`. Grounded on
//! `backend/packages/agents/task_creator_agent.py`.

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
pub struct ExecutableTask {
    pub id: String,
    pub component: String,
    pub description: String,
    pub acceptance_criteria: Vec<String>,
}

pub struct TaskCreatorAgent {
    runtime: AgentRuntime,
    circuit_breaker: CircuitBreaker,
}

impl TaskCreatorAgent {
    pub fn new(runtime: AgentRuntime) -> Self {
        Self { runtime, circuit_breaker: CircuitBreaker::new(Default::default()) }
    }
}

#[async_trait]
impl Agent for TaskCreatorAgent {
    fn name(&self) -> &str {
        "TaskCreatorAgent"
    }

    fn version(&self) -> &str {
        VERSION
    }

    fn kind(&self) -> AgentKind {
        AgentKind::TaskCreatorAgent
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
        let plan = self.runtime.read_upstream_tracked(ContextType::OCtx, "execution_plan:latest", &mut consumed).await;
        if plan.is_none() {
            missing.push("PlannerAgent");
        }

        let prompt = format!(
            "Decompose this execution plan into concrete executable tasks, one per component \
             to build or change. Return JSON with key `tasks` (array of objects with `id`, \
             `component`, `description`, `acceptance_criteria` string array).\n\nPlan: {}\n\n\
             Gap report: {}",
            plan.clone().unwrap_or(serde_json::Value::Null),
            gap_report.clone().unwrap_or(serde_json::Value::Null),
        );

        let raw = match self.runtime.call_llm(&self.circuit_breaker, &prompt, None, &GenerateOptions::default()).await {
            Ok(text) => text,
            Err(e) => return finish_err(self.name(), self.version(), e, timer),
        };

        let parsed = parse_structured_response(&raw);
        let timestamp = Utc::now().timestamp();
        let key = format!("executable_tasks_{timestamp}");
        self.runtime.memory.write(ContextType::OCtx, &key, parsed.clone(), None).await.ok();
        self.runtime
            .memory
            .write(ContextType::OCtx, "executable_tasks:latest", parsed.clone(), None)
            .await
            .ok();

        let mut data = std::collections::HashMap::new();
        data.insert("tasks".to_string(), parsed);
        data.insert("memory_key".to_string(), serde_json::Value::String(key));
        let mut result = finish_ok(self.name(), self.version(), self.runtime.llm.model(), data, consumed, timer);
        for m in missing {
            result.annotate_missing_upstream(m);
        }
        result
    }
}
