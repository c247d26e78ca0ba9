//! Agent Contract
//!
//! Defines the uniform execution model shared by every analysis/generation
//! component in the upgrade orchestrator: `AgentTask` (immutable input),
//! `AgentResult` (outcome), and the `Agent` trait itself.
//!
//! Agents never raise across this boundary — `execute` always returns an
//! `AgentResult`, even when the underlying work failed. Internal errors are
//! folded into `AgentResult::failed`.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The closed set of agent kinds the orchestrator knows how to run.
///
/// New agent kinds are added here, not registered dynamically at runtime —
/// every phase of the orchestrator loop dispatches on this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum AgentKind {
    RequirementAnalyzer,
    StaticAnalyzer,
    CodeAnalyzer,
    BehaviorAnalyzer,
    ImpactAnalyzer,
    QualityGate,
    ExternalResearcher,
    GapAnalyzer,
    ArchitectAgent,
    OrchestratorDesigner,
    PlannerAgent,
    TaskCreatorAgent,
    CodeGenerator,
}

impl AgentKind {
    /// Stable name used in MemoryHub keys (`{AgentName}:{kind}:{timestamp}`).
    pub fn name(&self) -> &'static str {
        match self {
            Self::RequirementAnalyzer => "RequirementAnalyzer",
            Self::StaticAnalyzer => "StaticAnalyzer",
            Self::CodeAnalyzer => "CodeAnalyzer",
            Self::BehaviorAnalyzer => "BehaviorAnalyzer",
            Self::ImpactAnalyzer => "ImpactAnalyzer",
            Self::QualityGate => "QualityGate",
            Self::ExternalResearcher => "ExternalResearcher",
            Self::GapAnalyzer => "GapAnalyzer",
            Self::ArchitectAgent => "ArchitectAgent",
            Self::OrchestratorDesigner => "OrchestratorDesigner",
            Self::PlannerAgent => "PlannerAgent",
            Self::TaskCreatorAgent => "TaskCreatorAgent",
            Self::CodeGenerator => "CodeGenerator",
        }
    }

    /// Critical agents abort the orchestrator loop on failure; the rest only
    /// annotate the phase summary and continue.
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            Self::RequirementAnalyzer | Self::GapAnalyzer | Self::PlannerAgent | Self::CodeGenerator
        )
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Immutable input unit for one agent invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentTask {
    /// Describes the operation being requested, e.g. "analyze_requirements".
    pub intent: String,
    /// Arbitrary structured inputs for the agent.
    pub inputs: HashMap<String, Value>,
    /// Optional correlation id tying this task to a parent upgrade run.
    pub correlation_id: Option<String>,
}

impl AgentTask {
    pub fn new(intent: impl Into<String>) -> Self {
        Self {
            intent: intent.into(),
            inputs: HashMap::new(),
            correlation_id: None,
        }
    }

    pub fn with_input(mut self, key: impl Into<String>, value: Value) -> Self {
        self.inputs.insert(key.into(), value);
        self
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    pub fn input_str(&self, key: &str) -> Option<&str> {
        self.inputs.get(key).and_then(|v| v.as_str())
    }
}

/// Lifecycle status of an `AgentResult`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Outcome of one agent invocation.
///
/// Invariant: `success` iff `status == Completed` and `error` is absent.
/// Construct via `AgentResult::completed`/`AgentResult::failed` to keep that
/// invariant by construction rather than by convention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResult {
    pub success: bool,
    pub status: AgentStatus,
    pub data: HashMap<String, Value>,
    pub error: Option<String>,
    /// At minimum carries `agent_name`, `agent_version`, and timing fields.
    pub metadata: HashMap<String, Value>,
}

impl AgentResult {
    pub fn completed(agent_name: &str, agent_version: &str, data: HashMap<String, Value>) -> Self {
        let mut metadata = HashMap::new();
        metadata.insert("agent_name".to_string(), Value::String(agent_name.to_string()));
        metadata.insert("agent_version".to_string(), Value::String(agent_version.to_string()));
        Self {
            success: true,
            status: AgentStatus::Completed,
            data,
            error: None,
            metadata,
        }
    }

    pub fn failed(agent_name: &str, agent_version: &str, error: impl Into<String>) -> Self {
        let mut metadata = HashMap::new();
        metadata.insert("agent_name".to_string(), Value::String(agent_name.to_string()));
        metadata.insert("agent_version".to_string(), Value::String(agent_version.to_string()));
        Self {
            success: false,
            status: AgentStatus::Failed,
            data: HashMap::new(),
            error: Some(error.into()),
            metadata,
        }
    }

    /// Record that a declared upstream report was not present in MemoryHub.
    /// The agent proceeds with what it has rather than failing the task.
    pub fn annotate_missing_upstream(&mut self, upstream: &str) {
        let entry = self
            .metadata
            .entry("missing_upstream".to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(list) = entry {
            list.push(Value::String(upstream.to_string()));
        }
    }

    pub fn with_timing_ms(mut self, millis: u128) -> Self {
        self.metadata
            .insert("duration_ms".to_string(), Value::from(millis as u64));
        self
    }

    pub fn with_raw_analysis(mut self, raw: impl Into<String>) -> Self {
        self.data
            .insert("raw_analysis".to_string(), Value::String(raw.into()));
        self.metadata
            .insert("warning".to_string(), Value::String("unparseable_structured_payload".to_string()));
        self
    }
}

/// Error returned by `Agent::execute` to the *caller*, never to the report
/// bus. `execute` itself never returns `Err` — this exists so internal
/// plumbing (circuit breaker, resource limiter, LLM calls) can use `?`
/// before being folded into `AgentResult::failed` at the top level.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("circuit open for agent")]
    CircuitOpen,
    #[error("resource limit exceeded: {0}")]
    ResourceExceeded(String),
    #[error("llm provider error: {0}")]
    Llm(String),
    #[error("invalid task: {0}")]
    InvalidTask(String),
}

/// Uniform execution model for every analysis/generation component.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Stable agent name, e.g. `"RequirementAnalyzer"`.
    fn name(&self) -> &str;

    /// Semantic version of this agent's implementation.
    fn version(&self) -> &str;

    fn kind(&self) -> AgentKind;

    /// Execute one task. Never returns `Err` across this boundary — failures
    /// are represented as `AgentResult::failed(..)`.
    async fn execute(&self, task: AgentTask) -> AgentResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_kind_name_and_critical() {
        assert_eq!(AgentKind::GapAnalyzer.name(), "GapAnalyzer");
        assert!(AgentKind::GapAnalyzer.is_critical());
        assert!(!AgentKind::StaticAnalyzer.is_critical());
    }

    #[test]
    fn agent_result_success_invariant_on_completed() {
        let result = AgentResult::completed("RequirementAnalyzer", "1.0.0", HashMap::new());
        assert!(result.success);
        assert_eq!(result.status, AgentStatus::Completed);
        assert!(result.error.is_none());
    }

    #[test]
    fn agent_result_success_invariant_on_failed() {
        let result = AgentResult::failed("GapAnalyzer", "1.0.0", "timeout");
        assert!(!result.success);
        assert_eq!(result.status, AgentStatus::Failed);
        assert_eq!(result.error.as_deref(), Some("timeout"));
    }

    #[test]
    fn annotate_missing_upstream_accumulates() {
        let mut result = AgentResult::completed("GapAnalyzer", "1.0.0", HashMap::new());
        result.annotate_missing_upstream("RequirementAnalyzer");
        result.annotate_missing_upstream("StaticAnalyzer");
        let list = result.metadata.get("missing_upstream").unwrap().as_array().unwrap();
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn task_builder_roundtrip() {
        let task = AgentTask::new("analyze_requirements")
            .with_input("text", Value::String("add dark mode".into()))
            .with_correlation_id("corr-1");
        assert_eq!(task.intent, "analyze_requirements");
        assert_eq!(task.input_str("text"), Some("add dark mode"));
        assert_eq!(task.correlation_id.as_deref(), Some("corr-1"));
    }
}
