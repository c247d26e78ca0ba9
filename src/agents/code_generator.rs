//! CodeGenerator
//!
//! Critical agent (§9). One invocation per component named in the
//! execution plan / executable task list (spec.md §4.4 step 7: "one
//! invocation per component in the plan"). Consumes PlannerAgent,
//! TaskCreatorAgent, and RequirementAnalyzer. Emits a unified diff against
//! the existing file content (via `similar`) and a SHA-256 checksum of the
//! generated content (via `sha2`) so the orchestrator can detect no-op
//! generations and QualityGate can re-check a stable artifact.
//!
//! Grounded on `backend/packages/agents/code_generator.py`. Per §5
//! (cancellation of a CodeGenerator invocation leaves prior per-component
//! artifacts intact): every component's artifact is written to its own
//! memory key and report file, never accumulated in one shared buffer that
//! a cancelled call could half-write.

use async_trait::async_trait;
use orchestrator_core::agent::{Agent, AgentKind, AgentResult, AgentTask};
use orchestrator_llm::GenerateOptions;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::memory::ContextType;
use crate::safety::CircuitBreaker;

use super::support::{finish_err, finish_ok, task_text, AgentRuntime, Timer};

pub const VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedComponent {
    pub component: String,
    pub file_path: String,
    pub content: String,
    pub sha256: String,
    pub unified_diff: String,
}

fn sha256_hex(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn unified_diff(old: &str, new: &str, file_path: &str) -> String {
    similar::TextDiff::from_lines(old, new)
        .unified_diff()
        .header(&format!("a/{file_path}"), &format!("b/{file_path}"))
        .to_string()
}

pub struct CodeGenerator {
    runtime: AgentRuntime,
    circuit_breaker: CircuitBreaker,
}

impl CodeGenerator {
    pub fn new(runtime: AgentRuntime) -> Self {
        Self { runtime, circuit_breaker: CircuitBreaker::new(Default::default()) }
    }
}

#[async_trait]
impl Agent for CodeGenerator {
    fn name(&self) -> &str {
        "CodeGenerator"
    }

    fn version(&self) -> &str {
        VERSION
    }

    fn kind(&self) -> AgentKind {
        AgentKind::CodeGenerator
    }

    /// `task.inputs` carries the per-component fields the Build phase fans
    /// out over: `component`, `file_path`, `task_description`, and
    /// optionally `existing_content` for diffing.
    async fn execute(&self, task: AgentTask) -> AgentResult {
        let timer = Timer::start();
        let mut missing = Vec::new();
        let mut consumed = Vec::new();

        if self
            .runtime
            .read_upstream_tracked(ContextType::OCtx, "execution_plan:latest", &mut consumed)
            .await
            .is_none()
        {
            missing.push("PlannerAgent");
        }
        if self
            .runtime
            .read_upstream_tracked(ContextType::OCtx, "executable_tasks:latest", &mut consumed)
            .await
            .is_none()
        {
            missing.push("TaskCreatorAgent");
        }
        if self
            .runtime
            .read_upstream_tracked(ContextType::SCtx, "requirements:latest", &mut consumed)
            .await
            .is_none()
        {
            missing.push("RequirementAnalyzer");
        }

        let component = match task_text(&task, "component") {
            Some(c) => c,
            None => return finish_err(self.name(), self.version(), "missing `component` input", timer),
        };
        let file_path = task_text(&task, "file_path").unwrap_or_else(|| format!("src/{component}.rs"));
        let description = task_text(&task, "task_description").unwrap_or_default();
        let existing_content = task_text(&task, "existing_content").unwrap_or_default();

        let prompt = format!(
            "Generate the complete contents of `{file_path}` implementing: {description}. \
             Return only the file content, no commentary or markdown fences.\n\n\
             Existing content (empty if new file):\n{existing_content}"
        );

        let raw = match self.runtime.call_llm(&self.circuit_breaker, &prompt, None, &GenerateOptions::default()).await {
            Ok(text) => text,
            Err(e) => return finish_err(self.name(), self.version(), e, timer),
        };

        let generated = GeneratedComponent {
            component: component.clone(),
            file_path: file_path.clone(),
            sha256: sha256_hex(&raw),
            unified_diff: unified_diff(&existing_content, &raw, &file_path),
            content: raw,
        };

        let value = serde_json::to_value(&generated).unwrap();
        self.runtime
            .memory
            .put(
                ContextType::ACtx,
                &format!("CodeGenerator:component:{component}"),
                value.clone(),
                None,
                vec!["CodeGenerator".to_string(), "generated_code".to_string()],
                Default::default(),
            )
            .await
            .ok();

        let mut data = std::collections::HashMap::new();
        data.insert("generated".to_string(), value);
        let mut result = finish_ok(self.name(), self.version(), self.runtime.llm.model(), data, consumed, timer);
        for m in missing {
            result.annotate_missing_upstream(m);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_is_stable() {
        assert_eq!(sha256_hex("hello"), sha256_hex("hello"));
        assert_ne!(sha256_hex("hello"), sha256_hex("world"));
    }

    #[test]
    fn unified_diff_empty_for_identical_content() {
        let diff = unified_diff("same\n", "same\n", "a.rs");
        assert!(diff.is_empty());
    }

    #[test]
    fn unified_diff_nonempty_for_changed_content() {
        let diff = unified_diff("old\n", "new\n", "a.rs");
        assert!(!diff.is_empty());
    }
}
