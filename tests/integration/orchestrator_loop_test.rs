//! Orchestrator Loop Integration Tests
//!
//! Drives `Orchestrator::run_upgrade` end to end against
//! `orchestrator_llm::MockProvider`, covering end-to-end scenario 1 (happy
//! path, single converging pass) and scenario 2 (non-convergence once the
//! iteration cap is reached). Every agent shares one `MockProvider`
//! response, so the fixture JSON below carries every key any agent in the
//! loop might look for (`remaining_gaps`/`severity_max` for GapAnalyzer,
//! `tasks` for TaskCreatorAgent) — unrecognized extra keys are simply
//! ignored by the structs that deserialize a subset of them.

use std::sync::Arc;

use upgrade_orchestrator::agents::support::AgentRuntime;
use upgrade_orchestrator::agents::AgentFleet;
use upgrade_orchestrator::memory::{JsonMemoryStorage, MemoryHub};
use upgrade_orchestrator::orchestrator::{Orchestrator, RunOptions, UpgradeOutcome};
use upgrade_orchestrator::safety::{ResourceLimit, ResourceLimiter};
use upgrade_orchestrator::storage::OrchestratorConfig;

use orchestrator_llm::MockProvider;

async fn fleet_with(dir: &std::path::Path, response: &str) -> (Arc<AgentFleet>, Arc<MemoryHub>) {
    let storage = Arc::new(JsonMemoryStorage::new(dir));
    let memory = Arc::new(MemoryHub::new(storage, 0));
    memory.initialize().await.unwrap();
    let limiter = Arc::new(ResourceLimiter::new(ResourceLimit::default()));
    let llm = Arc::new(MockProvider::new(response));
    let runtime = AgentRuntime::new(Arc::clone(&memory), limiter, llm);
    (Arc::new(AgentFleet::new(runtime)), memory)
}

const CONVERGED_RESPONSE: &str = r#"{
    "remaining_gaps": [],
    "severity_max": "low",
    "tasks": [
        {"id": "t1", "component": "users_service", "description": "add JWT auth", "acceptance_criteria": ["login issues a signed token"]}
    ],
    "milestones": ["ship JWT auth"],
    "steps": [{"name": "add login endpoint", "description": "x", "estimated_effort_hours": 2.0, "depends_on": []}]
}"#;

const NON_CONVERGING_RESPONSE: &str = r#"{
    "remaining_gaps": [
        {"kind": "functional", "description": "no refresh-token rotation", "severity": "critical", "priority_score": 9.0}
    ],
    "severity_max": "critical",
    "tasks": [
        {"id": "t1", "component": "users_service", "description": "add JWT auth", "acceptance_criteria": ["login issues a signed token"]}
    ],
    "milestones": ["ship JWT auth"],
    "steps": []
}"#;

#[tokio::test]
async fn happy_path_single_pass_converges() {
    let dir = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();
    let (fleet, memory) = fleet_with(dir.path(), CONVERGED_RESPONSE).await;
    let config = OrchestratorConfig { max_iterations: 3, ..OrchestratorConfig::default() };
    let orchestrator = Orchestrator::new(fleet, memory, config);

    let report = orchestrator
        .run_upgrade(
            "task-happy-path",
            "Add JWT auth to the existing users service",
            project.path().to_str().unwrap(),
            RunOptions::default(),
        )
        .await;

    assert_eq!(report.outcome, UpgradeOutcome::Converged);
    assert_eq!(report.outcome.exit_code(), 0);
    assert_eq!(report.iterations_run, 1);
    assert!(report.gap_report.as_ref().unwrap().remaining_gaps.is_empty());
    assert_eq!(report.components.len(), 1);
    assert_eq!(report.components[0].component, "users_service");
    assert!(report.components[0].generated);

    let phase_names: Vec<&str> = report.phases.iter().map(|p| p.phase.as_str()).collect();
    assert!(phase_names.contains(&"requirement"));
    assert!(phase_names.contains(&"current_state"));
    assert!(phase_names.contains(&"build"));
    assert!(phase_names.contains(&"validate"));
}

#[tokio::test]
async fn non_convergence_stops_at_the_iteration_cap() {
    let dir = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();
    let (fleet, memory) = fleet_with(dir.path(), NON_CONVERGING_RESPONSE).await;
    let config = OrchestratorConfig { max_iterations: 2, ..OrchestratorConfig::default() };
    let orchestrator = Orchestrator::new(fleet, memory, config);

    let report = orchestrator
        .run_upgrade(
            "task-non-convergence",
            "Add JWT auth to the existing users service",
            project.path().to_str().unwrap(),
            RunOptions::default(),
        )
        .await;

    assert_eq!(report.outcome, UpgradeOutcome::MaxIterationsExceeded);
    assert_eq!(report.outcome.exit_code(), 4);
    assert_eq!(report.iterations_run, 2);
    assert!(!report.gap_report.as_ref().unwrap().remaining_gaps.is_empty());
}

#[tokio::test]
async fn severity_floor_override_treats_high_severity_gaps_as_converged() {
    let dir = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();
    let (fleet, memory) = fleet_with(dir.path(), NON_CONVERGING_RESPONSE).await;
    let config = OrchestratorConfig { max_iterations: 3, ..OrchestratorConfig::default() };
    let orchestrator = Orchestrator::new(fleet, memory, config);

    let options = RunOptions { severity_floor: Some("critical".to_string()), ..RunOptions::default() };
    let report = orchestrator
        .run_upgrade("task-floor-override", "Add JWT auth", project.path().to_str().unwrap(), options)
        .await;

    assert_eq!(report.outcome, UpgradeOutcome::Converged);
    assert_eq!(report.iterations_run, 1);
}
