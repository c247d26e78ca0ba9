//! Orchestrator Loop
//!
//! The nine-phase sequence driving one upgrade run: Requirement, then a
//! loop of Current-state (fan-out, re-run every pass so Gap always judges
//! fresh state), Research, Gap, Design (Architect then
//! OrchestratorDesigner), Plan (Planner then TaskCreator), Build (one
//! CodeGenerator invocation per component), Validate (one QualityGate
//! invocation per component), Convergence check — looping back to
//! Current-state when the gap report has not converged and the iteration
//! cap allows another pass. Grounded on the teacher's phase/iteration-runner idiom
//! (explicit phase struct, await-all fan-out, a driving loop owning
//! iteration count and cancellation) generalized from a five-phase
//! dev-workflow to this nine-phase upgrade loop, and on
//! `original_source/scripts/run_orchestrator.py` for the top-level
//! sequencing against a `MemoryHub`.

pub mod types;

pub use types::*;

use std::sync::Arc;
use std::time::{Duration, Instant};

use orchestrator_core::agent::{Agent, AgentResult, AgentTask};
use serde_json::Value;
use tracing::{info, warn};

use crate::agents::gap_analyzer::{GapEntry, GapReport};
use crate::agents::task_creator::ExecutableTask;
use crate::agents::AgentFleet;
use crate::memory::{ContextType, MemoryHub};
use crate::storage::OrchestratorConfig;

/// Critical agents that abort the loop when they fail, per
/// `AgentKind::is_critical`. Named here too so phase-abort checks don't have
/// to construct an `AgentKind` just to ask.
const CRITICAL_AGENT_NAMES: &[&str] = &["RequirementAnalyzer", "GapAnalyzer", "PlannerAgent", "CodeGenerator"];

pub struct Orchestrator {
    fleet: Arc<AgentFleet>,
    memory: Arc<MemoryHub>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(fleet: Arc<AgentFleet>, memory: Arc<MemoryHub>, config: OrchestratorConfig) -> Self {
        Self { fleet, memory, config }
    }

    /// Run one upgrade cycle to completion (or abort/timeout), per
    /// spec.md §4.4. `task_id` correlates every agent invocation and the
    /// persisted status/report entries (see `crate::reports`, `crate::api`).
    pub async fn run_upgrade(&self, task_id: &str, requirements_text: &str, project_path: &str, options: RunOptions) -> UpgradeReport {
        let overall_start = Instant::now();
        let deadline = Duration::from_secs(self.config.max_execution_time_secs.max(1));

        match tokio::time::timeout(deadline, self.run_upgrade_inner(task_id, requirements_text, project_path, options)).await {
            Ok(mut report) => {
                report.total_duration_ms = overall_start.elapsed().as_millis();
                report
            }
            Err(_) => UpgradeReport {
                task_id: task_id.to_string(),
                outcome: UpgradeOutcome::TimedOut,
                iterations_run: 0,
                phases: vec![],
                gap_report: None,
                components: vec![],
                total_duration_ms: overall_start.elapsed().as_millis(),
            },
        }
    }

    async fn run_upgrade_inner(&self, task_id: &str, requirements_text: &str, project_path: &str, options: RunOptions) -> UpgradeReport {
        let max_iterations = options.max_iterations.unwrap_or(self.config.max_iterations).max(1);
        let severity_floor = options.severity_floor.clone().unwrap_or_else(|| "low".to_string());

        let mut phases = Vec::new();

        // Phase 1: Requirement.
        let requirement_phase = self
            .run_single(PhaseName::Requirement, 0, &self.fleet.requirement_analyzer.clone(), || {
                AgentTask::new("analyze_requirements")
                    .with_input("requirements_text", Value::String(requirements_text.to_string()))
                    .with_correlation_id(task_id)
            })
            .await;
        let requirement_failed = requirement_phase.aborted;
        phases.push(requirement_phase);
        if requirement_failed {
            return self.abort_report(task_id, phases, UpgradeOutcome::CriticalAgentFailure);
        }

        let mut gap_report_final: Option<GapReport> = None;
        let mut components_final: Vec<ComponentBuildOutcome> = Vec::new();
        let mut iteration = 0;

        loop {
            iteration += 1;

            // Phase 2: Current-state (fan out over five analyzers), re-run
            // every iteration so the Gap phase judges convergence against
            // fresh state rather than the first pass's stale snapshot.
            let current_state_phase = self.run_current_state(task_id, project_path, iteration).await;
            phases.push(current_state_phase);

            // Phase 3: Research (reused across iterations unless refreshed).
            let research_phase = self.run_research(task_id, requirements_text, iteration, options.refresh_research).await;
            phases.push(research_phase);

            // Phase 4: Gap.
            let gap_phase = self
                .run_single(PhaseName::Gap, iteration, &self.fleet.gap_analyzer.clone(), || {
                    AgentTask::new("analyze_gaps").with_correlation_id(task_id)
                })
                .await;
            let gap_failed = gap_phase.aborted;
            let gap_report = gap_phase
                .agents
                .first()
                .and_then(|a| a.result.data.get("gap_report"))
                .and_then(|v| serde_json::from_value::<GapReport>(v.clone()).ok());
            phases.push(gap_phase);
            if gap_failed {
                return self.abort_report(task_id, phases, UpgradeOutcome::CriticalAgentFailure);
            }

            // Phase 5: Design (Architect, then OrchestratorDesigner).
            let design_phase = self.run_design(task_id, iteration).await;
            phases.push(design_phase);

            // Phase 6: Plan (Planner, then TaskCreator).
            let (plan_phase, plan_failed) = self.run_plan(task_id, iteration).await;
            phases.push(plan_phase);
            if plan_failed {
                return self.abort_report(task_id, phases, UpgradeOutcome::CriticalAgentFailure);
            }

            // Phase 7 & 8: Build and Validate, one pass per component.
            let (build_phase, validate_phase, components, build_failed) = self.run_build_and_validate(task_id, project_path, iteration).await;
            phases.push(build_phase);
            phases.push(validate_phase);
            components_final = components;
            if build_failed {
                return self.abort_report(task_id, phases, UpgradeOutcome::CriticalAgentFailure);
            }

            let converged = gap_report.as_ref().map(|g| g.has_converged(&severity_floor)).unwrap_or(false);
            gap_report_final = gap_report;
            info!(task_id, iteration, converged, "upgrade cycle iteration complete");

            if converged {
                return UpgradeReport {
                    task_id: task_id.to_string(),
                    outcome: UpgradeOutcome::Converged,
                    iterations_run: iteration,
                    phases,
                    gap_report: gap_report_final,
                    components: components_final,
                    total_duration_ms: 0,
                };
            }
            if iteration >= max_iterations {
                return UpgradeReport {
                    task_id: task_id.to_string(),
                    outcome: UpgradeOutcome::MaxIterationsExceeded,
                    iterations_run: iteration,
                    phases,
                    gap_report: gap_report_final,
                    components: components_final,
                    total_duration_ms: 0,
                };
            }
        }
    }

    fn abort_report(&self, task_id: &str, phases: Vec<PhaseOutcome>, outcome: UpgradeOutcome) -> UpgradeReport {
        UpgradeReport {
            task_id: task_id.to_string(),
            outcome,
            iterations_run: 0,
            phases,
            gap_report: None,
            components: vec![],
            total_duration_ms: 0,
        }
    }

    async fn run_single<A: Agent + ?Sized>(&self, phase: PhaseName, iteration: u32, agent: &Arc<A>, task_fn: impl FnOnce() -> AgentTask) -> PhaseOutcome {
        let timer = Instant::now();
        let task = task_fn();
        let result = agent.execute(task).await;
        let aborted = !result.success && CRITICAL_AGENT_NAMES.contains(&agent.name());
        if aborted {
            warn!(agent = agent.name(), phase = phase.as_str(), "critical agent failed, loop aborting");
        }
        PhaseOutcome {
            phase,
            iteration,
            agents: vec![AgentOutcome { agent_name: agent.name().to_string(), result }],
            duration_ms: timer.elapsed().as_millis(),
            aborted,
        }
    }

    async fn run_current_state(&self, task_id: &str, project_path: &str, iteration: u32) -> PhaseOutcome {
        let timer = Instant::now();
        let project_summary = crate::utils::paths::summarize_project(project_path);
        let analyzers = self.fleet.current_state_analyzers();
        let futures = analyzers.iter().map(|agent| {
            let agent = agent.clone();
            let task = AgentTask::new("assess_quality")
                .with_input("project_path", Value::String(project_path.to_string()))
                .with_input("project_summary", Value::String(project_summary.clone()))
                .with_correlation_id(task_id);
            async move {
                let result = agent.execute(task).await;
                AgentOutcome { agent_name: agent.name().to_string(), result }
            }
        });
        let agents = futures_util::future::join_all(futures).await;
        PhaseOutcome { phase: PhaseName::CurrentState, iteration, agents, duration_ms: timer.elapsed().as_millis(), aborted: false }
    }

    async fn run_research(&self, task_id: &str, requirements_text: &str, iteration: u32, refresh: bool) -> PhaseOutcome {
        let timer = Instant::now();
        if !refresh && iteration > 1 {
            if let Some(reused) = self.fleet.external_researcher.reuse_latest().await {
                let mut data = std::collections::HashMap::new();
                data.insert("research".to_string(), reused);
                data.insert("reused".to_string(), Value::Bool(true));
                let result = AgentResult::completed("ExternalResearcher", "1.0.0", data);
                return PhaseOutcome {
                    phase: PhaseName::Research,
                    iteration,
                    agents: vec![AgentOutcome { agent_name: "ExternalResearcher".to_string(), result }],
                    duration_ms: timer.elapsed().as_millis(),
                    aborted: false,
                };
            }
        }

        let task = AgentTask::new("research")
            .with_input("requirements_text", Value::String(requirements_text.to_string()))
            .with_correlation_id(task_id);
        let result = self.fleet.external_researcher.execute(task).await;
        PhaseOutcome {
            phase: PhaseName::Research,
            iteration,
            agents: vec![AgentOutcome { agent_name: "ExternalResearcher".to_string(), result }],
            duration_ms: timer.elapsed().as_millis(),
            aborted: false,
        }
    }

    async fn run_design(&self, task_id: &str, iteration: u32) -> PhaseOutcome {
        let timer = Instant::now();
        let architect_result = self.fleet.architect.execute(AgentTask::new("design_architecture").with_correlation_id(task_id)).await;
        let designer_result = self
            .fleet
            .orchestrator_designer
            .execute(AgentTask::new("design_integration").with_correlation_id(task_id))
            .await;
        PhaseOutcome {
            phase: PhaseName::Design,
            iteration,
            agents: vec![
                AgentOutcome { agent_name: "ArchitectAgent".to_string(), result: architect_result },
                AgentOutcome { agent_name: "OrchestratorDesigner".to_string(), result: designer_result },
            ],
            duration_ms: timer.elapsed().as_millis(),
            aborted: false,
        }
    }

    async fn run_plan(&self, task_id: &str, iteration: u32) -> (PhaseOutcome, bool) {
        let timer = Instant::now();
        let plan_result = self.fleet.planner.execute(AgentTask::new("build_plan").with_correlation_id(task_id)).await;
        let plan_failed = !plan_result.success;

        let task_creator_result = self
            .fleet
            .task_creator
            .execute(AgentTask::new("create_tasks").with_correlation_id(task_id))
            .await;

        let outcome = PhaseOutcome {
            phase: PhaseName::Plan,
            iteration,
            agents: vec![
                AgentOutcome { agent_name: "PlannerAgent".to_string(), result: plan_result },
                AgentOutcome { agent_name: "TaskCreatorAgent".to_string(), result: task_creator_result },
            ],
            duration_ms: timer.elapsed().as_millis(),
            aborted: plan_failed,
        };
        (outcome, plan_failed)
    }

    async fn run_build_and_validate(&self, task_id: &str, project_path: &str, iteration: u32) -> (PhaseOutcome, PhaseOutcome, Vec<ComponentBuildOutcome>, bool) {
        let build_timer = Instant::now();
        let tasks = self.load_executable_tasks().await;

        let mut build_agents = Vec::new();
        let mut validate_agents = Vec::new();
        let mut components = Vec::new();
        let mut build_failed = false;

        for task in &tasks {
            let file_path = format!("src/{}.rs", task.component);
            let existing_content = tokio::fs::read_to_string(format!("{project_path}/{file_path}")).await.unwrap_or_default();

            let gen_task = AgentTask::new("generate_component")
                .with_input("component", Value::String(task.component.clone()))
                .with_input("file_path", Value::String(file_path))
                .with_input("task_description", Value::String(task.description.clone()))
                .with_input("existing_content", Value::String(existing_content))
                .with_correlation_id(task_id);
            let gen_result = self.fleet.code_generator.execute(gen_task).await;
            let generated = gen_result.success;
            if !generated {
                build_failed = true;
            }
            build_agents.push(AgentOutcome { agent_name: "CodeGenerator".to_string(), result: gen_result });

            let validate_task = AgentTask::new("validate_code")
                .with_input("component", Value::String(task.component.clone()))
                .with_correlation_id(task_id);
            let validate_result = self.fleet.quality_gate.execute(validate_task).await;
            let passed = validate_result
                .data
                .get("verdict")
                .and_then(|v| v.get("passed"))
                .and_then(|v| v.as_bool());
            let validated = validate_result.success;
            validate_agents.push(AgentOutcome { agent_name: "QualityGate".to_string(), result: validate_result });

            components.push(ComponentBuildOutcome { component: task.component.clone(), generated, validated, passed });
        }

        let build_duration = build_timer.elapsed().as_millis();
        let validate_timer = Instant::now();
        let build_phase = PhaseOutcome { phase: PhaseName::Build, iteration, agents: build_agents, duration_ms: build_duration, aborted: build_failed };
        let validate_phase = PhaseOutcome { phase: PhaseName::Validate, iteration, agents: validate_agents, duration_ms: validate_timer.elapsed().as_millis(), aborted: false };
        (build_phase, validate_phase, components, build_failed)
    }

    /// Best-effort parse of `TaskCreatorAgent`'s `executable_tasks:latest`
    /// entry into the `tasks` array it's expected to carry. An
    /// unparseable or missing entry yields an empty list rather than a
    /// hard failure — the Build phase then simply does nothing this pass.
    async fn load_executable_tasks(&self) -> Vec<ExecutableTask> {
        let value = match self.memory.get(ContextType::OCtx, "executable_tasks:latest").await {
            Ok(Some(v)) => v,
            _ => return vec![],
        };
        value
            .get("tasks")
            .cloned()
            .and_then(|v| serde_json::from_value::<Vec<ExecutableTask>>(v).ok())
            .unwrap_or_default()
    }
}

/// Lookup helper: priority-sort a gap report's remaining gaps, highest
/// first. Used by the report renderer to surface the most urgent gaps.
pub fn sorted_gaps(report: &GapReport) -> Vec<&GapEntry> {
    let mut gaps: Vec<&GapEntry> = report.remaining_gaps.iter().collect();
    gaps.sort_by(|a, b| b.priority_score.partial_cmp(&a.priority_score).unwrap_or(std::cmp::Ordering::Equal));
    gaps
}
