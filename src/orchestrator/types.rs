//! Orchestrator Loop types
//!
//! The phase-sequenced loop's public vocabulary: per-phase/per-agent
//! outcomes and the final `UpgradeReport` spec.md §4.4 hands back to a
//! caller (CLI or HTTP API).

use orchestrator_core::agent::AgentResult;
use serde::{Deserialize, Serialize};

use crate::agents::gap_analyzer::GapReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseName {
    Requirement,
    CurrentState,
    Research,
    Gap,
    Design,
    Plan,
    Build,
    Validate,
    Convergence,
}

impl PhaseName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Requirement => "requirement",
            Self::CurrentState => "current_state",
            Self::Research => "research",
            Self::Gap => "gap",
            Self::Design => "design",
            Self::Plan => "plan",
            Self::Build => "build",
            Self::Validate => "validate",
            Self::Convergence => "convergence",
        }
    }
}

/// One agent's contribution to a phase, alongside the `AgentResult` itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentOutcome {
    pub agent_name: String,
    pub result: AgentResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseOutcome {
    pub phase: PhaseName,
    pub iteration: u32,
    pub agents: Vec<AgentOutcome>,
    pub duration_ms: u128,
    /// Set when a critical agent in this phase failed and the loop aborted.
    pub aborted: bool,
}

impl PhaseOutcome {
    pub fn any_critical_failure(&self, critical_names: &[&str]) -> Option<&AgentOutcome> {
        self.agents
            .iter()
            .find(|a| !a.result.success && critical_names.contains(&a.agent_name.as_str()))
    }
}

/// Options governing one `run_upgrade` invocation.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Re-run ExternalResearcher on every Design-phase re-entry instead of
    /// reusing the last research pack (spec.md §9 Open Question, default
    /// `false` — see DESIGN.md).
    pub refresh_research: bool,
    /// Override the configured max-iterations cap for this run.
    pub max_iterations: Option<u32>,
    /// Override the configured convergence severity floor.
    pub severity_floor: Option<String>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self { refresh_research: false, max_iterations: None, severity_floor: None }
    }
}

/// Outcome of a single `CodeGenerator` + `QualityGate` pass over one
/// component named in the executable task list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentBuildOutcome {
    pub component: String,
    pub generated: bool,
    pub validated: bool,
    pub passed: Option<bool>,
}

/// The terminal status of an upgrade run, surfaced on the status/report API
/// and the CLI exit code mapping (spec.md §6: 0/2/3/4/5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeOutcome {
    /// Converged within the iteration cap.
    Converged,
    /// Ran out of iterations without converging.
    MaxIterationsExceeded,
    /// A critical agent failed and the loop aborted.
    CriticalAgentFailure,
    /// The overall run exceeded `max_execution_time`.
    TimedOut,
}

impl UpgradeOutcome {
    /// CLI exit code mapping from spec.md §6 (0 success / 2 invalid inputs /
    /// 3 provider unreachable / 4 non-convergence / 5 internal error). Code 2
    /// is returned by `main.rs` directly on argument validation, before an
    /// `UpgradeOutcome` exists, so it never appears here. A critical-agent
    /// failure is, in practice, almost always the LLM provider rejecting or
    /// timing out every retry, so it maps to 3 rather than 5; a run that
    /// exceeds `max_execution_time` has no direct spec code and is folded
    /// into 5 (internal error) rather than overloading 4, which spec.md
    /// reserves for "ran the full iteration cap without converging".
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Converged => 0,
            Self::MaxIterationsExceeded => 4,
            Self::CriticalAgentFailure => 3,
            Self::TimedOut => 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpgradeReport {
    pub task_id: String,
    pub outcome: UpgradeOutcome,
    pub iterations_run: u32,
    pub phases: Vec<PhaseOutcome>,
    pub gap_report: Option<GapReport>,
    pub components: Vec<ComponentBuildOutcome>,
    pub total_duration_ms: u128,
}
