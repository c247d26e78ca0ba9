//! Agent shells
//!
//! One module per member of the closed `AgentKind` variant set
//! (`orchestrator_core::agent::AgentKind`). Every agent is a thin wrapper
//! around `support::AgentRuntime`: read declared upstream reports from the
//! Memory Hub, call the LLM through the Safety Layer, parse defensively,
//! persist, return an `AgentResult`. See `support.rs` for the shared
//! scaffolding every agent in this module builds on.

pub mod support;

pub mod requirement_analyzer;
pub mod static_analyzer;
pub mod code_analyzer;
pub mod behavior_analyzer;
pub mod impact_analyzer;
pub mod external_researcher;
pub mod gap_analyzer;
pub mod architect;
pub mod orchestrator_designer;
pub mod planner;
pub mod task_creator;
pub mod code_generator;
pub mod quality_gate;

pub use architect::ArchitectAgent;
pub use behavior_analyzer::BehaviorAnalyzer;
pub use code_analyzer::CodeAnalyzer;
pub use code_generator::CodeGenerator;
pub use external_researcher::ExternalResearcher;
pub use gap_analyzer::GapAnalyzer;
pub use impact_analyzer::ImpactAnalyzer;
pub use orchestrator_designer::OrchestratorDesigner;
pub use planner::PlannerAgent;
pub use quality_gate::QualityGate;
pub use requirement_analyzer::RequirementAnalyzer;
pub use static_analyzer::StaticAnalyzer;
pub use task_creator::TaskCreatorAgent;
pub use support::AgentRuntime;

use std::sync::Arc;

use orchestrator_core::agent::Agent;

/// The thirteen agent instances the orchestrator loop dispatches against,
/// constructed once at startup from a shared `AgentRuntime` (§9: "explicit
/// orchestrator-owned singletons passed to agents at construction; no
/// ambient/global lookup at call sites").
pub struct AgentFleet {
    pub requirement_analyzer: Arc<RequirementAnalyzer>,
    pub static_analyzer: Arc<StaticAnalyzer>,
    pub code_analyzer: Arc<CodeAnalyzer>,
    pub behavior_analyzer: Arc<BehaviorAnalyzer>,
    pub impact_analyzer: Arc<ImpactAnalyzer>,
    pub quality_gate: Arc<QualityGate>,
    pub external_researcher: Arc<ExternalResearcher>,
    pub gap_analyzer: Arc<GapAnalyzer>,
    pub architect: Arc<ArchitectAgent>,
    pub orchestrator_designer: Arc<OrchestratorDesigner>,
    pub planner: Arc<PlannerAgent>,
    pub task_creator: Arc<TaskCreatorAgent>,
    pub code_generator: Arc<CodeGenerator>,
}

impl AgentFleet {
    pub fn new(runtime: AgentRuntime) -> Self {
        Self {
            requirement_analyzer: Arc::new(RequirementAnalyzer::new(runtime.clone())),
            static_analyzer: Arc::new(StaticAnalyzer::new(runtime.clone())),
            code_analyzer: Arc::new(CodeAnalyzer::new(runtime.clone())),
            behavior_analyzer: Arc::new(BehaviorAnalyzer::new(runtime.clone())),
            impact_analyzer: Arc::new(ImpactAnalyzer::new(runtime.clone())),
            quality_gate: Arc::new(QualityGate::new(runtime.clone())),
            external_researcher: Arc::new(ExternalResearcher::new(runtime.clone())),
            gap_analyzer: Arc::new(GapAnalyzer::new(runtime.clone())),
            architect: Arc::new(ArchitectAgent::new(runtime.clone())),
            orchestrator_designer: Arc::new(OrchestratorDesigner::new(runtime.clone())),
            planner: Arc::new(PlannerAgent::new(runtime.clone())),
            task_creator: Arc::new(TaskCreatorAgent::new(runtime.clone())),
            code_generator: Arc::new(CodeGenerator::new(runtime)),
        }
    }

    /// The five current-state analyzers fanned out over in the Current-state
    /// phase (spec.md §4.4 step 2), as trait objects for uniform dispatch.
    /// Criticality is looked up via `Agent::kind().is_critical()`, not
    /// duplicated here.
    pub fn current_state_analyzers(&self) -> Vec<Arc<dyn Agent>> {
        vec![
            self.static_analyzer.clone() as Arc<dyn Agent>,
            self.code_analyzer.clone() as Arc<dyn Agent>,
            self.behavior_analyzer.clone() as Arc<dyn Agent>,
            self.impact_analyzer.clone() as Arc<dyn Agent>,
            self.quality_gate.clone() as Arc<dyn Agent>,
        ]
    }
}
