//! GapAnalyzer
//!
//! Critical agent (§9: aborts the loop on failure). Consumes
//! RequirementAnalyzer, every current-state analyzer, and ExternalResearcher,
//! and produces the `GapReport` that drives the orchestrator's convergence
//! check (§4.4). Grounded on `backend/packages/agents/gap_analyzer.py`.
//!
//! Supplemented from the original (spec.md's distillation drops this): gaps
//! are typed (`GapKind`) and carry a `priority_score` derived from business
//! impact, technical complexity, dependency count, risk level, and
//! implementation effort, not just a flat description list. Test-coverage
//! gaps additionally carry a `TestCoverageReport`.

use async_trait::async_trait;
use orchestrator_core::agent::{Agent, AgentKind, AgentResult, AgentTask};
use orchestrator_llm::GenerateOptions;
use serde::{Deserialize, Serialize};

use crate::memory::ContextType;
use crate::safety::CircuitBreaker;

use super::support::{finish_err, finish_ok, parse_structured_response, AgentRuntime, Timer};

pub const VERSION: &str = "1.0.0";

/// Matches spec.md §9's decided convergence floor: gaps at or below this
/// severity no longer block convergence.
pub const DEFAULT_SEVERITY_FLOOR: &str = "low";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapKind {
    Functional,
    NonFunctional,
    Coverage,
    Quality,
    Architectural,
    Integration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GapEntry {
    pub kind: GapKind,
    pub description: String,
    pub severity: String,
    /// 0.0-10.0 composite of business impact, technical complexity,
    /// dependency count, risk level, and implementation effort.
    pub priority_score: f64,
}

impl GapEntry {
    pub fn priority_score(
        business_impact: f64,
        technical_complexity: f64,
        dependency_count: u32,
        risk_level: f64,
        implementation_effort: f64,
    ) -> f64 {
        let dependency_factor = (dependency_count as f64).min(10.0) / 10.0;
        let raw = business_impact * 0.35 + technical_complexity * 0.2 + dependency_factor * 0.15
            + risk_level * 0.2
            + (10.0 - implementation_effort.min(10.0)) * 0.1;
        raw.clamp(0.0, 10.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TestCoverageReport {
    pub line_coverage_pct: f64,
    pub branch_coverage_pct: f64,
    pub function_coverage_pct: f64,
    pub uncovered_files: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GapReport {
    pub remaining_gaps: Vec<GapEntry>,
    pub severity_max: String,
    pub confidence_floor: Option<f64>,
    pub test_coverage: Option<TestCoverageReport>,
}

impl GapReport {
    /// The decided convergence predicate (spec.md §9 Open Question,
    /// resolved in DESIGN.md): empty `remaining_gaps`, OR every remaining
    /// gap's severity is at or below `floor`.
    pub fn has_converged(&self, floor: &str) -> bool {
        if self.remaining_gaps.is_empty() {
            return true;
        }
        self.remaining_gaps.iter().all(|g| severity_rank(&g.severity) <= severity_rank(floor))
    }
}

fn severity_rank(s: &str) -> u8 {
    match s.to_ascii_lowercase().as_str() {
        "critical" => 3,
        "high" => 2,
        "medium" => 1,
        _ => 0, // "low" and anything unrecognized floors at 0
    }
}

pub struct GapAnalyzer {
    runtime: AgentRuntime,
    circuit_breaker: CircuitBreaker,
}

impl GapAnalyzer {
    pub fn new(runtime: AgentRuntime) -> Self {
        Self { runtime, circuit_breaker: CircuitBreaker::new(Default::default()) }
    }
}

#[async_trait]
impl Agent for GapAnalyzer {
    fn name(&self) -> &str {
        "GapAnalyzer"
    }

    fn version(&self) -> &str {
        VERSION
    }

    fn kind(&self) -> AgentKind {
        AgentKind::GapAnalyzer
    }

    async fn execute(&self, task: AgentTask) -> AgentResult {
        let timer = Timer::start();
        let mut missing = Vec::new();
        let mut consumed = Vec::new();

        let requirements = self.runtime.read_upstream_tracked(ContextType::SCtx, "requirements:latest", &mut consumed).await;
        if requirements.is_none() {
            missing.push("RequirementAnalyzer");
        }
        let research = self.runtime.read_upstream_tracked(ContextType::SCtx, "external_research:latest", &mut consumed).await;
        if research.is_none() {
            missing.push("ExternalResearcher");
        }

        let mut state_snapshot = serde_json::Map::new();
        for kind in ["static_analysis", "code_analysis", "behavior_analysis", "impact_analysis", "quality_analysis"] {
            let key = format!("latest_{kind}_analysis");
            if let Some(v) = self.runtime.read_upstream_tracked(ContextType::SCtx, &key, &mut consumed).await {
                state_snapshot.insert(kind.to_string(), v);
            } else {
                missing.push("current-state analyzer");
            }
        }

        let goal = task.input_str("requirements_text").unwrap_or("the requested upgrade");
        let prompt = format!(
            "Compare the target requirements against the current-state analyses and research \
             pack below. Return JSON with keys `remaining_gaps` (array of objects with `kind` \
             one of functional/non_functional/coverage/quality/architectural/integration, \
             `description`, `severity` one of low/medium/high/critical, `priority_score` 0-10), \
             `severity_max` (the highest severity present, or \"low\" if no gaps remain).\n\n\
             Goal: {goal}\n\nCurrent state: {}\n\nResearch: {}",
            serde_json::Value::Object(state_snapshot),
            research.clone().unwrap_or(serde_json::Value::Null),
        );

        let raw = match self.runtime.call_llm(&self.circuit_breaker, &prompt, None, &GenerateOptions::default()).await {
            Ok(text) => text,
            Err(e) => return finish_err(self.name(), self.version(), e, timer),
        };

        let parsed = parse_structured_response(&raw);
        let report: GapReport = serde_json::from_value(parsed.clone()).unwrap_or(GapReport {
            remaining_gaps: vec![],
            severity_max: DEFAULT_SEVERITY_FLOOR.to_string(),
            confidence_floor: None,
            test_coverage: None,
        });

        self.runtime.store_analysis(self.name(), "gap_analysis", serde_json::to_value(&report).unwrap(), Some(86_400)).await;
        self.runtime
            .memory
            .write(ContextType::OCtx, "gap_report:latest", serde_json::to_value(&report).unwrap(), Some(86_400))
            .await
            .ok();

        let mut data = std::collections::HashMap::new();
        data.insert("gap_report".to_string(), serde_json::to_value(&report).unwrap());
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
    fn priority_score_rewards_high_impact_low_effort() {
        let high = GapEntry::priority_score(9.0, 5.0, 2, 7.0, 2.0);
        let low = GapEntry::priority_score(2.0, 5.0, 2, 2.0, 9.0);
        assert!(high > low);
    }

    #[test]
    fn convergence_true_when_no_gaps() {
        let report = GapReport { remaining_gaps: vec![], severity_max: "low".into(), confidence_floor: None, test_coverage: None };
        assert!(report.has_converged("low"));
    }

    #[test]
    fn convergence_false_when_gap_exceeds_floor() {
        let report = GapReport {
            remaining_gaps: vec![GapEntry { kind: GapKind::Functional, description: "x".into(), severity: "high".into(), priority_score: 5.0 }],
            severity_max: "high".into(),
            confidence_floor: None,
            test_coverage: None,
        };
        assert!(!report.has_converged("low"));
    }

    #[test]
    fn convergence_true_when_gaps_at_or_below_floor() {
        let report = GapReport {
            remaining_gaps: vec![GapEntry { kind: GapKind::Quality, description: "x".into(), severity: "low".into(), priority_score: 1.0 }],
            severity_max: "low".into(),
            confidence_floor: None,
            test_coverage: None,
        };
        assert!(report.has_converged("low"));
    }
}
