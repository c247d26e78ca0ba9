//! RequirementAnalyzer
//!
//! Turns a natural-language upgrade request into a structured
//! `RequirementSpec`, plus a feasibility assessment. Grounded on
//! `backend/packages/agents/requirement_analyzer.py`:
//! `_gather_context` -> `_analyze_requirements` (LLM call + defensive parse)
//! -> `_create_specification` -> `_evaluate_feasibility` -> `_store_analysis`.

use async_trait::async_trait;
use orchestrator_core::agent::{Agent, AgentKind, AgentResult, AgentTask};
use orchestrator_llm::GenerateOptions;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::memory::ContextType;
use crate::safety::CircuitBreaker;

use super::support::{finish_err, finish_ok, parse_structured_response, task_text, AgentRuntime, Timer};

pub const VERSION: &str = "2.0.0";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RequirementSpec {
    pub goal: String,
    pub components: Vec<String>,
    pub constraints: Vec<String>,
    pub acceptance_criteria: Vec<String>,
}

/// Supplemented from the original source: a feasibility score alongside the
/// structured spec, not present in spec.md's distilled data model.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FeasibilityReport {
    pub score: f64,
    pub risk_level: String,
    pub warnings: Vec<String>,
    pub recommendations: Vec<String>,
}

fn evaluate_feasibility(spec: &RequirementSpec) -> FeasibilityReport {
    let complexity = spec.components.len() + spec.constraints.len();
    let mut warnings = Vec::new();
    let score = match complexity {
        0..=2 => 0.9,
        3..=5 => 0.7,
        6..=10 => {
            warnings.push("moderate component/constraint count may extend the plan phase".to_string());
            0.5
        }
        _ => {
            warnings.push("high component/constraint count; consider splitting the request".to_string());
            0.3
        }
    };
    let risk_level = if score >= 0.7 { "low" } else if score >= 0.5 { "medium" } else { "high" };
    FeasibilityReport {
        score,
        risk_level: risk_level.to_string(),
        warnings,
        recommendations: vec!["confirm acceptance criteria with stakeholders before the build phase".to_string()],
    }
}

pub struct RequirementAnalyzer {
    runtime: AgentRuntime,
    circuit_breaker: CircuitBreaker,
}

impl RequirementAnalyzer {
    pub fn new(runtime: AgentRuntime) -> Self {
        Self { runtime, circuit_breaker: CircuitBreaker::new(Default::default()) }
    }

    fn build_prompt(requirements_text: &str) -> String {
        format!(
            "Analyze the following upgrade request and return a JSON object with keys \
             `goal` (string), `components` (string array), `constraints` (string array), \
             `acceptance_criteria` (string array).\n\nRequest:\n{requirements_text}"
        )
    }
}

#[async_trait]
impl Agent for RequirementAnalyzer {
    fn name(&self) -> &str {
        "RequirementAnalyzer"
    }

    fn version(&self) -> &str {
        VERSION
    }

    fn kind(&self) -> AgentKind {
        AgentKind::RequirementAnalyzer
    }

    async fn execute(&self, task: AgentTask) -> AgentResult {
        let timer = Timer::start();
        let requirements_text = match task_text(&task, "requirements_text") {
            Some(text) => text,
            None => return finish_err(self.name(), self.version(), "missing `requirements_text` input", timer),
        };

        let prompt = Self::build_prompt(&requirements_text);
        let raw = match self
            .runtime
            .call_llm(&self.circuit_breaker, &prompt, None, &GenerateOptions::default())
            .await
        {
            Ok(text) => text,
            Err(e) => return finish_err(self.name(), self.version(), e, timer),
        };

        let parsed = parse_structured_response(&raw);
        let mut result = if parsed.get("raw_analysis").is_some() {
            let mut data = std::collections::HashMap::new();
            data.insert("raw_analysis".to_string(), parsed["raw_analysis"].clone());
            finish_ok(self.name(), self.version(), self.runtime.llm.model(), data, Vec::new(), timer).with_raw_analysis(raw)
        } else {
            let spec: RequirementSpec = serde_json::from_value(parsed.clone()).unwrap_or_default();
            let feasibility = evaluate_feasibility(&spec);

            self.runtime
                .store_analysis(
                    self.name(),
                    "requirement_analysis",
                    serde_json::json!({ "spec": spec, "feasibility": feasibility }),
                    Some(86_400),
                )
                .await;
            self.runtime
                .memory
                .write(ContextType::SCtx, "requirements:latest", serde_json::to_value(&spec).unwrap(), Some(86_400))
                .await
                .ok();

            let mut data = std::collections::HashMap::new();
            data.insert("spec".to_string(), serde_json::to_value(&spec).unwrap());
            data.insert("feasibility".to_string(), serde_json::to_value(&feasibility).unwrap());
            finish_ok(self.name(), self.version(), self.runtime.llm.model(), data, Vec::new(), timer)
        };
        result.metadata.insert("agent_name".into(), Value::String(self.name().to_string()));
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feasibility_scores_simple_requests_highly() {
        let spec = RequirementSpec { components: vec!["a".into()], ..Default::default() };
        let report = evaluate_feasibility(&spec);
        assert_eq!(report.risk_level, "low");
    }

    #[test]
    fn feasibility_flags_large_requests() {
        let spec = RequirementSpec {
            components: (0..8).map(|i| i.to_string()).collect(),
            ..Default::default()
        };
        let report = evaluate_feasibility(&spec);
        assert_eq!(report.risk_level, "high");
        assert!(!report.warnings.is_empty());
    }
}
