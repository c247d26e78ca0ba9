//! QualityGate
//!
//! Dual-purpose agent, matching spec.md's use of the same `QualityGate`
//! `AgentKind` in two phases (§4.4): as one of the five current-state
//! analyzers in the Current-state phase (`intent = "assess_quality"`, the
//! "quality" entry in static/code/behavior/impact/quality), and as the
//! Validate-phase gate on generated code (`intent = "validate_code"`,
//! consuming CodeGenerator's output and StaticAnalyzer). Grounded on
//! `backend/packages/agents/quality_gate.py` and, for real project-type
//! detection rather than an LLM guess, `orchestrator-quality-gates`'
//! `detect_project_type`.

use async_trait::async_trait;
use orchestrator_core::agent::{Agent, AgentKind, AgentResult, AgentTask};
use orchestrator_llm::GenerateOptions;
use orchestrator_quality_gates::{detect_project_type, ValidatorRegistry};

use crate::memory::ContextType;
use crate::safety::CircuitBreaker;

use super::support::{finish_err, finish_ok, parse_structured_response, task_text, AgentRuntime, Timer};

pub const VERSION: &str = "1.0.0";

pub struct QualityGate {
    runtime: AgentRuntime,
    circuit_breaker: CircuitBreaker,
    validators: ValidatorRegistry,
}

impl QualityGate {
    pub fn new(runtime: AgentRuntime) -> Self {
        Self { runtime, circuit_breaker: CircuitBreaker::new(Default::default()), validators: ValidatorRegistry::new() }
    }

    async fn assess_quality(&self, task: &AgentTask, timer: Timer) -> AgentResult {
        let project_path = task_text(task, "project_path").unwrap_or_else(|| ".".to_string());
        let detection = detect_project_type(&project_path).ok();
        let project_summary = detection
            .as_ref()
            .map(|d| format!("{:?} project, suggested gates: {:?}", d.project_type, d.suggested_gates))
            .unwrap_or_else(|| "unknown project type".to_string());

        let prompt = format!(
            "Assess the current code quality of this project. Return JSON with keys \
             `findings` (string array) and `risk_level` (one of low/medium/high).\n\n\
             Project: {project_summary}"
        );

        let raw = match self.runtime.call_llm(&self.circuit_breaker, &prompt, None, &GenerateOptions::default()).await {
            Ok(text) => text,
            Err(e) => return finish_err(self.name(), self.version(), e, timer),
        };

        let parsed = parse_structured_response(&raw);
        self.runtime.store_analysis(self.name(), "quality_analysis", parsed.clone(), Some(86_400)).await;

        let mut data = std::collections::HashMap::new();
        data.insert("analysis".to_string(), parsed);
        finish_ok(self.name(), self.version(), self.runtime.llm.model(), data, Vec::new(), timer)
    }

    async fn validate_code(&self, task: &AgentTask, timer: Timer) -> AgentResult {
        let component = task_text(task, "component").unwrap_or_else(|| "unknown".to_string());
        let project_path = task_text(task, "project_path").unwrap_or_else(|| ".".to_string());
        let mut consumed = Vec::new();
        let generated_key = format!("CodeGenerator:component:{component}");
        let generated = self.runtime.read_upstream_tracked(ContextType::ACtx, &generated_key, &mut consumed).await;
        let missing_code = generated.is_none();
        let static_findings = self
            .runtime
            .read_upstream_tracked(ContextType::SCtx, "latest_static_analysis_analysis", &mut consumed)
            .await;
        let missing_static = static_findings.is_none();

        // Resolve the project's real applicable gates rather than leaving
        // gate selection entirely to the LLM's judgment.
        let detection = detect_project_type(&project_path).ok();
        let resolved_gates = detection
            .as_ref()
            .map(|d| self.validators.resolve(&d.suggested_gates))
            .unwrap_or_default();
        let gate_summary: Vec<_> = resolved_gates
            .iter()
            .map(|g| serde_json::json!({ "id": g.id, "name": g.name, "required": g.required }))
            .collect();

        let prompt = format!(
            "Validate this generated code against the static-analysis findings and the \
             project's applicable quality gates below. A gate marked `required: true` that \
             would plausibly fail must appear in `blocking_issues`; others belong in \
             `warnings`. Return JSON with keys `passed` (bool), `blocking_issues` (string \
             array), `warnings` (string array).\n\nGenerated: {}\n\nStatic analysis: {}\n\n\
             Applicable gates: {}",
            generated.clone().unwrap_or(serde_json::Value::Null),
            static_findings.clone().unwrap_or(serde_json::Value::Null),
            serde_json::Value::Array(gate_summary.clone()),
        );

        let raw = match self.runtime.call_llm(&self.circuit_breaker, &prompt, None, &GenerateOptions::default()).await {
            Ok(text) => text,
            Err(e) => return finish_err(self.name(), self.version(), e, timer),
        };

        let mut parsed = parse_structured_response(&raw);
        if let Some(obj) = parsed.as_object_mut() {
            obj.insert("applicable_gates".to_string(), serde_json::Value::Array(gate_summary));
        }
        self.runtime
            .memory
            .put(
                ContextType::ACtx,
                &format!("QualityGate:verdict:{component}"),
                parsed.clone(),
                None,
                vec!["QualityGate".to_string(), "quality_verdict".to_string()],
                Default::default(),
            )
            .await
            .ok();

        let mut data = std::collections::HashMap::new();
        data.insert("verdict".to_string(), parsed);
        let mut result = finish_ok(self.name(), self.version(), self.runtime.llm.model(), data, consumed, timer);
        if missing_code {
            result.annotate_missing_upstream("CodeGenerator");
        }
        if missing_static {
            result.annotate_missing_upstream("StaticAnalyzer");
        }
        result
    }
}

#[async_trait]
impl Agent for QualityGate {
    fn name(&self) -> &str {
        "QualityGate"
    }

    fn version(&self) -> &str {
        VERSION
    }

    fn kind(&self) -> AgentKind {
        AgentKind::QualityGate
    }

    async fn execute(&self, task: AgentTask) -> AgentResult {
        let timer = Timer::start();
        if task.intent == "validate_code" {
            self.validate_code(&task, timer).await
        } else {
            self.assess_quality(&task, timer).await
        }
    }
}
