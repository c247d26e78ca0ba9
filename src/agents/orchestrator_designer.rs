//! OrchestratorDesigner
//!
//! Optional Design-phase agent (spec.md §4.4 step 5: "ArchitectAgent, then
//! OrchestratorDesigner (optional)"). Consumes the architecture proposal and
//! designs how the components integrate at runtime: call sequencing, data
//! flow between components, and failure-isolation boundaries. Synthesized
//! with the shared agent shape; no direct `original_source/` counterpart.

use async_trait::async_trait;
use orchestrator_core::agent::{Agent, AgentKind, AgentResult, AgentTask};
use orchestrator_llm::GenerateOptions;
use serde::{Deserialize, Serialize};

use crate::memory::ContextType;
use crate::safety::CircuitBreaker;

use super::support::{finish_err, finish_ok, parse_structured_response, AgentRuntime, Timer};

pub const VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IntegrationDesign {
    pub call_sequence: Vec<String>,
    pub data_flow_notes: Vec<String>,
    pub failure_isolation_boundaries: Vec<String>,
}

pub struct OrchestratorDesigner {
    runtime: AgentRuntime,
    circuit_breaker: CircuitBreaker,
}

impl OrchestratorDesigner {
    pub fn new(runtime: AgentRuntime) -> Self {
        Self { runtime, circuit_breaker: CircuitBreaker::new(Default::default()) }
    }
}

#[async_trait]
impl Agent for OrchestratorDesigner {
    fn name(&self) -> &str {
        "OrchestratorDesigner"
    }

    fn version(&self) -> &str {
        VERSION
    }

    fn kind(&self) -> AgentKind {
        AgentKind::OrchestratorDesigner
    }

    async fn execute(&self, _task: AgentTask) -> AgentResult {
        let timer = Timer::start();
        let mut consumed = Vec::new();
        let architecture = self
            .runtime
            .read_upstream_tracked(ContextType::OCtx, "architecture_proposal:latest", &mut consumed)
            .await;
        let missing_architecture = architecture.is_none();

        let prompt = format!(
            "Given this architecture proposal, design the runtime integration: the order \
             components are invoked in, how data flows between them, and where failure should \
             be isolated so one component's failure doesn't cascade. Return JSON with keys \
             `call_sequence` (string array), `data_flow_notes` (string array), \
             `failure_isolation_boundaries` (string array).\n\nArchitecture: {}",
            architecture.clone().unwrap_or(serde_json::Value::Null)
        );

        let raw = match self.runtime.call_llm(&self.circuit_breaker, &prompt, None, &GenerateOptions::default()).await {
            Ok(text) => text,
            Err(e) => return finish_err(self.name(), self.version(), e, timer),
        };

        let parsed = parse_structured_response(&raw);
        self.runtime.store_analysis(self.name(), "integration_design", parsed.clone(), Some(86_400)).await;
        self.runtime
            .memory
            .write(ContextType::OCtx, "integration_design:latest", parsed.clone(), Some(86_400))
            .await
            .ok();

        let mut data = std::collections::HashMap::new();
        data.insert("integration_design".to_string(), parsed);
        let mut result = finish_ok(self.name(), self.version(), self.runtime.llm.model(), data, consumed, timer);
        if missing_architecture {
            result.annotate_missing_upstream("ArchitectAgent");
        }
        result
    }
}
