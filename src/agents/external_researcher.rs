//! ExternalResearcher
//!
//! Consumes RequirementAnalyzer's spec plus every current-state analyzer's
//! report and asks the LLM to produce an external research pack: prior art,
//! library choices, known pitfalls. Grounded on
//! `backend/packages/agents/external_researcher.py`. Stored under
//! `external_research_{timestamp}` in `S_CTX` with a ~30 day TTL per the
//! key-naming convention (§4.2), so a later loop iteration can reuse it
//! instead of re-researching (see DESIGN.md's convergence/reuse decision).

use async_trait::async_trait;
use chrono::Utc;
use orchestrator_core::agent::{Agent, AgentKind, AgentResult, AgentTask};
use orchestrator_llm::GenerateOptions;
use serde::{Deserialize, Serialize};

use crate::memory::ContextType;
use crate::safety::CircuitBreaker;

use super::support::{finish_err, finish_ok, parse_structured_response, AgentRuntime, Timer};

pub const VERSION: &str = "1.0.0";
const RESEARCH_TTL_SECONDS: i64 = 60 * 60 * 24 * 30;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ResearchPack {
    pub prior_art: Vec<String>,
    pub library_recommendations: Vec<String>,
    pub known_pitfalls: Vec<String>,
    pub references: Vec<String>,
}

pub struct ExternalResearcher {
    runtime: AgentRuntime,
    circuit_breaker: CircuitBreaker,
}

impl ExternalResearcher {
    pub fn new(runtime: AgentRuntime) -> Self {
        Self { runtime, circuit_breaker: CircuitBreaker::new(Default::default()) }
    }

    /// Re-read the last research pack rather than re-running the LLM call.
    /// Used when the orchestrator loop re-enters the design phase and
    /// `refresh_research` is `false` (the default).
    pub async fn reuse_latest(&self) -> Option<serde_json::Value> {
        self.runtime.memory.get(ContextType::SCtx, "external_research:latest").await.ok().flatten()
    }
}

#[async_trait]
impl Agent for ExternalResearcher {
    fn name(&self) -> &str {
        "ExternalResearcher"
    }

    fn version(&self) -> &str {
        VERSION
    }

    fn kind(&self) -> AgentKind {
        AgentKind::ExternalResearcher
    }

    async fn execute(&self, task: AgentTask) -> AgentResult {
        let timer = Timer::start();
        let mut missing = Vec::new();
        let mut consumed = Vec::new();

        let requirements = self.runtime.read_upstream_tracked(ContextType::SCtx, "requirements:latest", &mut consumed).await;
        if requirements.is_none() {
            missing.push("RequirementAnalyzer");
        }
        let mut upstream_snapshot = serde_json::Map::new();
        if let Some(v) = requirements.clone() {
            upstream_snapshot.insert("requirements".into(), v);
        }
        for kind in ["static_analysis", "code_analysis", "behavior_analysis", "impact_analysis", "quality_analysis"] {
            let key = format!("latest_{kind}_analysis");
            match self.runtime.read_upstream_tracked(ContextType::SCtx, &key, &mut consumed).await {
                Some(v) => {
                    upstream_snapshot.insert(kind.to_string(), v);
                }
                None => missing.push("current-state analyzer"),
            }
        }

        let goal = task.input_str("requirements_text").unwrap_or("the requested upgrade");
        let prompt = format!(
            "Given this upgrade goal and the current-state analyses below, produce a JSON \
             research pack with keys `prior_art` (string array), \
             `library_recommendations` (string array), `known_pitfalls` (string array), \
             `references` (string array).\n\nGoal: {goal}\n\nCurrent state:\n{}",
            serde_json::Value::Object(upstream_snapshot)
        );

        let raw = match self.runtime.call_llm(&self.circuit_breaker, &prompt, None, &GenerateOptions::default()).await {
            Ok(text) => text,
            Err(e) => return finish_err(self.name(), self.version(), e, timer),
        };

        let parsed = parse_structured_response(&raw);
        self.runtime.store_analysis(self.name(), "external_research", parsed.clone(), Some(RESEARCH_TTL_SECONDS)).await;
        self.runtime
            .memory
            .write(ContextType::SCtx, "external_research:latest", parsed.clone(), Some(RESEARCH_TTL_SECONDS))
            .await
            .ok();
        let timestamped_key = format!("external_research_{}", Utc::now().timestamp());
        self.runtime
            .memory
            .write(ContextType::SCtx, &timestamped_key, parsed.clone(), Some(RESEARCH_TTL_SECONDS))
            .await
            .ok();

        let mut data = std::collections::HashMap::new();
        data.insert("research".to_string(), parsed);
        let mut result = finish_ok(self.name(), self.version(), self.runtime.llm.model(), data, consumed, timer);
        for m in missing {
            result.annotate_missing_upstream(m);
        }
        result
    }
}
