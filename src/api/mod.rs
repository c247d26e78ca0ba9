//! HTTP control API
//!
//! The axum surface spec.md §6 names: kick off an upgrade run, poll its
//! status, fetch its report/documents, list prior runs, and a health
//! check. Grounded on `examples/ryanmaclean-tundra/crates/at-daemon`, the
//! pack's other axum control-plane example — the teacher's own control
//! surface is Tauri IPC, which doesn't fit a headless service.

pub mod analyze;
pub mod document;
pub mod health;
pub mod list;
pub mod report;
pub mod status;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::agents::AgentFleet;
use crate::memory::MemoryHub;
use crate::storage::OrchestratorConfig;

/// Shared state every handler needs: the report bus, the agent fleet (one
/// instance, shared across concurrent requests — every agent is `Sync`),
/// and the process config.
#[derive(Clone)]
pub struct ApiState {
    pub memory: Arc<MemoryHub>,
    pub fleet: Arc<AgentFleet>,
    pub config: Arc<OrchestratorConfig>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/upgrade/analyze", post(analyze::analyze))
        .route("/api/upgrade/status/:task_id", get(status::status))
        .route("/api/upgrade/report/:task_id", get(report::report))
        .route("/api/upgrade/document/:task_id/:doc_name", get(document::document))
        .route("/api/upgrade/list", get(list::list))
        .route("/api/health", get(health::health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
