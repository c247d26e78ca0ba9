//! `GET /api/upgrade/report/:task_id`
//!
//! Reads the completed `UpgradeReport` from `O_CTX` (the 7-day TTL copy)
//! falling back to the on-disk `report.json` under
//! `/tmp/t-developer/reports/{task_id}/` if the in-memory copy has expired
//! or the process restarted.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::memory::ContextType;
use crate::orchestrator::UpgradeReport;
use crate::reports::read_task_report;

use super::analyze::report_key;
use super::ApiState;

pub async fn report(State(state): State<ApiState>, Path(task_id): Path<String>) -> Result<Json<UpgradeReport>, StatusCode> {
    if let Ok(Some(value)) = state.memory.get(ContextType::OCtx, &report_key(&task_id)).await {
        if let Ok(report) = serde_json::from_value(value) {
            return Ok(Json(report));
        }
    }

    match read_task_report(&task_id).await {
        Ok(Some(report)) => Ok(Json(report)),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}
