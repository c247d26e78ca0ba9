//! `POST /api/upgrade/analyze`
//!
//! Kicks off one upgrade run in the background and returns immediately with
//! a task id the caller polls via `/api/upgrade/status/:task_id`.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::memory::ContextType;
use crate::orchestrator::{Orchestrator, RunOptions};
use crate::reports::write_task_summary;

use super::ApiState;

const STATUS_TTL_SECONDS: i64 = 60 * 60 * 24;
const REPORT_TTL_SECONDS: i64 = 60 * 60 * 24 * 7;

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub requirements_text: String,
    #[serde(default = "default_project_path")]
    pub project_path: String,
    #[serde(default)]
    pub refresh_research: bool,
}

fn default_project_path() -> String {
    ".".to_string()
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub task_id: String,
    pub status: &'static str,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusRecord {
    pub task_id: String,
    pub state: String,
    pub outcome: Option<String>,
    pub result_path: Option<String>,
}

pub async fn analyze(State(state): State<ApiState>, Json(req): Json<AnalyzeRequest>) -> (StatusCode, Json<AnalyzeResponse>) {
    let task_id = Uuid::new_v4().to_string();

    let initial = StatusRecord { task_id: task_id.clone(), state: "running".to_string(), outcome: None, result_path: None };
    let _ = state
        .memory
        .put(
            ContextType::OCtx,
            &status_key(&task_id),
            serde_json::to_value(&initial).unwrap_or(Value::Null),
            Some(STATUS_TTL_SECONDS),
            vec!["upgrade_status".to_string()],
            Default::default(),
        )
        .await;

    let fleet = Arc::clone(&state.fleet);
    let memory = Arc::clone(&state.memory);
    let config = (*state.config).clone();
    let task_id_bg = task_id.clone();
    tokio::spawn(async move {
        let orchestrator = Orchestrator::new(fleet, Arc::clone(&memory), config);
        let options = RunOptions { refresh_research: req.refresh_research, ..Default::default() };
        let report = orchestrator.run_upgrade(&task_id_bg, &req.requirements_text, &req.project_path, options).await;

        let result_path = write_task_summary(&report).await.ok().map(|p| p.display().to_string());
        let final_status = StatusRecord {
            task_id: task_id_bg.clone(),
            state: "completed".to_string(),
            outcome: Some(format!("{:?}", report.outcome)),
            result_path,
        };
        let _ = memory
            .put(
                ContextType::OCtx,
                &status_key(&task_id_bg),
                serde_json::to_value(&final_status).unwrap_or(Value::Null),
                Some(STATUS_TTL_SECONDS),
                vec!["upgrade_status".to_string()],
                Default::default(),
            )
            .await;
        let _ = memory
            .put(
                ContextType::OCtx,
                &report_key(&task_id_bg),
                serde_json::to_value(&report).unwrap_or(Value::Null),
                Some(REPORT_TTL_SECONDS),
                vec!["upgrade_report".to_string()],
                Default::default(),
            )
            .await;
    });

    (StatusCode::ACCEPTED, Json(AnalyzeResponse { task_id, status: "running" }))
}

pub fn status_key(task_id: &str) -> String {
    format!("task_{task_id}_status")
}

pub fn report_key(task_id: &str) -> String {
    format!("task_{task_id}_report")
}
