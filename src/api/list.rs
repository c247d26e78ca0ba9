//! `GET /api/upgrade/list`
//!
//! Backed directly by each task's persisted `summary.json` rather than a
//! separate index file (spec.md §B.4).

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::reports::{list_task_ids, read_task_summary, TaskSummary};

use super::ApiState;

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub tasks: Vec<TaskSummary>,
}

pub async fn list(State(_state): State<ApiState>) -> Json<ListResponse> {
    let ids = list_task_ids().await.unwrap_or_default();
    let mut tasks = Vec::new();
    for id in ids {
        if let Ok(Some(summary)) = read_task_summary(&id).await {
            tasks.push(summary);
        }
    }
    Json(ListResponse { tasks })
}
