//! `GET /api/upgrade/status/:task_id`

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::memory::ContextType;

use super::analyze::{status_key, StatusRecord};
use super::ApiState;

pub async fn status(State(state): State<ApiState>, Path(task_id): Path<String>) -> Result<Json<StatusRecord>, StatusCode> {
    let value = state
        .memory
        .get(ContextType::OCtx, &status_key(&task_id))
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    serde_json::from_value(value).map(Json).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}
