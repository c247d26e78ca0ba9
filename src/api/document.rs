//! `GET /api/upgrade/document/:task_id/:doc_name`
//!
//! Serves one artifact file out of a task's report directory
//! (`/tmp/t-developer/reports/{task_id}/{doc_name}`) — e.g. a generated
//! component's `{component}.json`, `summary.json`, or `report.json`.
//! Content-type is chosen by extension per spec.md §6
//! (`.md` -> text/markdown, `.html` -> text/html, `.json` -> application/json).

use axum::extract::Path;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::utils::paths::task_reports_dir;

fn content_type_for(doc_name: &str) -> &'static str {
    match doc_name.rsplit('.').next() {
        Some("md") => "text/markdown",
        Some("html") => "text/html",
        Some("json") => "application/json",
        _ => "text/plain",
    }
}

pub async fn document(Path((task_id, doc_name)): Path<(String, String)>) -> Result<Response, StatusCode> {
    // Reject path traversal: a document name must be a bare filename.
    if doc_name.contains('/') || doc_name.contains("..") {
        return Err(StatusCode::BAD_REQUEST);
    }

    let path = task_reports_dir(&task_id).join(&doc_name);
    let body = tokio::fs::read_to_string(path).await.map_err(|_| StatusCode::NOT_FOUND)?;
    Ok(([(header::CONTENT_TYPE, content_type_for(&doc_name))], body).into_response())
}
