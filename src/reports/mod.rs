//! Report persistence
//!
//! `generate_report` from spec.md §4.2: renders one agent's `AgentResult`
//! to `reports/{AgentName}/{ISO-timestamp}/report.{md,json,html}`, and
//! `write_task_summary` renders a completed `UpgradeReport` to
//! `/tmp/t-developer/reports/{task_id}/summary.json` plus one artifact file
//! per generated component — paths kept verbatim from
//! `original_source/backend/packages/agents/*` and
//! `original_source/scripts/run_orchestrator.py`, which both treat
//! `/tmp/t-developer/reports` as a literal contract, not a configurable
//! path.

use std::path::PathBuf;

use chrono::Utc;
use orchestrator_core::agent::AgentResult;
use serde::{Deserialize, Serialize};

use crate::orchestrator::UpgradeReport;
use crate::utils::error::AppResult;
use crate::utils::paths::{default_reports_dir, task_reports_dir};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Markdown,
    Json,
    Html,
}

impl ReportFormat {
    fn extension(&self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Json => "json",
            Self::Html => "html",
        }
    }
}

/// Render one agent's result to `reports/{AgentName}/{ISO-timestamp}/report.{ext}`.
pub async fn generate_report(agent_name: &str, result: &AgentResult, format: ReportFormat) -> AppResult<PathBuf> {
    let timestamp = Utc::now().to_rfc3339();
    let dir = default_reports_dir().join(agent_name).join(&timestamp);
    tokio::fs::create_dir_all(&dir).await?;
    let path = dir.join(format!("report.{}", format.extension()));

    let content = match format {
        ReportFormat::Json => serde_json::to_string_pretty(result)?,
        ReportFormat::Markdown => render_markdown(agent_name, result),
        ReportFormat::Html => render_html(agent_name, result),
    };
    tokio::fs::write(&path, content).await?;
    Ok(path)
}

fn render_markdown(agent_name: &str, result: &AgentResult) -> String {
    let mut out = format!("# {agent_name}\n\nstatus: {:?}\nsuccess: {}\n\n", result.status, result.success);
    if let Some(error) = &result.error {
        out.push_str(&format!("## Error\n\n{error}\n\n"));
    }
    out.push_str("## Data\n\n```json\n");
    out.push_str(&serde_json::to_string_pretty(&result.data).unwrap_or_default());
    out.push_str("\n```\n");
    out
}

fn render_html(agent_name: &str, result: &AgentResult) -> String {
    format!(
        "<html><head><title>{agent_name}</title></head><body><h1>{agent_name}</h1><p>success: {}</p><pre>{}</pre></body></html>",
        result.success,
        html_escape(&serde_json::to_string_pretty(&result.data).unwrap_or_default()),
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Summary payload listed by `GET /api/upgrade/list` (spec.md §B.4: backed
/// by this same `summary.json`, not a separate index).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSummary {
    pub task_id: String,
    pub outcome: String,
    pub iterations_run: u32,
    pub components: usize,
    pub generated_at: String,
}

/// Write `/tmp/t-developer/reports/{task_id}/summary.json` plus one
/// artifact file per component the Build phase touched.
pub async fn write_task_summary(report: &UpgradeReport) -> AppResult<PathBuf> {
    let dir = task_reports_dir(&report.task_id);
    tokio::fs::create_dir_all(&dir).await?;

    let summary = TaskSummary {
        task_id: report.task_id.clone(),
        outcome: format!("{:?}", report.outcome),
        iterations_run: report.iterations_run,
        components: report.components.len(),
        generated_at: Utc::now().to_rfc3339(),
    };
    let summary_path = dir.join("summary.json");
    tokio::fs::write(&summary_path, serde_json::to_string_pretty(&summary)?).await?;

    let full_path = dir.join("report.json");
    tokio::fs::write(&full_path, serde_json::to_string_pretty(report)?).await?;

    for component in &report.components {
        let artifact_path = dir.join(format!("{}.json", component.component));
        tokio::fs::write(&artifact_path, serde_json::to_string_pretty(component)?).await?;
    }

    Ok(summary_path)
}

/// Read back a previously written summary, used by the `/api/upgrade/list`
/// and status endpoints.
pub async fn read_task_summary(task_id: &str) -> AppResult<Option<TaskSummary>> {
    let path = task_reports_dir(task_id).join("summary.json");
    if !path.exists() {
        return Ok(None);
    }
    let text = tokio::fs::read_to_string(path).await?;
    Ok(Some(serde_json::from_str(&text)?))
}

pub async fn read_task_report(task_id: &str) -> AppResult<Option<UpgradeReport>> {
    let path = task_reports_dir(task_id).join("report.json");
    if !path.exists() {
        return Ok(None);
    }
    let text = tokio::fs::read_to_string(path).await?;
    Ok(Some(serde_json::from_str(&text)?))
}

/// List every task id with a persisted summary under
/// `/tmp/t-developer/reports/`.
pub async fn list_task_ids() -> AppResult<Vec<String>> {
    let base = PathBuf::from("/tmp/t-developer/reports");
    if !base.exists() {
        return Ok(vec![]);
    }
    let mut ids = Vec::new();
    let mut entries = tokio::fs::read_dir(&base).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.path().join("summary.json").exists() {
            if let Some(name) = entry.file_name().to_str() {
                ids.push(name.to_string());
            }
        }
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[tokio::test]
    async fn render_markdown_includes_status() {
        let result = AgentResult::completed("RequirementAnalyzer", "1.0.0", HashMap::new());
        let md = render_markdown("RequirementAnalyzer", &result);
        assert!(md.contains("RequirementAnalyzer"));
        assert!(md.contains("success: true"));
    }

    #[tokio::test]
    async fn render_markdown_includes_error() {
        let result = AgentResult::failed("GapAnalyzer", "1.0.0", "boom");
        let md = render_markdown("GapAnalyzer", &result);
        assert!(md.contains("boom"));
    }
}
