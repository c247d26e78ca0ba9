//! Upgrade Orchestrator — binary entry point
//!
//! Two invocation modes on one binary, per spec.md §6's CLI front-end: with
//! `--once` this runs a single upgrade cycle against a requirements string
//! and a project path, writes the final report, and exits with the coded
//! status (0/2/3/4/5); without it, starts the axum HTTP control API
//! (`crate::api`) and serves until signalled.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use upgrade_orchestrator::agents::support::AgentRuntime;
use upgrade_orchestrator::agents::AgentFleet;
use upgrade_orchestrator::api::{self, ApiState};
use upgrade_orchestrator::memory::{JsonMemoryStorage, MemoryHub};
use upgrade_orchestrator::orchestrator::{Orchestrator, RunOptions};
use upgrade_orchestrator::safety::{ResourceLimit, ResourceLimiter};
use upgrade_orchestrator::storage::OrchestratorConfig;

use orchestrator_llm::{LlmProvider, OpenAiCompatibleProvider, ProviderConfig};

/// Autonomous upgrade orchestrator: coordinates analysis/generation agents
/// to close the gap between a project's current state and a natural
/// -language upgrade request.
#[derive(Parser, Debug)]
#[command(name = "upgrade-orchestrator", version, about)]
struct Cli {
    /// Run a single upgrade cycle and exit, instead of starting the HTTP
    /// control API.
    #[arg(long)]
    once: bool,

    /// Natural-language upgrade/refactor/debug request. Required with
    /// `--once`.
    #[arg(short, long)]
    requirements: Option<String>,

    /// Target project directory.
    #[arg(short, long, default_value = ".")]
    project_path: String,

    /// Override the configured iteration cap for this run.
    #[arg(long)]
    max_iterations: Option<u32>,

    /// Re-run ExternalResearcher on every Design-phase re-entry instead of
    /// reusing the previous research pack.
    #[arg(long)]
    refresh_research: bool,

    /// Override the configured HTTP port when serving.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .json()
        .init();

    let cli = Cli::parse();

    let config = match OrchestratorConfig::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "failed to load configuration");
            return ExitCode::from(5);
        }
    };

    if cli.once {
        run_once(cli, config).await
    } else {
        run_server(cli, config).await
    }
}

/// Build the process-wide collaborators shared by both invocation modes:
/// the Memory Hub (initialized and sweeping), the process-shared resource
/// limiter, and the agent fleet wired to an LLM provider chosen from the
/// environment (`OPENAI_API_KEY`; an unset key degrades to the in-memory
/// mock provider rather than a hard failure, matching `safe_mode`'s
/// "err toward conservative behavior").
async fn build_runtime(config: &OrchestratorConfig) -> anyhow::Result<(Arc<MemoryHub>, Arc<AgentFleet>)> {
    let storage = Arc::new(JsonMemoryStorage::new(config.memory_base_path.clone()));
    let memory = Arc::new(MemoryHub::new(storage, config.auto_cleanup_interval));
    memory.initialize().await?;

    let resource_limiter = Arc::new(ResourceLimiter::new(ResourceLimit {
        max_memory_mb: config.max_memory_mb,
        max_cpu_percent: config.max_cpu_percent,
        max_execution_time: std::time::Duration::from_secs(config.max_execution_time_secs),
        max_concurrent_tasks: config.max_concurrent_tasks,
        ..Default::default()
    }));

    let llm: Arc<dyn LlmProvider> = match std::env::var("OPENAI_API_KEY") {
        Ok(api_key) => Arc::new(OpenAiCompatibleProvider::new(ProviderConfig {
            api_key: Some(api_key),
            base_url: None,
            model: config.provider_model.clone(),
        })),
        Err(_) => {
            tracing::warn!("OPENAI_API_KEY not set; falling back to the in-memory mock provider");
            Arc::new(orchestrator_llm::MockProvider::new("{}"))
        }
    };

    let runtime = AgentRuntime::new(Arc::clone(&memory), resource_limiter, llm);
    let fleet = Arc::new(AgentFleet::new(runtime));
    Ok((memory, fleet))
}

async fn run_once(cli: Cli, config: OrchestratorConfig) -> ExitCode {
    let requirements_text = match &cli.requirements {
        Some(text) if !text.trim().is_empty() => text.clone(),
        _ => {
            eprintln!("--once requires --requirements <text>");
            return ExitCode::from(2);
        }
    };
    if !std::path::Path::new(&cli.project_path).exists() {
        eprintln!("project path does not exist: {}", cli.project_path);
        return ExitCode::from(2);
    }

    let (memory, fleet) = match build_runtime(&config).await {
        Ok(pair) => pair,
        Err(e) => {
            tracing::error!(error = %e, "failed to initialize orchestrator runtime");
            return ExitCode::from(5);
        }
    };

    let orchestrator = Orchestrator::new(Arc::clone(&fleet), Arc::clone(&memory), config);
    let options = RunOptions {
        refresh_research: cli.refresh_research,
        max_iterations: cli.max_iterations,
        severity_floor: None,
    };
    let task_id = uuid::Uuid::new_v4().to_string();
    let report = orchestrator.run_upgrade(&task_id, &requirements_text, &cli.project_path, options).await;

    let summary_path = upgrade_orchestrator::reports::write_task_summary(&report).await.ok();
    if let Some(path) = &summary_path {
        println!("report written to {}", path.display());
    }
    println!("outcome: {:?} (iterations={})", report.outcome, report.iterations_run);

    let exit_code = report.outcome.exit_code();
    let _ = memory.shutdown().await;
    ExitCode::from(exit_code as u8)
}

async fn run_server(cli: Cli, config: OrchestratorConfig) -> ExitCode {
    let port = cli.port.unwrap_or(config.http_port);

    let (memory, fleet) = match build_runtime(&config).await {
        Ok(pair) => pair,
        Err(e) => {
            tracing::error!(error = %e, "failed to initialize orchestrator runtime");
            return ExitCode::from(5);
        }
    };

    let state = ApiState { memory: Arc::clone(&memory), fleet, config: Arc::new(config) };
    let router = api::router(state);

    let addr = format!("0.0.0.0:{port}");
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, addr, "failed to bind HTTP listener");
            return ExitCode::from(5);
        }
    };
    tracing::info!(addr, "upgrade orchestrator listening");

    let serve_result = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    let _ = memory.shutdown().await;
    match serve_result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "HTTP server exited with an error");
            ExitCode::from(5)
        }
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
