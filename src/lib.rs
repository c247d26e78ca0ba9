//! Upgrade Orchestrator
//!
//! An autonomous upgrade orchestrator for software projects: given a target
//! project directory and a natural-language upgrade/refactor/debug request,
//! it coordinates a fleet of LLM-backed analysis and generation agents
//! (`crate::agents`) through a shared report bus (`crate::memory`), guarded
//! by a safety layer of per-agent circuit breakers and a process-wide
//! resource limiter (`crate::safety`), iterating a nine-phase loop
//! (`crate::orchestrator`) until the gap between current and target state
//! closes or the iteration cap is reached.
//!
//! The binary (`src/main.rs`) exposes this as both a headless HTTP control
//! API (`crate::api`) and a `--once` CLI mode that runs a single upgrade
//! cycle and exits with the coded status from spec.md §6.

pub mod agents;
pub mod api;
pub mod memory;
pub mod orchestrator;
pub mod reports;
pub mod safety;
pub mod storage;
pub mod utils;

pub use agents::AgentFleet;
pub use memory::MemoryHub;
pub use orchestrator::{Orchestrator, RunOptions, UpgradeOutcome, UpgradeReport};
pub use storage::OrchestratorConfig;
pub use utils::error::{AppError, AppResult};
