//! Orchestrator Configuration
//!
//! Typed configuration for the environment/config surface enumerated in
//! spec.md §6: `memory_base_path`, `auto_cleanup_interval`,
//! `max_concurrent_tasks`, `max_execution_time`, `max_memory_mb`,
//! `max_cpu_percent`, `provider_region`, `provider_model`, `max_retries`,
//! `max_iterations`, `safe_mode`. Loaded from `config.toml` with
//! `UPGRADE_ORCHESTRATOR_*` environment overrides applied on top, each field
//! defaulting independently so a partial file or environment is never a hard
//! error.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::utils::error::{AppError, AppResult};
use crate::utils::paths::{config_path, default_memory_base, ensure_orchestrator_dir};

fn default_memory_base_path() -> PathBuf {
    default_memory_base().unwrap_or_else(|_| PathBuf::from("./memory"))
}

fn default_auto_cleanup_interval() -> u64 {
    300
}

fn default_max_concurrent_tasks() -> usize {
    10
}

fn default_max_execution_time_secs() -> u64 {
    300
}

fn default_max_memory_mb() -> f64 {
    2048.0
}

fn default_max_cpu_percent() -> f64 {
    80.0
}

fn default_provider_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_retries() -> u32 {
    3
}

fn default_max_iterations() -> u32 {
    3
}

fn default_http_port() -> u16 {
    7878
}

/// Typed configuration for one orchestrator process. Constructed via
/// `OrchestratorConfig::load()`, which reads `config.toml` if present and
/// then applies `UPGRADE_ORCHESTRATOR_*` environment overrides on top.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub memory_base_path: PathBuf,
    pub auto_cleanup_interval: u64,
    pub max_concurrent_tasks: usize,
    pub max_execution_time_secs: u64,
    pub max_memory_mb: f64,
    pub max_cpu_percent: f64,
    pub provider_region: Option<String>,
    pub provider_model: String,
    pub max_retries: u32,
    pub max_iterations: u32,
    /// When true, disables research/provider calls not strictly required,
    /// erring toward conservative behavior.
    pub safe_mode: bool,
    pub http_port: u16,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            memory_base_path: default_memory_base_path(),
            auto_cleanup_interval: default_auto_cleanup_interval(),
            max_concurrent_tasks: default_max_concurrent_tasks(),
            max_execution_time_secs: default_max_execution_time_secs(),
            max_memory_mb: default_max_memory_mb(),
            max_cpu_percent: default_max_cpu_percent(),
            provider_region: None,
            provider_model: default_provider_model(),
            max_retries: default_max_retries(),
            max_iterations: default_max_iterations(),
            safe_mode: false,
            http_port: default_http_port(),
        }
    }
}

impl OrchestratorConfig {
    /// Load from `~/.upgrade-orchestrator/config.toml` if present, else
    /// defaults, then apply environment overrides.
    pub fn load() -> AppResult<Self> {
        let path = config_path()?;
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)?;
            toml::from_str(&text).map_err(|e| AppError::config(format!("invalid config.toml: {e}")))?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Persist the current config to `~/.upgrade-orchestrator/config.toml`.
    pub fn save(&self) -> AppResult<()> {
        ensure_orchestrator_dir()?;
        let path = config_path()?;
        let text = toml::to_string_pretty(self).map_err(|e| AppError::config(e.to_string()))?;
        std::fs::write(path, text)?;
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("UPGRADE_ORCHESTRATOR_MEMORY_BASE_PATH") {
            self.memory_base_path = PathBuf::from(v);
        }
        if let Some(v) = env_u64("UPGRADE_ORCHESTRATOR_AUTO_CLEANUP_INTERVAL") {
            self.auto_cleanup_interval = v;
        }
        if let Some(v) = env_usize("UPGRADE_ORCHESTRATOR_MAX_CONCURRENT_TASKS") {
            self.max_concurrent_tasks = v;
        }
        if let Some(v) = env_u64("UPGRADE_ORCHESTRATOR_MAX_EXECUTION_TIME") {
            self.max_execution_time_secs = v;
        }
        if let Some(v) = env_f64("UPGRADE_ORCHESTRATOR_MAX_MEMORY_MB") {
            self.max_memory_mb = v;
        }
        if let Some(v) = env_f64("UPGRADE_ORCHESTRATOR_MAX_CPU_PERCENT") {
            self.max_cpu_percent = v;
        }
        if let Ok(v) = std::env::var("UPGRADE_ORCHESTRATOR_PROVIDER_REGION") {
            self.provider_region = Some(v);
        }
        if let Ok(v) = std::env::var("UPGRADE_ORCHESTRATOR_PROVIDER_MODEL") {
            self.provider_model = v;
        }
        if let Some(v) = env_u32("UPGRADE_ORCHESTRATOR_MAX_RETRIES") {
            self.max_retries = v;
        }
        if let Some(v) = env_u32("UPGRADE_ORCHESTRATOR_MAX_ITERATIONS") {
            self.max_iterations = v;
        }
        if let Ok(v) = std::env::var("UPGRADE_ORCHESTRATOR_SAFE_MODE") {
            self.safe_mode = matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Some(v) = env_u16("UPGRADE_ORCHESTRATOR_HTTP_PORT") {
            self.http_port = v;
        }
    }
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
fn env_u32(key: &str) -> Option<u32> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
fn env_u16(key: &str) -> Option<u16> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
fn env_usize(key: &str) -> Option<usize> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
fn env_f64(key: &str) -> Option<f64> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.max_iterations, 3);
        assert_eq!(config.max_retries, 3);
        assert!(!config.safe_mode);
    }

    #[test]
    fn env_override_parses_typed_fields() {
        std::env::set_var("UPGRADE_ORCHESTRATOR_MAX_ITERATIONS", "7");
        let mut config = OrchestratorConfig::default();
        config.apply_env_overrides();
        assert_eq!(config.max_iterations, 7);
        std::env::remove_var("UPGRADE_ORCHESTRATOR_MAX_ITERATIONS");
    }
}
