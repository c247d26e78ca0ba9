//! Upgrade Orchestrator Core
//!
//! Foundational types shared by every crate in the workspace: the error
//! type and the Agent Contract (`AgentTask`, `AgentResult`, `Agent`,
//! `AgentKind`). This crate has zero dependencies on application-level code
//! (memory, safety, LLM providers, HTTP).
//!
//! ## Design Principles
//!
//! 1. Minimal external dependencies beyond serde/async-trait/thiserror.
//! 2. Trait-based abstraction at the one seam every agent crosses —
//!    `Agent::execute` — so the orchestrator loop never matches on a
//!    concrete agent type.
//! 3. Unidirectional dependency: this crate depends on nothing else in the
//!    workspace.

pub mod error;
pub mod agent;

pub use error::{CoreError, CoreResult};
pub use agent::{Agent, AgentError, AgentKind, AgentResult, AgentStatus, AgentTask};
