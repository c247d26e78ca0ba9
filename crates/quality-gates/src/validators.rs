//! Pre-configured Quality Gate Definitions
//!
//! Concrete `QualityGate` definitions per `ProjectType`, keyed by the same
//! gate-id vocabulary `ProjectDetector::get_suggested_gates` already emits
//! (`cargo-check`, `eslint`, `pytest`, `go-vet`, ...), so a caller can go
//! straight from `detect_project_type`'s `suggested_gates` to a runnable
//! `QualityGate` via `ValidatorRegistry::get`.

use std::collections::HashMap;

use crate::models::{ProjectType, QualityGate};

/// Looks up pre-configured, per-project-type gate definitions by id.
pub struct ValidatorRegistry {
    gates: HashMap<String, QualityGate>,
}

impl ValidatorRegistry {
    /// Build the registry with the default gate set for every supported
    /// `ProjectType`.
    pub fn new() -> Self {
        let mut gates = HashMap::new();
        for gate in default_gates() {
            gates.insert(gate.id.clone(), gate);
        }
        Self { gates }
    }

    /// Look up one gate definition by id (e.g. `"cargo-test"`).
    pub fn get(&self, gate_id: &str) -> Option<&QualityGate> {
        self.gates.get(gate_id)
    }

    /// All gate definitions applicable to a given project type.
    pub fn for_project_type(&self, project_type: ProjectType) -> Vec<&QualityGate> {
        self.gates.values().filter(|g| g.project_types.contains(&project_type)).collect()
    }

    /// Resolve a list of suggested gate ids (as returned by
    /// `detect_project_type`) into their definitions, silently dropping any
    /// id this registry doesn't recognize.
    pub fn resolve(&self, gate_ids: &[String]) -> Vec<&QualityGate> {
        gate_ids.iter().filter_map(|id| self.gates.get(id)).collect()
    }
}

impl Default for ValidatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn default_gates() -> Vec<QualityGate> {
    vec![
        QualityGate::new("cargo-check", "cargo check", "cargo")
            .with_args(vec!["check".to_string()])
            .for_project_types(vec![ProjectType::Rust]),
        QualityGate::new("cargo-clippy", "cargo clippy", "cargo")
            .with_args(vec!["clippy".to_string(), "--".to_string(), "-D".to_string(), "warnings".to_string()])
            .for_project_types(vec![ProjectType::Rust]),
        QualityGate::new("cargo-fmt", "cargo fmt --check", "cargo")
            .with_args(vec!["fmt".to_string(), "--".to_string(), "--check".to_string()])
            .required(false)
            .for_project_types(vec![ProjectType::Rust]),
        QualityGate::new("cargo-test", "cargo test", "cargo")
            .with_args(vec!["test".to_string()])
            .for_project_types(vec![ProjectType::Rust]),
        QualityGate::new("tsc", "TypeScript type check", "npx")
            .with_args(vec!["tsc".to_string(), "--noEmit".to_string()])
            .for_project_types(vec![ProjectType::NodeJs]),
        QualityGate::new("eslint", "ESLint", "npx")
            .with_args(vec!["eslint".to_string(), ".".to_string()])
            .for_project_types(vec![ProjectType::NodeJs]),
        QualityGate::new("prettier", "Prettier --check", "npx")
            .with_args(vec!["prettier".to_string(), "--check".to_string(), ".".to_string()])
            .required(false)
            .for_project_types(vec![ProjectType::NodeJs]),
        QualityGate::new("test", "npm test", "npm")
            .with_args(vec!["test".to_string()])
            .for_project_types(vec![ProjectType::NodeJs]),
        QualityGate::new("mypy", "mypy", "mypy")
            .with_args(vec![".".to_string()])
            .for_project_types(vec![ProjectType::Python]),
        QualityGate::new("ruff", "ruff check", "ruff")
            .with_args(vec!["check".to_string(), ".".to_string()])
            .for_project_types(vec![ProjectType::Python]),
        QualityGate::new("black", "black --check", "black")
            .with_args(vec!["--check".to_string(), ".".to_string()])
            .required(false)
            .for_project_types(vec![ProjectType::Python]),
        QualityGate::new("pytest", "pytest", "pytest")
            .for_project_types(vec![ProjectType::Python]),
        QualityGate::new("go-vet", "go vet", "go")
            .with_args(vec!["vet".to_string(), "./...".to_string()])
            .for_project_types(vec![ProjectType::Go]),
        QualityGate::new("go-fmt", "gofmt -l", "gofmt")
            .with_args(vec!["-l".to_string(), ".".to_string()])
            .required(false)
            .for_project_types(vec![ProjectType::Go]),
        QualityGate::new("go-test", "go test", "go")
            .with_args(vec!["test".to_string(), "./...".to_string()])
            .for_project_types(vec![ProjectType::Go]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_suggested_gate_ids_to_definitions() {
        let registry = ValidatorRegistry::new();
        let suggested = vec!["cargo-check".to_string(), "cargo-test".to_string(), "nonexistent".to_string()];
        let resolved = registry.resolve(&suggested);
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].id, "cargo-check");
    }

    #[test]
    fn for_project_type_filters_by_rust() {
        let registry = ValidatorRegistry::new();
        let rust_gates = registry.for_project_type(ProjectType::Rust);
        assert!(rust_gates.iter().any(|g| g.id == "cargo-test"));
        assert!(!rust_gates.iter().any(|g| g.id == "eslint"));
    }

    #[test]
    fn get_returns_none_for_unknown_id() {
        let registry = ValidatorRegistry::new();
        assert!(registry.get("does-not-exist").is_none());
    }
}
