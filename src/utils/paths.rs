//! Cross-Platform Path Utilities
//!
//! Functions for resolving the orchestrator's on-disk layout: the memory
//! backend directory, the reports directory, and the config file.

use std::path::PathBuf;

use crate::utils::error::{AppError, AppResult};

/// Get the user's home directory.
pub fn home_dir() -> AppResult<PathBuf> {
    dirs::home_dir().ok_or_else(|| AppError::config("Could not determine home directory"))
}

/// Get the orchestrator's data directory (`~/.upgrade-orchestrator/`).
pub fn orchestrator_dir() -> AppResult<PathBuf> {
    Ok(home_dir()?.join(".upgrade-orchestrator"))
}

/// Get the config file path (`~/.upgrade-orchestrator/config.toml`).
pub fn config_path() -> AppResult<PathBuf> {
    Ok(orchestrator_dir()?.join("config.toml"))
}

/// Get the default memory backend base directory
/// (`~/.upgrade-orchestrator/memory/`), overridable via `memory_base_path`.
pub fn default_memory_base() -> AppResult<PathBuf> {
    Ok(orchestrator_dir()?.join("memory"))
}

/// Get the default reports directory (`./reports`), per §6.
pub fn default_reports_dir() -> PathBuf {
    PathBuf::from("reports")
}

/// Get the default task scratch directory (`/tmp/t-developer/reports/{task_id}`).
pub fn task_reports_dir(task_id: &str) -> PathBuf {
    PathBuf::from("/tmp/t-developer/reports").join(task_id)
}

/// Build a short textual summary of a project directory for the
/// current-state analyzers to reason over: a capped list of relative file
/// paths (skipping common build/VCS directories), newline-joined.
/// `glob`/`ignore` were dropped from the dependency set (DESIGN.md) since
/// no caller needed full gitignore-aware walking; this direct `read_dir`
/// recursion with a hard cap is the plain-stdlib equivalent for the one
/// caller that does.
pub fn summarize_project(project_path: &str) -> String {
    const MAX_ENTRIES: usize = 500;
    const SKIP_DIRS: &[&str] = &[".git", "target", "node_modules", "dist", "build", ".venv", "__pycache__"];

    let root = PathBuf::from(project_path);
    let mut files = Vec::new();
    let mut stack = vec![root.clone()];
    while let Some(dir) = stack.pop() {
        if files.len() >= MAX_ENTRIES {
            break;
        }
        let Ok(entries) = std::fs::read_dir(&dir) else { continue };
        for entry in entries.flatten() {
            if files.len() >= MAX_ENTRIES {
                break;
            }
            let path = entry.path();
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if path.is_dir() {
                if !SKIP_DIRS.contains(&name.as_ref()) {
                    stack.push(path);
                }
            } else {
                let relative = path.strip_prefix(&root).unwrap_or(&path);
                files.push(relative.to_string_lossy().into_owned());
            }
        }
    }
    files.sort();

    if files.is_empty() {
        format!("project at {project_path} (no readable files found)")
    } else {
        format!("project at {project_path}, {} files:\n{}", files.len(), files.join("\n"))
    }
}

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &PathBuf) -> AppResult<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Get the orchestrator data directory, creating it if it doesn't exist.
pub fn ensure_orchestrator_dir() -> AppResult<PathBuf> {
    let path = orchestrator_dir()?;
    ensure_dir(&path)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_home_dir() {
        let home = home_dir();
        assert!(home.is_ok());
    }

    #[test]
    fn test_orchestrator_dir() {
        let dir = orchestrator_dir();
        assert!(dir.is_ok());
        let path = dir.unwrap();
        assert!(path.to_string_lossy().contains(".upgrade-orchestrator"));
    }

    #[test]
    fn test_config_path() {
        let path = config_path();
        assert!(path.is_ok());
        assert!(path.unwrap().to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn test_task_reports_dir() {
        let path = task_reports_dir("abc-123");
        assert!(path.to_string_lossy().contains("abc-123"));
    }

    #[test]
    fn summarize_project_lists_files_and_skips_build_dirs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("main.rs"), "fn main() {}").unwrap();
        std::fs::create_dir(dir.path().join("target")).unwrap();
        std::fs::write(dir.path().join("target").join("ignored.txt"), "x").unwrap();

        let summary = summarize_project(dir.path().to_str().unwrap());
        assert!(summary.contains("main.rs"));
        assert!(!summary.contains("ignored.txt"));
    }

    #[test]
    fn summarize_project_handles_missing_directory() {
        let summary = summarize_project("/no/such/path/at/all");
        assert!(summary.contains("no readable files found"));
    }
}
