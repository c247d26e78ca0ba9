//! Context Types
//!
//! The five fixed-role memory contexts and the entry/context data model they
//! hold. Ported from the Python reference's `backend/packages/memory/contexts.py`:
//! same five context roles, same expiry and tag-search semantics, expressed
//! as Rust structs with serde derives instead of dataclasses.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::utils::error::{AppError, AppResult};

/// Closed enum of the five context roles. Adding a sixth role is a breaking
/// change to every report-flow convention in the agent contract, not a
/// config option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContextType {
    /// Plans, task lists, gating decisions, phase status.
    #[serde(rename = "orchestrator")]
    OCtx,
    /// Per-agent history, caches, generated artifacts.
    #[serde(rename = "agent")]
    ACtx,
    /// Current-task working set visible to all agents.
    #[serde(rename = "shared")]
    SCtx,
    /// User/team preferences, session-scoped research results.
    #[serde(rename = "user")]
    UCtx,
    /// Metrics, anomalies, execution traces.
    #[serde(rename = "observer")]
    ObsCtx,
}

impl ContextType {
    pub const ALL: [ContextType; 5] = [
        ContextType::OCtx,
        ContextType::ACtx,
        ContextType::SCtx,
        ContextType::UCtx,
        ContextType::ObsCtx,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContextType::OCtx => "orchestrator",
            ContextType::ACtx => "agent",
            ContextType::SCtx => "shared",
            ContextType::UCtx => "user",
            ContextType::ObsCtx => "observer",
        }
    }
}

impl fmt::Display for ContextType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContextType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "orchestrator" => Ok(ContextType::OCtx),
            "agent" => Ok(ContextType::ACtx),
            "shared" => Ok(ContextType::SCtx),
            "user" => Ok(ContextType::UCtx),
            "observer" => Ok(ContextType::ObsCtx),
            other => Err(AppError::parse(format!("unknown context type: {other}"))),
        }
    }
}

/// One stored value within a `MemoryContext`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub id: String,
    pub context_type: ContextType,
    pub key: String,
    pub value: Value,
    pub metadata: HashMap<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub ttl_seconds: Option<i64>,
    pub tags: Vec<String>,
}

impl MemoryEntry {
    pub fn new(
        context_type: ContextType,
        key: impl Into<String>,
        value: Value,
        ttl_seconds: Option<i64>,
        tags: Vec<String>,
        metadata: HashMap<String, Value>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            context_type,
            key: key.into(),
            value,
            metadata,
            created_at: now,
            updated_at: now,
            ttl_seconds,
            tags,
        }
    }

    pub fn is_expired(&self) -> bool {
        match self.ttl_seconds {
            None => false,
            Some(ttl) => (Utc::now() - self.created_at).num_seconds() > ttl,
        }
    }

    /// Merge new metadata and refresh `updated_at`. `created_at` is never
    /// touched — an update is not a re-creation.
    pub fn update(&mut self, value: Value, metadata: Option<HashMap<String, Value>>) {
        self.value = value;
        if let Some(extra) = metadata {
            self.metadata.extend(extra);
        }
        self.updated_at = Utc::now();
    }
}

/// A collection of entries of one `ContextType`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryContext {
    #[serde(rename = "type")]
    pub context_type: ContextType,
    pub entries: HashMap<String, MemoryEntry>,
    pub max_entries: Option<usize>,
    pub max_size_bytes: Option<usize>,
}

impl MemoryContext {
    pub fn new(context_type: ContextType, max_entries: Option<usize>, max_size_bytes: Option<usize>) -> Self {
        Self {
            context_type,
            entries: HashMap::new(),
            max_entries,
            max_size_bytes,
        }
    }

    /// Insert or replace an entry. Refuses to add a *new* key once
    /// `max_entries` is reached — updates to an existing key never count
    /// against the cap.
    pub fn add_entry(&mut self, entry: MemoryEntry) -> AppResult<()> {
        if !self.entries.contains_key(&entry.key) {
            if let Some(max) = self.max_entries {
                if self.entries.len() >= max {
                    return Err(AppError::validation(format!(
                        "context {} at max_entries ({max})",
                        self.context_type
                    )));
                }
            }
        }
        self.entries.insert(entry.key.clone(), entry);
        Ok(())
    }

    /// Lazily expire on read: an expired entry is removed and reported as
    /// absent in the same call.
    pub fn get_entry(&mut self, key: &str) -> Option<MemoryEntry> {
        let expired = self.entries.get(key).map(|e| e.is_expired()).unwrap_or(false);
        if expired {
            self.entries.remove(key);
            return None;
        }
        self.entries.get(key).cloned()
    }

    pub fn remove_entry(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, e)| e.is_expired())
            .map(|(k, _)| k.clone())
            .collect();
        for key in &expired_keys {
            self.entries.remove(key);
        }
        expired_keys.len()
    }

    /// OR-match: an entry matches if it carries any of the given tags.
    pub fn search_by_tags(&self, tags: &[String], limit: usize) -> Vec<MemoryEntry> {
        self.entries
            .values()
            .filter(|e| !e.is_expired())
            .filter(|e| tags.is_empty() || tags.iter().any(|t| e.tags.contains(t)))
            .take(limit)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_type_roundtrips_through_str() {
        for ctx in ContextType::ALL {
            let parsed: ContextType = ctx.as_str().parse().unwrap();
            assert_eq!(parsed.as_str(), ctx.as_str());
        }
    }

    #[test]
    fn entry_expiry() {
        let mut entry = MemoryEntry::new(ContextType::SCtx, "k", Value::Bool(true), Some(-1), vec![], HashMap::new());
        assert!(entry.is_expired());
        entry.ttl_seconds = None;
        assert!(!entry.is_expired());
    }

    #[test]
    fn update_preserves_created_at() {
        let mut entry = MemoryEntry::new(ContextType::SCtx, "k", Value::Null, None, vec![], HashMap::new());
        let created = entry.created_at;
        std::thread::sleep(std::time::Duration::from_millis(5));
        entry.update(Value::Bool(true), None);
        assert_eq!(entry.created_at, created);
        assert!(entry.updated_at >= created);
    }

    #[test]
    fn add_entry_respects_max_entries_for_new_keys_only() {
        let mut ctx = MemoryContext::new(ContextType::ACtx, Some(1), None);
        let e1 = MemoryEntry::new(ContextType::ACtx, "a", Value::Null, None, vec![], HashMap::new());
        ctx.add_entry(e1.clone()).unwrap();

        let e2 = MemoryEntry::new(ContextType::ACtx, "b", Value::Null, None, vec![], HashMap::new());
        assert!(ctx.add_entry(e2).is_err());

        // Updating the existing key does not count against the cap.
        let mut e1_updated = e1;
        e1_updated.value = Value::Bool(true);
        assert!(ctx.add_entry(e1_updated).is_ok());
    }

    #[test]
    fn get_entry_lazily_expires() {
        let mut ctx = MemoryContext::new(ContextType::ACtx, None, None);
        let entry = MemoryEntry::new(ContextType::ACtx, "a", Value::Null, Some(-1), vec![], HashMap::new());
        ctx.entries.insert("a".to_string(), entry);
        assert!(ctx.get_entry("a").is_none());
        assert!(!ctx.entries.contains_key("a"));
    }

    #[test]
    fn search_by_tags_is_or_match() {
        let mut ctx = MemoryContext::new(ContextType::ACtx, None, None);
        ctx.add_entry(MemoryEntry::new(
            ContextType::ACtx,
            "a",
            Value::Null,
            None,
            vec!["x".into()],
            HashMap::new(),
        ))
        .unwrap();
        ctx.add_entry(MemoryEntry::new(
            ContextType::ACtx,
            "b",
            Value::Null,
            None,
            vec!["y".into()],
            HashMap::new(),
        ))
        .unwrap();
        let found = ctx.search_by_tags(&["x".to_string(), "y".to_string()], 10);
        assert_eq!(found.len(), 2);
    }
}
