//! Memory Hub
//!
//! The sole report bus: a central keyed store providing typed contexts,
//! TTL-based expiration, tag search, persistence, and lifecycle hooks.
//! Ported from `backend/packages/memory/hub.py`, translated from a global
//! `asyncio.Lock` per hub to a `tokio::sync::Mutex` guarding the five
//! in-memory contexts, with the sweeper as a `tokio::task::spawn`ed loop
//! cancelled on `shutdown()`.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, warn};

use super::contexts::{ContextType, MemoryContext, MemoryEntry};
use super::storage::{JsonMemoryStorage, MemoryStorage};
use crate::utils::error::{AppError, AppResult};

/// A single non-expired entry returned from `search`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SearchHit {
    pub key: String,
    pub value: Value,
    pub tags: Vec<String>,
    pub metadata: HashMap<String, Value>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<MemoryEntry> for SearchHit {
    fn from(e: MemoryEntry) -> Self {
        Self {
            key: e.key,
            value: e.value,
            tags: e.tags,
            metadata: e.metadata,
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ContextStats {
    pub context_type: ContextType,
    pub entry_count: usize,
    pub max_entries: Option<usize>,
    pub max_size_bytes: Option<usize>,
}

struct HubState {
    contexts: HashMap<ContextType, MemoryContext>,
}

pub struct MemoryHub {
    state: Mutex<Option<HubState>>,
    storage: Arc<dyn MemoryStorage>,
    auto_cleanup_interval: u64,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl MemoryHub {
    pub fn new(storage: Arc<dyn MemoryStorage>, auto_cleanup_interval: u64) -> Self {
        Self {
            state: Mutex::new(None),
            storage,
            auto_cleanup_interval,
            sweeper: Mutex::new(None),
        }
    }

    pub fn with_default_storage() -> Self {
        Self::new(Arc::new(JsonMemoryStorage::default()), 300)
    }

    /// Load all contexts from storage, starting the sweeper. Idempotent —
    /// calling twice is a no-op on the second call.
    pub async fn initialize(self: &Arc<Self>) -> AppResult<()> {
        let mut guard = self.state.lock().await;
        if guard.is_some() {
            return Ok(());
        }

        let mut contexts = HashMap::new();
        for ctx_type in ContextType::ALL {
            let loaded = match self.storage.load_context(ctx_type).await {
                Ok(Some(ctx)) => ctx,
                Ok(None) => MemoryContext::new(ctx_type, None, None),
                Err(e) => {
                    warn!(context = %ctx_type, error = %e, "failed to load context, starting empty");
                    MemoryContext::new(ctx_type, None, None)
                }
            };
            contexts.insert(ctx_type, loaded);
        }
        *guard = Some(HubState { contexts });
        drop(guard);

        if self.auto_cleanup_interval > 0 {
            let hub = Arc::clone(self);
            let handle = tokio::task::spawn(async move {
                hub.run_sweeper().await;
            });
            *self.sweeper.lock().await = Some(handle);
        }
        Ok(())
    }

    async fn run_sweeper(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(self.auto_cleanup_interval));
        loop {
            ticker.tick().await;
            if let Err(e) = self.sweep_once().await {
                error!(error = %e, "memory hub sweep failed");
            }
        }
    }

    async fn sweep_once(&self) -> AppResult<()> {
        let mut guard = self.state.lock().await;
        let state = guard.as_mut().ok_or_else(Self::not_initialized)?;
        for ctx_type in ContextType::ALL {
            if let Some(ctx) = state.contexts.get_mut(&ctx_type) {
                if ctx.cleanup_expired() > 0 {
                    self.storage.save_context(ctx).await?;
                }
            }
        }
        Ok(())
    }

    /// Cancel the sweeper and flush all contexts to storage.
    pub async fn shutdown(&self) -> AppResult<()> {
        if let Some(handle) = self.sweeper.lock().await.take() {
            handle.abort();
        }
        let guard = self.state.lock().await;
        if let Some(state) = guard.as_ref() {
            for ctx in state.contexts.values() {
                self.storage.save_context(ctx).await?;
            }
        }
        Ok(())
    }

    fn not_initialized() -> AppError {
        AppError::internal("MemoryHub used before initialize()")
    }

    /// `put(ctx, key, value, ttl?, tags?, metadata?)`. Returns `false` only
    /// on a storage/flush error; an existing key is updated, not rejected.
    pub async fn put(
        &self,
        context_type: ContextType,
        key: &str,
        value: Value,
        ttl_seconds: Option<i64>,
        tags: Vec<String>,
        metadata: HashMap<String, Value>,
    ) -> AppResult<bool> {
        let mut guard = self.state.lock().await;
        let state = guard.as_mut().ok_or_else(Self::not_initialized)?;
        let ctx = state
            .contexts
            .entry(context_type)
            .or_insert_with(|| MemoryContext::new(context_type, None, None));

        if let Some(existing) = ctx.entries.get_mut(key) {
            existing.update(value, Some(metadata));
            if !tags.is_empty() {
                existing.tags = tags;
            }
            if ttl_seconds.is_some() {
                existing.ttl_seconds = ttl_seconds;
            }
        } else {
            let entry = MemoryEntry::new(context_type, key, value, ttl_seconds, tags, metadata);
            if ctx.add_entry(entry).is_err() {
                // at capacity: treat as a non-fatal "already full" condition,
                // never raise for a capacity issue on a new key either.
                return Ok(false);
            }
        }

        match self.storage.save_context(ctx).await {
            Ok(()) => Ok(true),
            Err(e) => {
                warn!(error = %e, "failed to persist context after put");
                Ok(false)
            }
        }
    }

    pub async fn write(
        &self,
        context_type: ContextType,
        key: &str,
        value: Value,
        ttl_seconds: Option<i64>,
    ) -> AppResult<bool> {
        self.put(context_type, key, value, ttl_seconds, vec![], HashMap::new()).await
    }

    /// `get(ctx, key)`. Expired entries are treated as absent and removed
    /// lazily within this call.
    pub async fn get(&self, context_type: ContextType, key: &str) -> AppResult<Option<Value>> {
        let mut guard = self.state.lock().await;
        let state = guard.as_mut().ok_or_else(Self::not_initialized)?;
        let ctx = state
            .contexts
            .entry(context_type)
            .or_insert_with(|| MemoryContext::new(context_type, None, None));
        Ok(ctx.get_entry(key).map(|e| e.value))
    }

    pub async fn read(&self, context_type: ContextType, key: &str) -> AppResult<Option<Value>> {
        self.get(context_type, key).await
    }

    pub async fn search(&self, context_type: ContextType, tags: Vec<String>, limit: usize) -> AppResult<Vec<SearchHit>> {
        let mut guard = self.state.lock().await;
        let state = guard.as_mut().ok_or_else(Self::not_initialized)?;
        let ctx = state
            .contexts
            .entry(context_type)
            .or_insert_with(|| MemoryContext::new(context_type, None, None));
        Ok(ctx.search_by_tags(&tags, limit).into_iter().map(SearchHit::from).collect())
    }

    pub async fn delete(&self, context_type: ContextType, key: &str) -> AppResult<bool> {
        let mut guard = self.state.lock().await;
        let state = guard.as_mut().ok_or_else(Self::not_initialized)?;
        let ctx = state
            .contexts
            .entry(context_type)
            .or_insert_with(|| MemoryContext::new(context_type, None, None));
        let removed = ctx.remove_entry(key);
        if removed {
            self.storage.save_context(ctx).await?;
        }
        Ok(removed)
    }

    pub async fn clear_context(&self, context_type: ContextType) -> AppResult<()> {
        let mut guard = self.state.lock().await;
        let state = guard.as_mut().ok_or_else(Self::not_initialized)?;
        state.contexts.insert(context_type, MemoryContext::new(context_type, None, None));
        self.storage.delete_context(context_type).await?;
        Ok(())
    }

    pub async fn get_context_stats(&self, context_type: ContextType) -> AppResult<ContextStats> {
        let mut guard = self.state.lock().await;
        let state = guard.as_mut().ok_or_else(Self::not_initialized)?;
        let ctx = state
            .contexts
            .entry(context_type)
            .or_insert_with(|| MemoryContext::new(context_type, None, None));
        ctx.cleanup_expired();
        Ok(ContextStats {
            context_type,
            entry_count: ctx.entries.len(),
            max_entries: ctx.max_entries,
            max_size_bytes: ctx.max_size_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn hub_with_tempdir() -> (Arc<MemoryHub>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(JsonMemoryStorage::new(dir.path()));
        let hub = Arc::new(MemoryHub::new(storage, 0));
        hub.initialize().await.unwrap();
        (hub, dir)
    }

    #[tokio::test]
    async fn put_then_get_roundtrips() {
        let (hub, _dir) = hub_with_tempdir().await;
        hub.put(ContextType::SCtx, "requirements:latest", Value::String("x".into()), None, vec![], HashMap::new())
            .await
            .unwrap();
        let got = hub.get(ContextType::SCtx, "requirements:latest").await.unwrap();
        assert_eq!(got, Some(Value::String("x".into())));
    }

    #[tokio::test]
    async fn get_on_expired_entry_is_absent() {
        let (hub, _dir) = hub_with_tempdir().await;
        hub.put(ContextType::ACtx, "k", Value::Bool(true), Some(-1), vec![], HashMap::new())
            .await
            .unwrap();
        assert_eq!(hub.get(ContextType::ACtx, "k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn get_before_initialize_is_hard_error() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(JsonMemoryStorage::new(dir.path()));
        let hub = MemoryHub::new(storage, 0);
        assert!(hub.get(ContextType::SCtx, "k").await.is_err());
    }

    #[tokio::test]
    async fn put_preserves_created_at_on_update() {
        let (hub, _dir) = hub_with_tempdir().await;
        hub.put(ContextType::SCtx, "k", Value::Bool(true), None, vec![], HashMap::new())
            .await
            .unwrap();
        let stats_before = hub.get_context_stats(ContextType::SCtx).await.unwrap();
        hub.put(ContextType::SCtx, "k", Value::Bool(false), None, vec![], HashMap::new())
            .await
            .unwrap();
        let stats_after = hub.get_context_stats(ContextType::SCtx).await.unwrap();
        assert_eq!(stats_before.entry_count, stats_after.entry_count);
    }

    #[tokio::test]
    async fn delete_removes_entry() {
        let (hub, _dir) = hub_with_tempdir().await;
        hub.put(ContextType::OCtx, "k", Value::Null, None, vec![], HashMap::new())
            .await
            .unwrap();
        assert!(hub.delete(ContextType::OCtx, "k").await.unwrap());
        assert_eq!(hub.get(ContextType::OCtx, "k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn clear_context_empties_and_deletes_storage() {
        let (hub, _dir) = hub_with_tempdir().await;
        hub.put(ContextType::UCtx, "k", Value::Null, None, vec![], HashMap::new())
            .await
            .unwrap();
        hub.clear_context(ContextType::UCtx).await.unwrap();
        let stats = hub.get_context_stats(ContextType::UCtx).await.unwrap();
        assert_eq!(stats.entry_count, 0);
    }

    #[tokio::test]
    async fn search_or_matches_tags() {
        let (hub, _dir) = hub_with_tempdir().await;
        hub.put(ContextType::ACtx, "a", Value::Null, None, vec!["x".into()], HashMap::new())
            .await
            .unwrap();
        hub.put(ContextType::ACtx, "b", Value::Null, None, vec!["y".into()], HashMap::new())
            .await
            .unwrap();
        let hits = hub.search(ContextType::ACtx, vec!["x".into(), "y".into()], 10).await.unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn initialize_is_idempotent() {
        let (hub, _dir) = hub_with_tempdir().await;
        hub.put(ContextType::SCtx, "k", Value::Bool(true), None, vec![], HashMap::new())
            .await
            .unwrap();
        hub.initialize().await.unwrap();
        assert_eq!(hub.get(ContextType::SCtx, "k").await.unwrap(), Some(Value::Bool(true)));
    }
}
