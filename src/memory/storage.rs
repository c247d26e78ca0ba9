//! Memory Storage Backend
//!
//! The persistence contract behind `MemoryHub`: one `MemoryContext` in, one
//! `MemoryContext` out, keyed by `ContextType`. The reference implementation
//! persists one JSON file per context under a base directory, mirroring
//! `backend/packages/memory/storage.py::JSONMemoryStorage` from the Python
//! reference (`aiofiles` there, `tokio::fs` here).

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use super::contexts::{ContextType, MemoryContext};
use crate::utils::error::AppResult;

/// Abstract persistence contract for memory contexts.
#[async_trait]
pub trait MemoryStorage: Send + Sync {
    async fn save_context(&self, ctx: &MemoryContext) -> AppResult<()>;
    async fn load_context(&self, context_type: ContextType) -> AppResult<Option<MemoryContext>>;
    async fn delete_context(&self, context_type: ContextType) -> AppResult<()>;
    async fn exists(&self, context_type: ContextType) -> bool;
}

/// Default storage backend: one JSON document per `ContextType` under
/// `base_path`, default `/tmp/t-developer/memory` — kept as a literal path
/// to match the filesystem layout contract other collaborators rely on.
pub struct JsonMemoryStorage {
    base_path: PathBuf,
}

impl JsonMemoryStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self { base_path: base_path.into() }
    }

    pub fn default_path() -> PathBuf {
        PathBuf::from("/tmp/t-developer/memory")
    }

    fn file_path(&self, context_type: ContextType) -> PathBuf {
        self.base_path.join(format!("{}.json", context_type.as_str()))
    }
}

impl Default for JsonMemoryStorage {
    fn default() -> Self {
        Self::new(Self::default_path())
    }
}

#[async_trait]
impl MemoryStorage for JsonMemoryStorage {
    async fn save_context(&self, ctx: &MemoryContext) -> AppResult<()> {
        fs::create_dir_all(&self.base_path).await?;
        let path = self.file_path(ctx.context_type);
        let body = serde_json::to_vec_pretty(ctx)?;
        fs::write(&path, body).await?;
        Ok(())
    }

    async fn load_context(&self, context_type: ContextType) -> AppResult<Option<MemoryContext>> {
        let path = self.file_path(context_type);
        if !Path::new(&path).exists() {
            return Ok(None);
        }
        let body = fs::read(&path).await?;
        let ctx: MemoryContext = serde_json::from_slice(&body)?;
        Ok(Some(ctx))
    }

    async fn delete_context(&self, context_type: ContextType) -> AppResult<()> {
        let path = self.file_path(context_type);
        if Path::new(&path).exists() {
            fs::remove_file(&path).await?;
        }
        Ok(())
    }

    async fn exists(&self, context_type: ContextType) -> bool {
        self.file_path(context_type).exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::collections::HashMap;

    #[tokio::test]
    async fn save_then_load_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonMemoryStorage::new(dir.path());

        let mut ctx = MemoryContext::new(ContextType::SCtx, None, None);
        ctx.add_entry(super::super::contexts::MemoryEntry::new(
            ContextType::SCtx,
            "requirements:latest",
            Value::String("hello".into()),
            None,
            vec![],
            HashMap::new(),
        ))
        .unwrap();

        storage.save_context(&ctx).await.unwrap();
        assert!(storage.exists(ContextType::SCtx).await);

        let loaded = storage.load_context(ContextType::SCtx).await.unwrap().unwrap();
        assert_eq!(loaded.entries.len(), 1);
    }

    #[tokio::test]
    async fn load_missing_context_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonMemoryStorage::new(dir.path());
        assert!(storage.load_context(ContextType::OCtx).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_context_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonMemoryStorage::new(dir.path());
        let ctx = MemoryContext::new(ContextType::UCtx, None, None);
        storage.save_context(&ctx).await.unwrap();
        storage.delete_context(ContextType::UCtx).await.unwrap();
        assert!(!storage.exists(ContextType::UCtx).await);
    }
}
