//! Memory Hub Integration Tests
//!
//! Exercises `MemoryHub` through its public API against a real on-disk
//! `JsonMemoryStorage`, covering spec.md §8's universal invariants and
//! end-to-end scenario 6 (TTL expiry).

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;

use upgrade_orchestrator::memory::{ContextType, JsonMemoryStorage, MemoryHub};

fn hub_in(dir: &std::path::Path) -> Arc<MemoryHub> {
    let storage = Arc::new(JsonMemoryStorage::new(dir));
    Arc::new(MemoryHub::new(storage, 0))
}

#[tokio::test]
async fn put_then_get_roundtrips_until_deleted() {
    let dir = tempfile::tempdir().unwrap();
    let hub = hub_in(dir.path());
    hub.initialize().await.unwrap();

    let ok = hub
        .put(ContextType::SCtx, "requirements:latest", json!({"goal": "add dark mode"}), None, vec![], HashMap::new())
        .await
        .unwrap();
    assert!(ok);

    let value = hub.get(ContextType::SCtx, "requirements:latest").await.unwrap();
    assert_eq!(value, Some(json!({"goal": "add dark mode"})));

    assert!(hub.delete(ContextType::SCtx, "requirements:latest").await.unwrap());
    assert_eq!(hub.get(ContextType::SCtx, "requirements:latest").await.unwrap(), None);
}

#[tokio::test]
async fn ttl_expiry_removes_entry_on_get() {
    let dir = tempfile::tempdir().unwrap();
    let hub = hub_in(dir.path());
    hub.initialize().await.unwrap();

    hub.put(ContextType::SCtx, "test:req", json!("value"), Some(1), vec![], HashMap::new())
        .await
        .unwrap();
    assert!(hub.get(ContextType::SCtx, "test:req").await.unwrap().is_some());

    tokio::time::sleep(std::time::Duration::from_secs(2)).await;

    assert_eq!(hub.get(ContextType::SCtx, "test:req").await.unwrap(), None);
    let stats = hub.get_context_stats(ContextType::SCtx).await.unwrap();
    assert_eq!(stats.entry_count, 0);
}

#[tokio::test]
async fn put_preserves_created_at_and_merges_metadata_on_update() {
    let dir = tempfile::tempdir().unwrap();
    let hub = hub_in(dir.path());
    hub.initialize().await.unwrap();

    let mut first_meta = HashMap::new();
    first_meta.insert("source".to_string(), json!("RequirementAnalyzer"));
    hub.put(ContextType::ACtx, "k", json!(1), None, vec![], first_meta).await.unwrap();

    let mut second_meta = HashMap::new();
    second_meta.insert("revision".to_string(), json!(2));
    hub.put(ContextType::ACtx, "k", json!(2), None, vec![], second_meta).await.unwrap();

    let hits = hub.search(ContextType::ACtx, vec![], 10).await.unwrap();
    let entry = hits.iter().find(|h| h.key == "k").unwrap();
    assert_eq!(entry.value, json!(2));
    assert_eq!(entry.metadata.get("source"), Some(&json!("RequirementAnalyzer")));
    assert_eq!(entry.metadata.get("revision"), Some(&json!(2)));
}

#[tokio::test]
async fn search_with_empty_tags_returns_all_non_expired_up_to_limit() {
    let dir = tempfile::tempdir().unwrap();
    let hub = hub_in(dir.path());
    hub.initialize().await.unwrap();

    for i in 0..5 {
        hub.put(ContextType::OCtx, &format!("k{i}"), json!(i), None, vec![], HashMap::new())
            .await
            .unwrap();
    }

    let hits = hub.search(ContextType::OCtx, vec![], 3).await.unwrap();
    assert_eq!(hits.len(), 3);
}

#[tokio::test]
async fn clear_context_removes_every_entry() {
    let dir = tempfile::tempdir().unwrap();
    let hub = hub_in(dir.path());
    hub.initialize().await.unwrap();

    hub.put(ContextType::UCtx, "pref", json!("dark"), None, vec![], HashMap::new()).await.unwrap();
    hub.clear_context(ContextType::UCtx).await.unwrap();
    assert_eq!(hub.get(ContextType::UCtx, "pref").await.unwrap(), None);
    let stats = hub.get_context_stats(ContextType::UCtx).await.unwrap();
    assert_eq!(stats.entry_count, 0);
}

#[tokio::test]
async fn persistence_roundtrips_across_hub_instances() {
    let dir = tempfile::tempdir().unwrap();
    {
        let hub = hub_in(dir.path());
        hub.initialize().await.unwrap();
        hub.put(ContextType::SCtx, "requirements:latest", json!({"goal": "x"}), None, vec![], HashMap::new())
            .await
            .unwrap();
        hub.shutdown().await.unwrap();
    }

    let reloaded = hub_in(dir.path());
    reloaded.initialize().await.unwrap();
    let value = reloaded.get(ContextType::SCtx, "requirements:latest").await.unwrap();
    assert_eq!(value, Some(json!({"goal": "x"})));
}
