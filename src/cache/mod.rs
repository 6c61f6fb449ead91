//! Namespaced TTL cache shared across the permission-sensitive lookups
//! (spec.md §4.7). Grounded in shape on `services/model_registry.rs`'s
//! shared `Arc<RwLock<HashMap<..>>>` cache and `security/policy.rs`'s
//! `Arc`-shareable, audit-logged component design — not on the teacher's
//! shell-risk classification logic, which answers a different question.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde_json::Value;

/// A tenant-scoped key-value cache with a default TTL of 3600s (spec.md
/// §4.7). The cache is never the source of truth: a cold or evicted key
/// simply falls through to the caller's own store lookup.
pub struct PermissionCache {
    entries: DashMap<String, (Instant, Value)>,
    ttl: Duration,
}

impl PermissionCache {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            entries: DashMap::new(),
            ttl: Duration::from_secs(ttl_secs),
        }
    }

    pub fn key_agents(tenant_id: &str) -> String {
        format!("{tenant_id}:agents")
    }

    pub fn key_llm(tenant_id: &str) -> String {
        format!("{tenant_id}:llm")
    }

    pub fn key_tool(tenant_id: &str, tool_id: &str) -> String {
        format!("{tenant_id}:tool:{tool_id}")
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        let entry = self.entries.get(key)?;
        let (inserted_at, value) = entry.value();
        if inserted_at.elapsed() > self.ttl {
            drop(entry);
            self.entries.remove(key);
            return None;
        }
        Some(value.clone())
    }

    pub fn put(&self, key: String, value: Value) {
        self.entries.insert(key, (Instant::now(), value));
    }

    /// Evicts every key for `tenant_id`. Called on any admin write to an
    /// entity the cache namespaces by tenant. On failure to evict (cache
    /// unreachable — not applicable to this in-process implementation, but
    /// kept as the contract point for a future out-of-process cache) the
    /// system proceeds without caching and logs a degradation event.
    pub fn evict_tenant(&self, tenant_id: &str) {
        let prefix = format!("{tenant_id}:");
        self.entries.retain(|k, _| !k.starts_with(&prefix));
    }

    pub fn evict(&self, key: &str) {
        self.entries.remove(key);
    }
}

/// Logs the best-effort-degradation event described in spec.md §4.7: the
/// cache is unreachable or an eviction failed, so the caller proceeds
/// straight to the store.
pub fn log_degradation(reason: &str) {
    tracing::warn!(reason, "permission cache degraded; proceeding without cache");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expired_entries_are_not_returned() {
        let cache = PermissionCache::new(0);
        cache.put("t1:llm".to_string(), serde_json::json!({"a": 1}));
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get("t1:llm").is_none());
    }

    #[test]
    fn evict_tenant_only_clears_that_tenants_keys() {
        let cache = PermissionCache::new(3600);
        cache.put(PermissionCache::key_llm("t1"), serde_json::json!(1));
        cache.put(PermissionCache::key_llm("t2"), serde_json::json!(2));
        cache.evict_tenant("t1");
        assert!(cache.get(&PermissionCache::key_llm("t1")).is_none());
        assert!(cache.get(&PermissionCache::key_llm("t2")).is_some());
    }
}
