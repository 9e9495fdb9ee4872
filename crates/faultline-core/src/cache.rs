//! Cache client abstraction
//!
//! Repositories use this to serve unpaged scoped queries from cache; the
//! in-memory implementation is an explicit state object constructed at wiring
//! time, so tests get a fresh cache per instance. A shared-store
//! implementation (e.g. Redis) can stand in behind the same trait.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait CacheClient: Send + Sync {
    async fn get(&self, key: &str) -> Option<Value>;

    async fn set(&self, key: &str, value: Value);

    async fn remove(&self, key: &str);

    /// Remove every entry whose key starts with `prefix`, returning the
    /// number of entries dropped.
    async fn remove_by_prefix(&self, prefix: &str) -> usize;
}

pub struct InMemoryCache {
    entries: Mutex<HashMap<String, Value>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheClient for InMemoryCache {
    async fn get(&self, key: &str) -> Option<Value> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    async fn set(&self, key: &str, value: Value) {
        self.entries.lock().unwrap().insert(key.to_string(), value);
    }

    async fn remove(&self, key: &str) {
        self.entries.lock().unwrap().remove(key);
    }

    async fn remove_by_prefix(&self, prefix: &str) -> usize {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        before - entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_get_remove() {
        let cache = InMemoryCache::new();
        assert!(cache.get("a").await.is_none());

        cache.set("a", json!([1, 2, 3])).await;
        assert_eq!(cache.get("a").await, Some(json!([1, 2, 3])));

        cache.remove("a").await;
        assert!(cache.get("a").await.is_none());
    }

    #[tokio::test]
    async fn test_remove_by_prefix() {
        let cache = InMemoryCache::new();
        cache.set("stacks:p1", json!(1)).await;
        cache.set("stacks:p2", json!(2)).await;
        cache.set("events:p1", json!(3)).await;

        let removed = cache.remove_by_prefix("stacks:").await;
        assert_eq!(removed, 2);
        assert!(cache.get("stacks:p1").await.is_none());
        assert!(cache.get("events:p1").await.is_some());
    }
}
