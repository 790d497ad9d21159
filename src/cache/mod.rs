//! Short-TTL cache for rendered storefront views.
//!
//! Currently backs the per-customer order listing; entries are written on
//! first-page reads and invalidated whenever an order is deleted so stale
//! listings are never served past the TTL.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Cache operation failed: {0}")]
    OperationFailed(String),
}

#[async_trait::async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError>;
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

/// Cache key for a customer's first page of orders.
pub fn order_view_key(customer_id: &str) -> String {
    format!("orders:view:{}", customer_id)
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn new(value: String, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: ttl.map(|d| Instant::now() + d),
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at.map_or(false, |at| Instant::now() > at)
    }
}

/// Process-local cache backend. Sufficient for a single-instance deployment;
/// the trait seam leaves room for a shared backend later.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCache {
    store: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl CacheBackend for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let expired = {
            let store = self
                .store
                .read()
                .map_err(|e| CacheError::OperationFailed(e.to_string()))?;
            match store.get(key) {
                Some(entry) if entry.is_expired() => true,
                Some(entry) => return Ok(Some(entry.value.clone())),
                None => return Ok(None),
            }
        };

        if expired {
            let mut store = self
                .store
                .write()
                .map_err(|e| CacheError::OperationFailed(e.to_string()))?;
            store.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        let mut store = self
            .store
            .write()
            .map_err(|e| CacheError::OperationFailed(e.to_string()))?;
        store.insert(key.to_string(), CacheEntry::new(value.to_string(), ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut store = self
            .store
            .write()
            .map_err(|e| CacheError::OperationFailed(e.to_string()))?;
        store.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_delete_round_trip() {
        let cache = InMemoryCache::new();
        cache.set("k", "v", None).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some("v".to_string()));

        cache.delete("k").await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_entries_read_as_miss() {
        let cache = InMemoryCache::new();
        cache
            .set("k", "v", Some(Duration::from_millis(1)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[test]
    fn order_view_key_is_per_customer() {
        assert_ne!(order_view_key("a"), order_view_key("b"));
    }
}
