// # Memory Tunnel Cache
//
// In-memory implementation of TunnelCache.
//
// ## Crash Behavior
//
// - All mappings are lost on restart
// - The first request per device after a restart looks the tunnel up by
//   name, which is cheap and correct

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::tunnel_cache::{CacheEntry, TunnelCache};

/// In-memory tunnel cache
///
/// # Example
///
/// ```rust,no_run
/// use tunnel_core::cache::MemoryTunnelCache;
/// use tunnel_core::traits::TunnelCache;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let cache = MemoryTunnelCache::new();
///     cache.put("aabbccddeeff", "tunnel-id").await?;
///     assert_eq!(cache.get("aabbccddeeff").await?, Some("tunnel-id".to_string()));
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryTunnelCache {
    inner: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl MemoryTunnelCache {
    /// Create a new empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of cached mappings
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if the cache is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// Full entry for `key`, including its timestamp
    pub async fn entry(&self, key: &str) -> Option<CacheEntry> {
        self.inner.read().await.get(key).cloned()
    }
}

#[async_trait]
impl TunnelCache for MemoryTunnelCache {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.get(key).map(|entry| entry.tunnel_id.clone()))
    }

    async fn put(&self, key: &str, tunnel_id: &str) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard.insert(key.to_string(), CacheEntry::new(tunnel_id));
        Ok(())
    }

    fn cache_name(&self) -> &'static str {
        "memory"
    }
}
