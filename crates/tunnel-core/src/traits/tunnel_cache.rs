// # Tunnel Cache Trait
//
// Defines the optional key-value capability mapping a device identity to
// its tunnel ID.
//
// ## Purpose
//
// The cache lets the resolver skip the lookup-by-name call. It is never
// the source of truth: a miss (or a faulty cache) falls through to the
// control plane. Entries are written once after a tunnel is created and
// never expire.
//
// ## Implementations
//
// - Memory: `cache::MemoryTunnelCache`
// - File: `cache::FileTunnelCache` (JSON file)

use async_trait::async_trait;

/// A cached tunnel mapping
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CacheEntry {
    /// Tunnel ID
    pub tunnel_id: String,
    /// When the mapping was recorded
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl CacheEntry {
    /// Create an entry stamped with the current time
    pub(crate) fn new(tunnel_id: impl Into<String>) -> Self {
        Self {
            tunnel_id: tunnel_id.into(),
            created_at: chrono::Utc::now(),
        }
    }
}

/// Trait for tunnel cache implementations
///
/// Single-key get and put are the only operations; implementations must be
/// safe to call concurrently. Two requests for the same device that both
/// miss may both create a tunnel; the cache does not prevent that.
#[async_trait]
pub trait TunnelCache: Send + Sync {
    /// Look up the tunnel ID cached for `key`
    ///
    /// # Returns
    ///
    /// - `Ok(Some(id))`: cached
    /// - `Ok(None)`: not cached
    /// - `Err(Error)`: storage error
    async fn get(&self, key: &str) -> Result<Option<String>, crate::Error>;

    /// Record `tunnel_id` for `key`
    async fn put(&self, key: &str, tunnel_id: &str) -> Result<(), crate::Error>;

    /// Cache type name (for logging)
    fn cache_name(&self) -> &'static str;
}
