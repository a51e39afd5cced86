// # Tunnel Cache Implementations
//
// This module provides implementations of the TunnelCache trait and
// builds the one selected by configuration.

pub mod file;
pub mod memory;

pub use file::FileTunnelCache;
pub use memory::MemoryTunnelCache;

use std::sync::Arc;

use crate::config::{CacheConfig, ConfigKey};
use crate::error::{Error, Result};
use crate::traits::TunnelCache;

/// Build the cache described by `config`
///
/// # Returns
///
/// - `Ok(None)`: caching is disabled
/// - `Ok(Some(cache))`: the configured cache
/// - `Err(Error)`: the cache could not be opened
pub async fn open_cache(config: &CacheConfig) -> Result<Option<Arc<dyn TunnelCache>>> {
    match config {
        CacheConfig::None => Ok(None),
        CacheConfig::Memory => Ok(Some(Arc::new(MemoryTunnelCache::new()))),
        CacheConfig::File { path } => {
            if path.trim().is_empty() {
                return Err(Error::MissingConfig(vec![ConfigKey::CachePath]));
            }
            let cache = FileTunnelCache::new(path).await?;
            Ok(Some(Arc::new(cache)))
        }
    }
}
