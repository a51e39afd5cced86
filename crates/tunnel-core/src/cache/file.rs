// # File Tunnel Cache
//
// File-based implementation of TunnelCache with crash recovery.
//
// ## Crash Recovery
//
// - Atomic writes: Uses write-then-rename for atomicity
// - Corruption detection: Validates JSON on load
// - Automatic backup: Keeps .backup of last known good state
// - Recovery: Falls back to backup if corruption detected
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "tunnels": {
//     "aabbccddeeff": {
//       "tunnel_id": "c1744f8b-faa1-48a4-9e5c-02ac921467fa",
//       "created_at": "2025-01-09T12:00:00Z"
//     }
//   }
// }
// ```

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::tunnel_cache::{CacheEntry, TunnelCache};

/// Cache file format version
const CACHE_FILE_VERSION: &str = "1.0";

/// File-based tunnel cache with crash recovery
///
/// Every `put` is written through to disk before returning.
#[derive(Debug)]
pub struct FileTunnelCache {
    path: PathBuf,
    tunnels: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

/// Serializable cache file format
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct CacheFileFormat {
    version: String,
    tunnels: HashMap<String, CacheEntry>,
}

impl FileTunnelCache {
    /// Create or load a file cache
    ///
    /// This will:
    /// 1. Create parent directories if needed
    /// 2. Try to load the existing cache file
    /// 3. If it is corrupted, try the backup
    /// 4. If both fail, start empty
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::config(format!(
                    "Failed to create cache directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let tunnels = Self::load_with_recovery(&path).await?;

        Ok(Self {
            path,
            tunnels: Arc::new(RwLock::new(tunnels)),
        })
    }

    /// Load the cache file, falling back to the backup on corruption
    async fn load_with_recovery(path: &Path) -> Result<HashMap<String, CacheEntry>, Error> {
        match Self::load(path).await {
            Ok(tunnels) => {
                tracing::debug!("Loaded tunnel cache: {} entries", tunnels.len());
                Ok(tunnels)
            }
            Err(Error::Json(e)) => {
                tracing::warn!(
                    "Cache file appears corrupted: {}. Attempting recovery from backup.",
                    e
                );

                let backup_path = Self::backup_path(path);
                if !backup_path.exists() {
                    tracing::warn!("No backup file found. Starting with empty cache.");
                    return Ok(HashMap::new());
                }

                match Self::load(&backup_path).await {
                    Ok(tunnels) => {
                        tracing::info!("Recovered cache from backup: {} entries", tunnels.len());
                        if let Err(restore_err) = fs::copy(&backup_path, path).await {
                            tracing::error!(
                                "Failed to restore cache file from backup: {}",
                                restore_err
                            );
                        }
                        Ok(tunnels)
                    }
                    Err(backup_err) => {
                        tracing::error!(
                            "Backup also corrupted: {}. Starting with empty cache.",
                            backup_err
                        );
                        Ok(HashMap::new())
                    }
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Load a cache file; a missing file is an empty cache
    async fn load(path: &Path) -> Result<HashMap<String, CacheEntry>, Error> {
        if !path.exists() {
            tracing::debug!("Cache file does not exist: {}", path.display());
            return Ok(HashMap::new());
        }

        let content = fs::read_to_string(path).await.map_err(|e| {
            Error::cache(format!(
                "Failed to read cache file {}: {}",
                path.display(),
                e
            ))
        })?;

        let file: CacheFileFormat = serde_json::from_str(&content)?;

        if file.version != CACHE_FILE_VERSION {
            tracing::warn!(
                "Cache file version mismatch: expected {}, got {}. Attempting to load anyway.",
                CACHE_FILE_VERSION,
                file.version
            );
        }

        Ok(file.tunnels)
    }

    /// Write the cache atomically
    async fn write(&self, tunnels: &HashMap<String, CacheEntry>) -> Result<(), Error> {
        let file = CacheFileFormat {
            version: CACHE_FILE_VERSION.to_string(),
            tunnels: tunnels.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;

        let temp_path = self.temp_path();
        {
            let mut out = fs::File::create(&temp_path).await.map_err(|e| {
                Error::cache(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
            out.write_all(json.as_bytes()).await.map_err(|e| {
                Error::cache(format!(
                    "Failed to write temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
            out.flush().await.map_err(|e| {
                Error::cache(format!(
                    "Failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        if self.path.exists() {
            let backup_path = Self::backup_path(&self.path);
            if let Err(e) = fs::copy(&self.path, &backup_path).await {
                tracing::warn!("Failed to create cache backup: {}", e);
            }
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::cache(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::trace!("Tunnel cache written: {}", self.path.display());
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }
}

#[async_trait]
impl TunnelCache for FileTunnelCache {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        let guard = self.tunnels.read().await;
        Ok(guard.get(key).map(|entry| entry.tunnel_id.clone()))
    }

    async fn put(&self, key: &str, tunnel_id: &str) -> Result<(), Error> {
        // Held across the write so concurrent puts serialize on disk
        let mut guard = self.tunnels.write().await;
        guard.insert(key.to_string(), CacheEntry::new(tunnel_id));
        self.write(&guard).await
    }

    fn cache_name(&self) -> &'static str {
        "file"
    }
}
