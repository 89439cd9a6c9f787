//! Filesystem-backed cache.
//!
//! One directory per account and change:
//! `<root>/<account-scope>/<change-scope>/<key>`, where both scopes are
//! BLAKE3 digests so account ids and change ids never appear in paths.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use directories::ProjectDirs;
use tokio::fs;
use tracing::{debug, info};

use crate::error::{CacheError, Result};
use crate::gateway::CacheGateway;
use crate::keys::CacheKey;

const SCOPE_LEN: usize = 16;

#[derive(Debug, Clone)]
pub struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    /// Open (or create) the cache directory of `change_id` for `account_id`
    /// below `root`.
    pub async fn open(root: &Path, account_id: &str, change_id: &str) -> Result<Self> {
        let dir = root.join(scope(account_id)).join(scope(change_id));
        fs::create_dir_all(&dir).await?;

        info!(path = %dir.display(), "Diff cache opened");

        Ok(Self { dir })
    }

    /// Platform cache directory:
    /// - Linux:   `~/.cache/revdiff`
    /// - macOS:   `~/Library/Caches/com.revdiff.revdiff`
    /// - Windows: `{FOLDERID_LocalAppData}\revdiff\revdiff\cache`
    pub fn default_root() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("com", "revdiff", "revdiff").ok_or(CacheError::NoCacheDir)?;
        Ok(dirs.cache_dir().to_path_buf())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of an entry, validated to stay inside the cache directory.
    pub fn path_of(&self, key: &CacheKey) -> Result<PathBuf> {
        let raw = key.as_str();
        if raw.is_empty() || raw.starts_with('.') || raw.contains(['/', '\\']) {
            return Err(CacheError::InvalidKey(raw.to_string()));
        }

        let path = self.dir.join(raw);
        let inside = path
            .strip_prefix(&self.dir)
            .map(|rest| rest.components().all(|c| matches!(c, Component::Normal(_))))
            .unwrap_or(false);
        if !inside {
            return Err(CacheError::InvalidKey(raw.to_string()));
        }
        Ok(path)
    }
}

#[async_trait]
impl CacheGateway for DiskCache {
    async fn exists(&self, key: &CacheKey) -> bool {
        match self.path_of(key) {
            Ok(path) => fs::try_exists(&path).await.unwrap_or(false),
            Err(_) => false,
        }
    }

    async fn read(&self, key: &CacheKey) -> Result<Vec<u8>> {
        let path = self.path_of(key)?;
        match fs::read(&path).await {
            Ok(data) => {
                debug!(key = %key, size = data.len(), "Cache read");
                Ok(data)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(CacheError::NotFound(key.to_string()))
            }
            Err(e) => Err(CacheError::Io(e)),
        }
    }

    async fn write(&self, key: &CacheKey, data: &[u8]) -> Result<()> {
        let path = self.path_of(key)?;
        fs::write(&path, data).await?;
        debug!(key = %key, size = data.len(), "Cache write");
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> Result<bool> {
        let path = self.path_of(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(key = %key, "Cache entry removed");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CacheError::Io(e)),
        }
    }
}

fn scope(id: &str) -> String {
    blake3::hash(id.as_bytes()).to_hex().as_str()[..SCOPE_LEN].to_string()
}
