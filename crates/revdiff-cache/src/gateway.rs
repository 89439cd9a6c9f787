use async_trait::async_trait;

use crate::error::Result;
use crate::keys::CacheKey;

/// Keyed byte store consulted before every network fetch.
///
/// Callers treat every failure as non-fatal: a failed read is a miss and a
/// failed write is logged and dropped.
#[async_trait]
pub trait CacheGateway: Send + Sync {
    async fn exists(&self, key: &CacheKey) -> bool;

    /// Fails with [`CacheError::NotFound`](crate::CacheError::NotFound) for unknown keys.
    async fn read(&self, key: &CacheKey) -> Result<Vec<u8>>;

    async fn write(&self, key: &CacheKey, data: &[u8]) -> Result<()>;

    /// Returns `false` when there was nothing to remove.
    async fn remove(&self, key: &CacheKey) -> Result<bool>;
}
