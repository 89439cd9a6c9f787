use thiserror::Error;

/// Errors produced by the cache layer.
#[derive(Error, Debug)]
pub enum CacheError {
    /// No entry stored under the key.
    #[error("Cache entry not found: {0}")]
    NotFound(String),

    /// The key would escape the cache directory or is otherwise unusable.
    #[error("Invalid cache key: {0}")]
    InvalidKey(String),

    /// Failed to determine a platform cache directory.
    #[error("Could not determine cache directory")]
    NoCacheDir,

    /// Generic I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CacheError>;
