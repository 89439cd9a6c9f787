use thiserror::Error;

use revdiff_cache::CacheError;

use crate::api::ApiError;

#[derive(Error, Debug)]
pub enum DiffError {
    /// The cached change record is unusable for this view. Fatal: the view
    /// cannot be shown at all.
    #[error("Session data missing: {0}")]
    SessionDataMissing(String),

    /// A remote call failed; aborts the whole join it belongs to.
    #[error("Review API error: {0}")]
    Api(#[from] ApiError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The pipeline was torn down before it could finish.
    #[error("Pipeline cancelled: {0}")]
    Cancelled(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DiffError>;
