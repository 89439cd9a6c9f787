//! Capabilities required from the review server's REST client.
//!
//! Transport, authentication and retries live behind this trait; every call
//! is assumed to either answer or fail once.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use revdiff_model::{BlameInfo, ChangeInfo, CommentInput, CommentMap, CommentRecord, DiffContent};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Server answered {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Parse(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Optional server features probed before issuing feature-specific calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    Blame,
    UnresolvedComments,
}

/// Parameters of a file diff request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffRequest {
    pub change_id: String,
    pub revision_id: String,
    pub file: String,
    /// Base patch set; `None` diffs against the parent commit.
    pub base: Option<u32>,
    /// `false` keeps whitespace changes in the diff.
    pub ignore_whitespace: bool,
    /// Whole-file context instead of hunks.
    pub full_context: bool,
    pub intraline: bool,
}

impl DiffRequest {
    /// Full-context request with intraline highlighting, whitespace preserved.
    pub fn new(change_id: &str, revision_id: &str, file: &str, base: Option<u32>) -> Self {
        Self {
            change_id: change_id.to_string(),
            revision_id: revision_id.to_string(),
            file: file.to_string(),
            base,
            ignore_whitespace: false,
            full_context: true,
            intraline: true,
        }
    }
}

#[async_trait]
pub trait ReviewApi: Send + Sync {
    async fn file_diff(&self, request: &DiffRequest) -> Result<DiffContent, ApiError>;

    async fn comments(&self, change_id: &str, revision: &str) -> Result<CommentMap, ApiError>;

    async fn robot_comments(&self, change_id: &str, revision: &str)
        -> Result<CommentMap, ApiError>;

    async fn drafts(&self, change_id: &str, revision: &str) -> Result<CommentMap, ApiError>;

    async fn create_draft(
        &self,
        change_id: &str,
        revision: &str,
        input: &CommentInput,
    ) -> Result<CommentRecord, ApiError>;

    async fn update_draft(
        &self,
        change_id: &str,
        revision: &str,
        draft_id: &str,
        input: &CommentInput,
    ) -> Result<CommentRecord, ApiError>;

    async fn delete_draft(
        &self,
        change_id: &str,
        revision: &str,
        draft_id: &str,
    ) -> Result<(), ApiError>;

    /// `base` selects the blame of the revision's parent instead of the
    /// revision itself.
    async fn file_blame(
        &self,
        change_id: &str,
        revision: &str,
        file: &str,
        base: bool,
    ) -> Result<Vec<BlameInfo>, ApiError>;

    /// Raw file content, base64 encoded as served by the content endpoint.
    async fn file_content(
        &self,
        change_id: &str,
        revision: &str,
        file: &str,
    ) -> Result<Bytes, ApiError>;

    async fn mark_reviewed(&self, change_id: &str, revision: &str, file: &str)
        -> Result<(), ApiError>;

    /// Changes whose current revision is `commit`.
    async fn changes_by_commit(&self, commit: &str) -> Result<Vec<ChangeInfo>, ApiError>;

    fn supports_feature(&self, feature: Feature) -> bool;
}
