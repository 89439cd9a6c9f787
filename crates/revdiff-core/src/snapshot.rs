use revdiff_cache::{CacheGateway, CacheKey};
use revdiff_model::{BlamePair, CommentPair, DiffContent};

use crate::error::Result;
use crate::mode::DiffMode;

/// Materialized file content stored in the diff cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentHandle {
    pub key: CacheKey,
}

impl ContentHandle {
    pub fn new(key: CacheKey) -> Self {
        Self { key }
    }

    pub async fn read(&self, cache: &dyn CacheGateway) -> Result<Vec<u8>> {
        Ok(cache.read(&self.key).await?)
    }
}

/// Left and right content of a view. Either side is absent when it does not
/// exist or could not be produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterializedContent {
    pub left: Option<ContentHandle>,
    pub right: Option<ContentHandle>,
}

/// Everything the rendering layer needs for one file diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiffSnapshot {
    pub diff: DiffContent,
    pub comments: CommentPair,
    pub drafts: CommentPair,
    pub blames: BlamePair,
    pub content: MaterializedContent,
    pub mode: DiffMode,
    pub has_image_preview: bool,
}

impl FileDiffSnapshot {
    pub fn left_content(&self) -> Option<&ContentHandle> {
        self.content.left.as_ref()
    }

    pub fn right_content(&self) -> Option<&ContentHandle> {
        self.content.right.as_ref()
    }

    pub fn is_binary(&self) -> bool {
        self.diff.binary
    }
}
