//! Cache key layout.
//!
//! | Entry                     | Key                                        |
//! |---------------------------|--------------------------------------------|
//! | session change record     | `change.json`                              |
//! | published comments        | `<rev>_comments.json`                      |
//! | drafts                    | `<rev>_drafts.json`                        |
//! | diff body                 | `<base-or-0>_<rev>_<fileHash>_diff.json`   |
//! | blame                     | `<base-or-0>_<rev>_<fileHash>_<pane>_blame.json` |
//! | materialized content      | `<base-or-0>_<rev>_<fileHash>_<pane>_content`    |
//! | resolved parent change    | `<commitSha>_parent.json`                  |
//!
//! Comment and draft entries hold the whole per-path map of a revision and
//! are therefore shared by every file of the change. Per-file entries carry
//! the full base/revision pairing; `<pane>` is `a` for the left pane and `b`
//! for the right.

use std::fmt;

use revdiff_model::{FileHash, Side};

pub const CHANGE_JSON: &str = "change.json";
pub const COMMENTS_JSON: &str = "comments.json";
pub const DRAFTS_JSON: &str = "drafts.json";
pub const DIFF_JSON: &str = "diff.json";
pub const BLAME_JSON: &str = "blame.json";
pub const CONTENT: &str = "content";
pub const PARENT_JSON: &str = "parent.json";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn change() -> Self {
        Self::new(CHANGE_JSON)
    }

    pub fn comments(revision_ref: &str) -> Self {
        Self(format!("{revision_ref}_{COMMENTS_JSON}"))
    }

    pub fn drafts(revision_ref: &str) -> Self {
        Self(format!("{revision_ref}_{DRAFTS_JSON}"))
    }

    pub fn diff(base_ref: &str, revision_ref: &str, file_hash: &FileHash) -> Self {
        Self(format!("{base_ref}_{revision_ref}_{file_hash}_{DIFF_JSON}"))
    }

    pub fn blame(base_ref: &str, revision_ref: &str, file_hash: &FileHash, pane: Side) -> Self {
        let pane = pane_tag(pane);
        Self(format!("{base_ref}_{revision_ref}_{file_hash}_{pane}_{BLAME_JSON}"))
    }

    pub fn content(base_ref: &str, revision_ref: &str, file_hash: &FileHash, pane: Side) -> Self {
        let pane = pane_tag(pane);
        Self(format!("{base_ref}_{revision_ref}_{file_hash}_{pane}_{CONTENT}"))
    }

    pub fn parent_change(commit: &str) -> Self {
        Self(format!("{commit}_{PARENT_JSON}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn pane_tag(pane: Side) -> &'static str {
    match pane {
        Side::Parent => "a",
        Side::Revision => "b",
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
