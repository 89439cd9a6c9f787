//! Change record as cached by the host application for the open change.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A review changeset with the revisions the session may address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeInfo {
    /// Triplet id (`project~branch~Change-Id`).
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub branch: String,
    #[serde(default)]
    pub subject: String,
    /// Numeric change id used in REST paths.
    #[serde(rename = "_number")]
    pub legacy_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_revision: Option<String>,
    /// Revisions keyed by commit sha. `None` when the change was fetched
    /// without revision data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revisions: Option<HashMap<String, RevisionInfo>>,
}

impl ChangeInfo {
    pub fn revision(&self, revision_id: &str) -> Option<&RevisionInfo> {
        self.revisions.as_ref()?.get(revision_id)
    }
}

/// One patch set of a change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionInfo {
    /// Patch set number.
    #[serde(rename = "_number")]
    pub number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<CommitInfo>,
    #[serde(default)]
    pub files: HashMap<String, FileInfo>,
}

impl RevisionInfo {
    /// Sha of the first parent of this revision's commit.
    pub fn first_parent(&self) -> Option<&str> {
        self.commit
            .as_ref()?
            .parents
            .first()?
            .commit
            .as_deref()
    }

    pub fn file(&self, path: &str) -> Option<&FileInfo> {
        self.files.get(path)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    #[serde(default)]
    pub parents: Vec<CommitInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

/// Per-file summary inside a revision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    /// Absent on the wire for modified files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<FileStatus>,
    #[serde(default)]
    pub binary: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lines_inserted: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lines_deleted: Option<u32>,
}

impl FileInfo {
    pub fn status(&self) -> FileStatus {
        self.status.unwrap_or(FileStatus::Modified)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileStatus {
    #[serde(rename = "A")]
    Added,
    #[serde(rename = "D")]
    Deleted,
    #[serde(rename = "R")]
    Renamed,
    #[serde(rename = "C")]
    Copied,
    #[serde(rename = "W")]
    Rewritten,
    #[serde(rename = "M")]
    Modified,
}

impl FileStatus {
    /// Whether a base-side version of the file exists.
    pub fn has_left_side(self) -> bool {
        self != FileStatus::Added
    }

    /// Whether a revision-side version of the file exists.
    pub fn has_right_side(self) -> bool {
        self != FileStatus::Deleted
    }
}
