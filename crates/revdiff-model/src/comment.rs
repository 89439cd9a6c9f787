//! Published, robot and draft comments.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Comments of one revision keyed by file path, as returned by the server.
pub type CommentMap = HashMap<String, Vec<CommentRecord>>;

/// Half of a two-pane diff a comment is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    Parent,
    Revision,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    #[serde(rename = "_account_id", default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// A published, robot or draft comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<Side>,
    /// `None` for file-level comments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(with = "crate::timestamp")]
    pub updated: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<AccountInfo>,
    /// Only meaningful when the server supports unresolved comments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unresolved: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub robot_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub robot_run_id: Option<String>,
    /// Assigned during reconciliation, never on the wire.
    #[serde(skip)]
    pub patch_set: Option<u32>,
}

impl CommentRecord {
    pub fn is_robot(&self) -> bool {
        self.robot_id.is_some()
    }

    pub fn is_parent_side(&self) -> bool {
        self.side == Some(Side::Parent)
    }
}

/// Left/right comment sequences for one file, each sorted by update time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentPair {
    pub left: Vec<CommentRecord>,
    pub right: Vec<CommentRecord>,
}

impl CommentPair {
    pub fn new(left: Vec<CommentRecord>, right: Vec<CommentRecord>) -> Self {
        Self { left, right }
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty() && self.right.is_empty()
    }

    pub fn len(&self) -> usize {
        self.left.len() + self.right.len()
    }

    pub fn find(&self, id: &str) -> Option<&CommentRecord> {
        self.left.iter().chain(&self.right).find(|c| c.id == id)
    }
}

/// Payload for creating or updating a draft.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<Side>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unresolved: Option<bool>,
}

/// Append robot-authored comments to the per-path map of human comments.
///
/// Ordering is settled later by the reconciler's timestamp sort.
pub fn merge_robot_comments(comments: &mut CommentMap, robot_comments: CommentMap) {
    for (path, records) in robot_comments {
        comments.entry(path).or_default().extend(records);
    }
}
