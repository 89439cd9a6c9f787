use serde::{Deserialize, Serialize};

/// Author attribution for one or more line ranges of a file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlameInfo {
    #[serde(default)]
    pub author: String,
    /// Sha of the commit that last touched the ranges.
    #[serde(default)]
    pub id: String,
    /// Commit time, seconds since the epoch.
    #[serde(default)]
    pub time: i64,
    #[serde(default)]
    pub commit_msg: String,
    #[serde(default)]
    pub ranges: Vec<BlameRange>,
}

/// Inclusive 1-based line range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlameRange {
    pub start: u32,
    pub end: u32,
}

impl BlameInfo {
    pub fn covers(&self, line: u32) -> bool {
        self.ranges.iter().any(|r| r.start <= line && line <= r.end)
    }
}

/// Blame for both panes; empty until explicitly requested.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlamePair {
    pub left: Vec<BlameInfo>,
    pub right: Vec<BlameInfo>,
}

impl BlamePair {
    pub fn new(left: Vec<BlameInfo>, right: Vec<BlameInfo>) -> Self {
        Self { left, right }
    }

    /// Either side is still missing and worth (re)fetching.
    pub fn is_incomplete(&self) -> bool {
        self.left.is_empty() || self.right.is_empty()
    }

    pub fn for_line(&self, left: bool, line: u32) -> Option<&BlameInfo> {
        let side = if left { &self.left } else { &self.right };
        side.iter().find(|b| b.covers(line))
    }
}
