use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{COMMIT_MESSAGE, FILE_HASH_LEN, PARENT_REVISION_REF};

/// Content-independent hash of a file path, used to namespace per-file
/// cache entries without leaking path characters into cache keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileHash(String);

impl FileHash {
    pub fn of(path: &str) -> Self {
        let digest = blake3::hash(path.as_bytes());
        Self(digest.to_hex().as_str()[..FILE_HASH_LEN].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of one file diff view: which file of which revision, compared
/// against which base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSession {
    /// Numeric change id as used in REST paths.
    pub change_id: String,
    /// Revision sha the file belongs to.
    pub revision_id: String,
    pub file: String,
    /// Base patch set; `None` compares against the parent commit.
    pub base: Option<u32>,
    /// Patch set number of `revision_id`.
    pub revision: u32,
}

impl DiffSession {
    /// `base == 0` selects the parent commit.
    pub fn new(
        change_id: impl Into<String>,
        revision_id: impl Into<String>,
        file: impl Into<String>,
        base: u32,
        revision: u32,
    ) -> Self {
        Self {
            change_id: change_id.into(),
            revision_id: revision_id.into(),
            file: file.into(),
            base: (base != 0).then_some(base),
            revision,
        }
    }

    /// `"0"` for the parent commit, otherwise the base patch set number.
    pub fn base_ref(&self) -> String {
        match self.base {
            Some(base) => base.to_string(),
            None => PARENT_REVISION_REF.to_string(),
        }
    }

    pub fn base_number(&self) -> u32 {
        self.base.unwrap_or(0)
    }

    pub fn revision_ref(&self) -> String {
        self.revision.to_string()
    }

    pub fn file_hash(&self) -> FileHash {
        FileHash::of(&self.file)
    }

    pub fn is_commit_message(&self) -> bool {
        self.file == COMMIT_MESSAGE
    }
}
