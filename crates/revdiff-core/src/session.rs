use revdiff_cache::{CacheGateway, CacheKey};
use revdiff_model::{Account, ChangeInfo, DiffSession, FileHash, FileInfo, FileStatus, RevisionInfo};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DiffError, Result};

/// Everything a viewer knows about its file before any fetch: the session
/// identity, the cached change record and the account it runs as.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub session: DiffSession,
    pub change: ChangeInfo,
    pub account: Account,
    /// Distinguishes pipelines of concurrently open viewers.
    pub instance: Uuid,
    revision: RevisionInfo,
    file_hash: FileHash,
}

impl SessionContext {
    /// Build the context from the change record the host application left in
    /// the cache.
    pub async fn load(
        cache: &dyn CacheGateway,
        account: Account,
        session: DiffSession,
    ) -> Result<Self> {
        let key = CacheKey::change();
        let bytes = cache
            .read(&key)
            .await
            .map_err(|e| DiffError::SessionDataMissing(format!("change record: {e}")))?;
        let change: ChangeInfo = serde_json::from_slice(&bytes)
            .map_err(|e| DiffError::SessionDataMissing(format!("change record: {e}")))?;

        Self::new(change, account, session)
    }

    pub fn new(change: ChangeInfo, account: Account, session: DiffSession) -> Result<Self> {
        if change.revisions.is_none() {
            return Err(DiffError::SessionDataMissing(format!(
                "change {} has no revisions",
                change.legacy_id
            )));
        }
        let revision = change.revision(&session.revision_id).cloned().ok_or_else(|| {
            DiffError::SessionDataMissing(format!(
                "revision {} not in change {}",
                session.revision_id, change.legacy_id
            ))
        })?;

        let file_hash = session.file_hash();
        let instance = Uuid::new_v4();
        debug!(
            change = change.legacy_id,
            revision = revision.number,
            file = %session.file,
            instance = %instance,
            "Diff session ready"
        );

        Ok(Self {
            session,
            change,
            account,
            instance,
            revision,
            file_hash,
        })
    }

    /// Change id used in REST paths.
    pub fn change_number(&self) -> String {
        self.change.legacy_id.to_string()
    }

    pub fn revision_info(&self) -> &RevisionInfo {
        &self.revision
    }

    pub fn file_hash(&self) -> &FileHash {
        &self.file_hash
    }

    /// File entry of the revision; never present for the commit message.
    pub fn file_info(&self) -> Option<&FileInfo> {
        if self.session.is_commit_message() {
            return None;
        }
        self.revision.file(&self.session.file)
    }

    pub fn is_binary(&self) -> bool {
        self.file_info().map(|f| f.binary).unwrap_or(false)
    }

    /// Status used to decide which content sides exist. A file missing from
    /// the revision is treated as added.
    pub fn content_status(&self) -> FileStatus {
        self.revision
            .file(&self.session.file)
            .map(FileInfo::status)
            .unwrap_or(FileStatus::Added)
    }

    /// Status used by blame, `None` when it is not known.
    pub fn blame_status(&self) -> Option<FileStatus> {
        self.file_info().map(FileInfo::status)
    }

    /// The selected base is the revision itself.
    pub fn is_same_base(&self) -> bool {
        self.session.base == Some(self.revision.number)
    }

    pub fn parent_commit(&self) -> Option<&str> {
        self.revision.first_parent()
    }

    pub fn is_authenticated(&self) -> bool {
        self.account.has_authenticated_access()
    }
}
