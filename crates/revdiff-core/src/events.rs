use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use crate::error::DiffError;
use crate::snapshot::FileDiffSnapshot;

/// Independent pipelines of one viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineKind {
    Diff,
    Action,
    Drafts,
    Blames,
    Reviewed,
}

impl PipelineKind {
    /// Registry key of this pipeline for the viewer `instance`.
    pub fn key(self, instance: Uuid) -> String {
        format!("{self}-{instance}")
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineKind::Diff => "file-diff",
            PipelineKind::Action => "file-diff-action",
            PipelineKind::Drafts => "file-drafts",
            PipelineKind::Blames => "file-blames",
            PipelineKind::Reviewed => "file-reviewed",
        };
        f.write_str(name)
    }
}

/// Notifications delivered to the presentation layer.
#[derive(Debug, Clone)]
pub enum DiffEvent {
    Started(PipelineKind),
    /// A new or updated snapshot.
    Snapshot(Arc<FileDiffSnapshot>),
    /// A pipeline failed; the previous snapshot stays valid.
    Failed {
        kind: PipelineKind,
        error: Arc<DiffError>,
    },
    /// The initial load finished.
    DiffComplete {
        binary: bool,
        has_image_preview: bool,
    },
    /// Blame fetch started (`true`) or ended (`false`).
    BlameProgress(bool),
    DraftCreated {
        revision: String,
        draft_id: String,
    },
    DraftUpdated {
        revision: String,
        draft_id: String,
    },
    DraftDeleted {
        revision: String,
        draft_id: String,
    },
}
