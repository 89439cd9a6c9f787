//! Draft mutations and the comment interactions that produce them.

use std::fmt;

use revdiff_model::constants::{DRAFT_REPLY_ACK, DRAFT_REPLY_DONE, PARENT_REVISION_REF};
use revdiff_model::{CommentInput, DiffSession, Side};
use serde::{Deserialize, Serialize};

/// Patch set a draft is written against; `"0"` addresses the parent side.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RevisionRef(String);

impl RevisionRef {
    pub fn new(revision: impl Into<String>) -> Self {
        Self(revision.into())
    }

    pub fn parent() -> Self {
        Self::new(PARENT_REVISION_REF)
    }

    pub fn is_parent(&self) -> bool {
        self.0 == PARENT_REVISION_REF
    }

    pub fn side(&self) -> Side {
        if self.is_parent() {
            Side::Parent
        } else {
            Side::Revision
        }
    }

    /// Revision the REST call addresses: parent-side drafts live on the
    /// session revision.
    pub fn target<'a>(&'a self, session_revision_id: &'a str) -> &'a str {
        if self.is_parent() {
            session_revision_id
        } else {
            &self.0
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RevisionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftAction {
    Create {
        revision: RevisionRef,
        reply_to: Option<String>,
        line: Option<u32>,
        message: String,
        /// Defaults to "unresolved unless it is a reply".
        unresolved: Option<bool>,
    },
    Update {
        revision: RevisionRef,
        draft_id: String,
        reply_to: Option<String>,
        line: Option<u32>,
        message: String,
        unresolved: bool,
    },
    Delete {
        revision: RevisionRef,
        draft_id: String,
    },
}

impl DraftAction {
    pub fn revision(&self) -> &RevisionRef {
        match self {
            DraftAction::Create { revision, .. }
            | DraftAction::Update { revision, .. }
            | DraftAction::Delete { revision, .. } => revision,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DraftAction::Create { .. } => "create",
            DraftAction::Update { .. } => "update",
            DraftAction::Delete { .. } => "delete",
        }
    }

    /// REST write this action translates to.
    pub fn to_write(&self, file: &str, supports_unresolved: bool) -> DraftWrite<'_> {
        match self {
            DraftAction::Create {
                revision,
                reply_to,
                line,
                message,
                unresolved,
            } => DraftWrite::Create(CommentInput {
                id: None,
                path: file.to_string(),
                side: Some(revision.side()),
                line: *line,
                in_reply_to: reply_to.clone(),
                message: message.clone(),
                unresolved: supports_unresolved
                    .then(|| unresolved.unwrap_or(reply_to.is_none())),
            }),
            DraftAction::Update {
                revision,
                draft_id,
                reply_to,
                line,
                message,
                unresolved,
            } => DraftWrite::Update(
                draft_id,
                CommentInput {
                    id: Some(draft_id.clone()),
                    path: file.to_string(),
                    side: Some(revision.side()),
                    line: *line,
                    in_reply_to: reply_to.clone(),
                    message: message.clone(),
                    unresolved: supports_unresolved.then_some(*unresolved),
                },
            ),
            DraftAction::Delete { draft_id, .. } => DraftWrite::Delete(draft_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftWrite<'a> {
    Create(CommentInput),
    Update(&'a str, CommentInput),
    Delete(&'a str),
}

/// A completed draft mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftOutcome {
    pub revision: RevisionRef,
    pub draft_id: String,
}

/// Comment interactions offered by the rendering layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentIntent {
    NewDraft {
        left: bool,
        line: Option<u32>,
        message: String,
    },
    Reply {
        revision: RevisionRef,
        comment_id: String,
        line: Option<u32>,
        message: String,
    },
    /// Reply that starts with the quoted original message.
    Quote {
        revision: RevisionRef,
        comment_id: String,
        line: Option<u32>,
        quoted: String,
        message: String,
    },
    Done {
        revision: RevisionRef,
        comment_id: String,
        line: Option<u32>,
    },
    Ack {
        revision: RevisionRef,
        comment_id: String,
        line: Option<u32>,
    },
    Edit {
        revision: RevisionRef,
        draft_id: String,
        reply_to: Option<String>,
        line: Option<u32>,
        message: String,
        unresolved: bool,
    },
    ToggleResolved {
        revision: RevisionRef,
        draft_id: String,
        reply_to: Option<String>,
        line: Option<u32>,
        message: String,
        unresolved: bool,
    },
    Delete {
        revision: RevisionRef,
        draft_id: String,
    },
}

impl CommentIntent {
    pub fn into_action(self, session: &DiffSession) -> DraftAction {
        match self {
            CommentIntent::NewDraft {
                left,
                line,
                message,
            } => DraftAction::Create {
                revision: RevisionRef::new(if left {
                    session.base_ref()
                } else {
                    session.revision_ref()
                }),
                reply_to: None,
                line,
                message,
                unresolved: None,
            },
            CommentIntent::Reply {
                revision,
                comment_id,
                line,
                message,
            } => reply(revision, comment_id, line, message),
            CommentIntent::Quote {
                revision,
                comment_id,
                line,
                quoted,
                message,
            } => {
                let mut text = quote_message(&quoted);
                text.push_str(&message);
                reply(revision, comment_id, line, text)
            }
            CommentIntent::Done {
                revision,
                comment_id,
                line,
            } => reply(revision, comment_id, line, DRAFT_REPLY_DONE.to_string()),
            CommentIntent::Ack {
                revision,
                comment_id,
                line,
            } => reply(revision, comment_id, line, DRAFT_REPLY_ACK.to_string()),
            CommentIntent::Edit {
                revision,
                draft_id,
                reply_to,
                line,
                message,
                unresolved,
            }
            | CommentIntent::ToggleResolved {
                revision,
                draft_id,
                reply_to,
                line,
                message,
                unresolved,
            } => DraftAction::Update {
                revision,
                draft_id,
                reply_to,
                line,
                message,
                unresolved,
            },
            CommentIntent::Delete { revision, draft_id } => {
                DraftAction::Delete { revision, draft_id }
            }
        }
    }
}

fn reply(
    revision: RevisionRef,
    comment_id: String,
    line: Option<u32>,
    message: String,
) -> DraftAction {
    DraftAction::Create {
        revision,
        reply_to: Some(comment_id),
        line,
        message,
        unresolved: None,
    }
}

/// Prefix every line of `message` with `> ` and end with a blank line.
pub fn quote_message(message: &str) -> String {
    let mut quoted = String::new();
    for line in message.trim_end().lines() {
        quoted.push_str("> ");
        quoted.push_str(line);
        quoted.push('\n');
    }
    quoted.push('\n');
    quoted
}
