//! # revdiff-model
//!
//! Data model shared by the file-diff aggregation layer: the cached change
//! record, diff bodies, published/draft comments, blame hunks, the account
//! capabilities and the identity of one diff session.
//!
//! Every wire type derives `Serialize` and `Deserialize` using the review
//! server's JSON field names so that payloads can be cached verbatim.

pub mod account;
pub mod blame;
pub mod change;
pub mod comment;
pub mod constants;
pub mod diff;
pub mod error;
pub mod session;
pub mod timestamp;

pub use account::{Account, ServerVersion};
pub use blame::{BlameInfo, BlamePair, BlameRange};
pub use change::{ChangeInfo, CommitInfo, FileInfo, FileStatus, RevisionInfo};
pub use comment::{
    merge_robot_comments, AccountInfo, CommentInput, CommentMap, CommentPair, CommentRecord, Side,
};
pub use diff::{DiffBlock, DiffContent};
pub use error::ModelError;
pub use session::{DiffSession, FileHash};
