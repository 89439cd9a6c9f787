/// Pseudo-file that carries the commit message of a revision
pub const COMMIT_MESSAGE: &str = "/COMMIT_MSG";

/// Revision reference addressing the base side when no explicit base patch set is selected
pub const PARENT_REVISION_REF: &str = "0";

/// Number of hex characters kept from the BLAKE3 digest of a file path
pub const FILE_HASH_LEN: usize = 16;

/// Canned reply used by the "done" comment shortcut
pub const DRAFT_REPLY_DONE: &str = "Done";

/// Canned reply used by the "acknowledged" comment shortcut
pub const DRAFT_REPLY_ACK: &str = "Ack";

/// First server release that exposes robot comments (major, minor)
pub const ROBOT_COMMENTS_MIN_VERSION: (u32, u32) = (2, 14);

/// File extensions that can be rendered as an image preview
pub const IMAGE_PREVIEW_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];
