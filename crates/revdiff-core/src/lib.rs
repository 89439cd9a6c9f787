//! # revdiff-core
//!
//! Assembles the view of one file of a review change: the diff body,
//! published and draft comments of both sides, lazily fetched blame and the
//! materialized file content. Every fetch is cache-first; draft mutations
//! invalidate exactly the cached drafts they touch.
//!
//! The review server is reached through [`ReviewApi`], the cache through
//! [`revdiff_cache::CacheGateway`]. [`FileDiffViewer`] drives the whole
//! thing and reports to the presentation layer with [`DiffEvent`]s.

pub mod actions;
pub mod api;
pub mod config;
pub mod content;
pub mod error;
pub mod events;
pub mod mode;
pub mod orchestrator;
pub mod pipeline;
pub mod reconcile;
pub mod session;
pub mod snapshot;
pub mod viewer;

use tracing_subscriber::{fmt, EnvFilter};

pub use actions::{CommentIntent, DraftAction, DraftOutcome, RevisionRef};
pub use api::{ApiError, DiffRequest, Feature, ReviewApi};
pub use config::DiffConfig;
pub use error::{DiffError, Result};
pub use events::{DiffEvent, PipelineKind};
pub use mode::{DiffMode, ModeResolution, TextDiffMode};
pub use orchestrator::FetchOrchestrator;
pub use session::SessionContext;
pub use snapshot::{ContentHandle, FileDiffSnapshot, MaterializedContent};
pub use viewer::{FileDiffViewer, ViewState};

/// Install a fmt subscriber filtered by `RUST_LOG`.
///
/// Does nothing when the host application already installed a subscriber.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("revdiff_core=debug,revdiff_cache=info,warn"));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}
