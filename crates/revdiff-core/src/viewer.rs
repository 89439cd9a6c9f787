//! One open file diff view.
//!
//! The viewer owns the pipelines of its session, the latest snapshot and
//! the view state that survives re-creation. Results reach the
//! presentation layer as [`DiffEvent`]s; nothing is delivered after
//! [`FileDiffViewer::detach`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use revdiff_cache::{CacheGateway, DiskCache};
use revdiff_model::{Account, DiffSession};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::actions::{CommentIntent, DraftAction};
use crate::api::ReviewApi;
use crate::config::DiffConfig;
use crate::error::{DiffError, Result};
use crate::events::{DiffEvent, PipelineKind};
use crate::mode::DiffMode;
use crate::orchestrator::FetchOrchestrator;
use crate::pipeline::PipelineRegistry;
use crate::session::SessionContext;
use crate::snapshot::{ContentHandle, FileDiffSnapshot};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// State restored when a view is re-created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub mode: DiffMode,
    pub scroll_position: Option<u32>,
    pub skip_lines_history: Option<String>,
    pub show_blame_left: bool,
    pub show_blame_right: bool,
}

impl ViewState {
    pub fn new(mode: DiffMode) -> Self {
        Self {
            mode,
            scroll_position: None,
            skip_lines_history: None,
            show_blame_left: false,
            show_blame_right: false,
        }
    }
}

struct ViewerInner {
    orchestrator: FetchOrchestrator,
    cache: Arc<dyn CacheGateway>,
    registry: PipelineRegistry,
    instance: Uuid,
    /// `None` once detached.
    events: Mutex<Option<mpsc::Sender<DiffEvent>>>,
    snapshot: RwLock<Option<Arc<FileDiffSnapshot>>>,
    view: Mutex<ViewState>,
}

#[derive(Clone)]
pub struct FileDiffViewer {
    inner: Arc<ViewerInner>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl FileDiffViewer {
    /// Open a viewer for `session`.
    ///
    /// Fails with [`DiffError::SessionDataMissing`] when the change record is
    /// not cached or does not contain the session revision.
    pub async fn open(
        api: Arc<dyn ReviewApi>,
        cache: Arc<dyn CacheGateway>,
        account: Account,
        session: DiffSession,
        config: DiffConfig,
        state: ViewState,
    ) -> Result<(Self, mpsc::Receiver<DiffEvent>)> {
        let ctx = match SessionContext::load(cache.as_ref(), account, session).await {
            Ok(ctx) => Arc::new(ctx),
            Err(e) => {
                error!(error = %e, "Cannot open file diff");
                return Err(e);
            }
        };
        let instance = ctx.instance;
        let orchestrator = FetchOrchestrator::new(api, cache.clone(), ctx, config);
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let viewer = Self {
            inner: Arc::new(ViewerInner {
                orchestrator,
                cache,
                registry: PipelineRegistry::new(),
                instance,
                events: Mutex::new(Some(tx)),
                snapshot: RwLock::new(None),
                view: Mutex::new(state),
            }),
        };
        info!(instance = %instance, file = %viewer.session().file, "File diff viewer opened");
        Ok((viewer, rx))
    }

    /// Open a viewer on the disk cache of `session`'s change below
    /// `config.cache_dir`.
    pub async fn open_on_disk(
        api: Arc<dyn ReviewApi>,
        account: Account,
        session: DiffSession,
        config: DiffConfig,
        state: ViewState,
    ) -> Result<(Self, mpsc::Receiver<DiffEvent>)> {
        let cache = DiskCache::open(&config.cache_dir, &account.id, &session.change_id).await?;
        Self::open(api, Arc::new(cache), account, session, config, state).await
    }

    pub fn instance(&self) -> Uuid {
        self.inner.instance
    }

    pub fn session(&self) -> &DiffSession {
        &self.inner.orchestrator.context().session
    }

    fn key(&self, kind: PipelineKind) -> String {
        kind.key(self.inner.instance)
    }

    fn emit(&self, event: DiffEvent) {
        let events = lock(&self.inner.events);
        let Some(tx) = events.as_ref() else {
            return;
        };
        match tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                warn!(instance = %self.inner.instance, event = ?event, "Event channel full, dropping event");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(instance = %self.inner.instance, "Event receiver gone");
            }
        }
    }

    fn start<F>(&self, kind: PipelineKind, task: F) -> Option<JoinHandle<()>>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        self.inner.registry.start(&self.key(kind), task)
    }

    pub fn is_running(&self, kind: PipelineKind) -> bool {
        self.inner.registry.is_running(&self.key(kind))
    }

    fn fail(&self, kind: PipelineKind, error: DiffError) {
        error!(instance = %self.inner.instance, pipeline = %kind, error = %error, "Pipeline failed");
        self.emit(DiffEvent::Failed {
            kind,
            error: Arc::new(error),
        });
    }

    fn publish(&self, snapshot: FileDiffSnapshot) {
        let snapshot = Arc::new(snapshot);
        *self
            .inner
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(snapshot.clone());
        self.emit(DiffEvent::Snapshot(snapshot));
    }

    /// Start (or restart) the initial load.
    pub fn attach(&self) -> Option<JoinHandle<()>> {
        let this = self.clone();
        self.start(PipelineKind::Diff, async move { this.run_load().await })
    }

    async fn run_load(self) {
        self.emit(DiffEvent::Started(PipelineKind::Diff));
        let requested = self.mode();

        let (snapshot, resolution) = match self.inner.orchestrator.load(requested).await {
            Ok(loaded) => loaded,
            Err(e) => {
                self.fail(PipelineKind::Diff, e);
                return;
            }
        };

        let (show_left, show_right) = {
            let mut view = lock(&self.inner.view);
            view.mode = resolution.resolved;
            (view.show_blame_left, view.show_blame_right)
        };
        self.emit(DiffEvent::DiffComplete {
            binary: snapshot.is_binary(),
            has_image_preview: snapshot.has_image_preview,
        });
        self.publish(snapshot);

        if self.inner.orchestrator.context().is_authenticated() {
            let this = self.clone();
            self.start(PipelineKind::Reviewed, async move {
                if let Err(e) = this.inner.orchestrator.mark_reviewed().await {
                    warn!(error = %e, "Failed to mark file as reviewed");
                }
            });
        }
        if show_left || show_right {
            self.request_blames();
        }
    }

    /// Toggle blame display for one side, fetching blames if needed.
    pub fn show_blame(&self, is_left: bool, show: bool) -> Option<JoinHandle<()>> {
        {
            let mut view = lock(&self.inner.view);
            if is_left {
                view.show_blame_left = show;
            } else {
                view.show_blame_right = show;
            }
        }
        self.request_blames()
    }

    /// Fetch blames unless both sides are already known; republish the
    /// current snapshot otherwise.
    pub fn request_blames(&self) -> Option<JoinHandle<()>> {
        let snapshot = self.snapshot()?;
        if !snapshot.blames.is_incomplete() {
            self.emit(DiffEvent::Snapshot(snapshot));
            return None;
        }
        let this = self.clone();
        self.start(PipelineKind::Blames, async move { this.run_blames().await })
    }

    async fn run_blames(self) {
        self.emit(DiffEvent::Started(PipelineKind::Blames));
        self.emit(DiffEvent::BlameProgress(true));

        match self.inner.orchestrator.fetch_blames().await {
            Ok(blames) => {
                if let Some(current) = self.snapshot() {
                    let mut snapshot = (*current).clone();
                    snapshot.blames = blames;
                    self.publish(snapshot);
                }
            }
            Err(e) => self.fail(PipelineKind::Blames, e),
        }
        self.emit(DiffEvent::BlameProgress(false));
    }

    /// Run the draft action an interaction stands for.
    pub fn dispatch(&self, intent: CommentIntent) -> Option<JoinHandle<()>> {
        let action = intent.into_action(self.session());
        self.perform(action)
    }

    /// Run a draft action, replacing any action still in flight.
    pub fn perform(&self, action: DraftAction) -> Option<JoinHandle<()>> {
        let this = self.clone();
        self.start(PipelineKind::Action, async move {
            this.run_action(action).await
        })
    }

    async fn run_action(self, action: DraftAction) {
        self.emit(DiffEvent::Started(PipelineKind::Action));

        let outcome = match self.inner.orchestrator.perform(&action).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.fail(PipelineKind::Action, e);
                return;
            }
        };

        let revision = outcome.revision.to_string();
        let draft_id = outcome.draft_id;
        self.emit(match action {
            DraftAction::Create { .. } => DiffEvent::DraftCreated { revision, draft_id },
            DraftAction::Update { .. } => DiffEvent::DraftUpdated { revision, draft_id },
            DraftAction::Delete { .. } => DiffEvent::DraftDeleted { revision, draft_id },
        });

        // The action pipeline itself is released, not restarted, when this returns.
        self.inner.orchestrator.invalidate_drafts().await;
        self.reload_drafts();
    }

    /// Restart the drafts pipeline.
    pub fn reload_drafts(&self) -> Option<JoinHandle<()>> {
        let this = self.clone();
        self.start(PipelineKind::Drafts, async move { this.run_drafts().await })
    }

    async fn run_drafts(self) {
        self.emit(DiffEvent::Started(PipelineKind::Drafts));
        match self.inner.orchestrator.reload_drafts().await {
            Ok(drafts) => match self.snapshot() {
                Some(current) => {
                    let mut snapshot = (*current).clone();
                    snapshot.drafts = drafts;
                    self.publish(snapshot);
                }
                None => debug!(instance = %self.inner.instance, "Drafts reloaded before first snapshot"),
            },
            Err(e) => self.fail(PipelineKind::Drafts, e),
        }
    }

    pub fn snapshot(&self) -> Option<Arc<FileDiffSnapshot>> {
        self.inner
            .snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub async fn read_content(&self, handle: &ContentHandle) -> Result<Vec<u8>> {
        handle.read(self.inner.cache.as_ref()).await
    }

    pub fn view_state(&self) -> ViewState {
        lock(&self.inner.view).clone()
    }

    pub fn mode(&self) -> DiffMode {
        lock(&self.inner.view).mode
    }

    pub fn scroll_position(&self) -> Option<u32> {
        lock(&self.inner.view).scroll_position
    }

    pub fn set_scroll_position(&self, position: Option<u32>) {
        lock(&self.inner.view).scroll_position = position;
    }

    pub fn skip_lines_history(&self) -> Option<String> {
        lock(&self.inner.view).skip_lines_history.clone()
    }

    pub fn set_skip_lines_history(&self, history: Option<String>) {
        lock(&self.inner.view).skip_lines_history = history;
    }

    /// Tear the view down: cancel every pipeline and stop delivering events.
    pub fn detach(&self) {
        lock(&self.inner.events).take();
        self.inner.registry.shutdown();
        info!(instance = %self.inner.instance, "File diff viewer detached");
    }
}
