//! Concurrent, cache-first assembly of a file diff snapshot.

use std::future::Future;
use std::sync::Arc;

use revdiff_cache::{CacheGateway, CacheKey};
use revdiff_model::{
    merge_robot_comments, BlameInfo, BlamePair, CommentMap, CommentPair, DiffContent, Side,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::actions::{DraftAction, DraftOutcome, DraftWrite};
use crate::api::{ApiError, DiffRequest, Feature, ReviewApi};
use crate::config::DiffConfig;
use crate::content::{has_image_preview, ContentMaterializer};
use crate::error::{DiffError, Result};
use crate::mode::{resolve_mode, DiffMode, ModeResolution};
use crate::reconcile::reconcile_pair;
use crate::session::SessionContext;
use crate::snapshot::{FileDiffSnapshot, MaterializedContent};

/// The two halves of a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pane {
    Base,
    Revision,
}

pub struct FetchOrchestrator {
    api: Arc<dyn ReviewApi>,
    cache: Arc<dyn CacheGateway>,
    ctx: Arc<SessionContext>,
    config: DiffConfig,
    permits: Arc<Semaphore>,
    materializer: ContentMaterializer,
}

impl FetchOrchestrator {
    pub fn new(
        api: Arc<dyn ReviewApi>,
        cache: Arc<dyn CacheGateway>,
        ctx: Arc<SessionContext>,
        config: DiffConfig,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent_fetches.max(1)));
        let materializer =
            ContentMaterializer::new(api.clone(), cache.clone(), ctx.clone(), permits.clone());
        Self {
            api,
            cache,
            ctx,
            config,
            permits,
            materializer,
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn config(&self) -> &DiffConfig {
        &self.config
    }

    /// Run one network request inside the bounded fetch pool.
    async fn call<T, F>(&self, request: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, ApiError>>,
    {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| DiffError::Cancelled("fetch pool closed".into()))?;
        Ok(request.await?)
    }

    /// Serve `key` from the cache, or run `fetch` on a miss. Unreadable or
    /// undecodable entries count as a miss.
    async fn with_cached<T, F>(&self, key: &CacheKey, fetch: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: Future<Output = Result<T>>,
    {
        if self.cache.exists(key).await {
            match self.cache.read(key).await {
                Ok(bytes) => match decode(&bytes) {
                    Ok(value) => {
                        debug!(key = %key, "Cache hit");
                        return Ok(value);
                    }
                    Err(e) => warn!(key = %key, error = %e, "Failed to parse cached data"),
                },
                Err(e) => warn!(key = %key, error = %e, "Failed to load cached data"),
            }
        }
        debug!(key = %key, "Cache miss");
        fetch.await
    }

    /// Best-effort write of a fetched value.
    async fn persist<T: Serialize>(&self, key: &CacheKey, value: &T) {
        let bytes = match encode(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to encode cache entry");
                return;
            }
        };
        if let Err(e) = self.cache.write(key, &bytes).await {
            warn!(key = %key, error = %e, "Failed to save cached data");
        }
    }

    fn pane_ref(&self, pane: Pane) -> String {
        match pane {
            Pane::Base => self.ctx.session.base_ref(),
            Pane::Revision => self.ctx.session.revision_ref(),
        }
    }

    /// Revision addressed by REST calls for `pane`, `None` when the base is
    /// the parent commit.
    fn pane_target(&self, pane: Pane) -> Option<String> {
        match pane {
            Pane::Base => self.ctx.session.base.map(|base| base.to_string()),
            Pane::Revision => Some(self.ctx.session.revision_id.clone()),
        }
    }

    fn diff_key(&self) -> CacheKey {
        let session = &self.ctx.session;
        CacheKey::diff(
            &session.base_ref(),
            &session.revision_ref(),
            self.ctx.file_hash(),
        )
    }

    pub async fn fetch_diff(&self) -> Result<DiffContent> {
        self.with_cached(&self.diff_key(), self.fetch_diff_network())
            .await
    }

    async fn fetch_diff_network(&self) -> Result<DiffContent> {
        let session = &self.ctx.session;
        if self.ctx.is_binary() {
            debug!(file = %session.file, "Binary file, diff body not fetched");
            return Ok(DiffContent::binary());
        }

        // Diffing a commit message against its own patch set yields no
        // right-hand content; ask for the parent diff and move it over.
        let rectify = self.ctx.is_same_base() && session.is_commit_message();
        let base = if rectify { None } else { session.base };
        let request = DiffRequest::new(
            &self.ctx.change_number(),
            &session.revision_id,
            &session.file,
            base,
        );

        let mut diff = self.call(self.api.file_diff(&request)).await?;
        if rectify && !diff.rectify_self_diff() {
            warn!(file = %session.file, "Commit message diff has no content to rectify");
        }
        Ok(diff)
    }

    async fn fetch_comments(&self, pane: Pane) -> Result<CommentMap> {
        let key = CacheKey::comments(&self.pane_ref(pane));
        self.with_cached(&key, async {
            match self.pane_target(pane) {
                Some(revision) if !self.ctx.is_binary() => {
                    self.comments_with_robots(&revision).await
                }
                _ => Ok(CommentMap::new()),
            }
        })
        .await
    }

    async fn comments_with_robots(&self, revision: &str) -> Result<CommentMap> {
        let change = self.ctx.change_number();
        let mut comments = self.call(self.api.comments(&change, revision)).await?;

        if self.ctx.account.server_version >= self.config.robot_comments_min_version {
            let robots = self.call(self.api.robot_comments(&change, revision)).await?;
            merge_robot_comments(&mut comments, robots);
        }
        Ok(comments)
    }

    async fn fetch_drafts(&self, pane: Pane) -> Result<CommentMap> {
        let key = CacheKey::drafts(&self.pane_ref(pane));
        self.with_cached(&key, self.fetch_drafts_network(pane))
            .await
    }

    async fn fetch_drafts_network(&self, pane: Pane) -> Result<CommentMap> {
        if self.ctx.is_binary() || !self.ctx.is_authenticated() {
            return Ok(CommentMap::new());
        }
        match self.pane_target(pane) {
            Some(revision) => {
                self.call(self.api.drafts(&self.ctx.change_number(), &revision))
                    .await
            }
            None => Ok(CommentMap::new()),
        }
    }

    fn reconcile(&self, base_side: &CommentMap, revision_side: &CommentMap) -> CommentPair {
        let session = &self.ctx.session;
        reconcile_pair(
            &session.file,
            base_side,
            revision_side,
            session.base_number(),
            session.revision,
        )
    }

    /// Initial load: diff body, comments and drafts of both panes, then
    /// content and render mode. Blames start empty.
    pub async fn load(&self, requested: DiffMode) -> Result<(FileDiffSnapshot, ModeResolution)> {
        let (diff, comments_base, comments_revision, drafts_base, drafts_revision) = tokio::try_join!(
            self.fetch_diff(),
            self.fetch_comments(Pane::Base),
            self.fetch_comments(Pane::Revision),
            self.fetch_drafts(Pane::Base),
            self.fetch_drafts(Pane::Revision),
        )?;

        let comments = self.reconcile(&comments_base, &comments_revision);
        let drafts = self.reconcile(&drafts_base, &drafts_revision);

        let base_ref = self.pane_ref(Pane::Base);
        let revision_ref = self.pane_ref(Pane::Revision);
        self.persist(&self.diff_key(), &diff).await;
        self.persist(&CacheKey::comments(&base_ref), &comments_base)
            .await;
        self.persist(&CacheKey::comments(&revision_ref), &comments_revision)
            .await;
        self.persist(&CacheKey::drafts(&base_ref), &drafts_base).await;
        self.persist(&CacheKey::drafts(&revision_ref), &drafts_revision)
            .await;

        let file = &self.ctx.session.file;
        let mut content = MaterializedContent::default();
        self.materializer
            .materialize(&diff, requested, &mut content)
            .await;

        let has_image_preview = has_image_preview(file, content.right.as_ref());
        let resolution = resolve_mode(
            requested,
            diff.binary,
            has_image_preview,
            self.config.diff_mode,
        );
        if resolution.needs_rematerialize() {
            debug!(
                file = %file,
                from = ?resolution.requested,
                to = ?resolution.resolved,
                "Render mode changed, materializing content again"
            );
            self.materializer
                .materialize(&diff, resolution.resolved, &mut content)
                .await;
        }

        info!(
            file = %file,
            binary = diff.binary,
            comments = comments.len(),
            drafts = drafts.len(),
            mode = ?resolution.resolved,
            "File diff loaded"
        );

        let snapshot = FileDiffSnapshot {
            diff,
            comments,
            drafts,
            blames: BlamePair::default(),
            content,
            mode: resolution.resolved,
            has_image_preview,
        };
        Ok((snapshot, resolution))
    }

    /// Fetch both draft panes from the server, bypassing the cache.
    pub async fn reload_drafts(&self) -> Result<CommentPair> {
        let (base, revision) = futures::future::try_join(
            self.fetch_drafts_network(Pane::Base),
            self.fetch_drafts_network(Pane::Revision),
        )
        .await?;

        self.persist(&CacheKey::drafts(&self.pane_ref(Pane::Base)), &base)
            .await;
        self.persist(&CacheKey::drafts(&self.pane_ref(Pane::Revision)), &revision)
            .await;

        let drafts = self.reconcile(&base, &revision);
        debug!(file = %self.ctx.session.file, drafts = drafts.len(), "Drafts reloaded");
        Ok(drafts)
    }

    /// Drop the cached drafts of both panes.
    pub async fn invalidate_drafts(&self) {
        for pane in [Pane::Base, Pane::Revision] {
            let key = CacheKey::drafts(&self.pane_ref(pane));
            match self.cache.remove(&key).await {
                Ok(removed) => debug!(key = %key, removed, "Drafts invalidated"),
                Err(e) => warn!(key = %key, error = %e, "Failed to invalidate drafts"),
            }
        }
    }

    pub async fn fetch_blames(&self) -> Result<BlamePair> {
        let left_key = self.blame_key(Pane::Base);
        let right_key = self.blame_key(Pane::Revision);

        let (left, right) = futures::future::try_join(
            self.with_cached(&left_key, self.fetch_blame(Pane::Base)),
            self.with_cached(&right_key, self.fetch_blame(Pane::Revision)),
        )
        .await?;

        // Skipped panes are not cached, a later session may be allowed to fetch them.
        if !left.is_empty() {
            self.persist(&left_key, &left).await;
        }
        if !right.is_empty() {
            self.persist(&right_key, &right).await;
        }

        Ok(BlamePair::new(left, right))
    }

    fn blame_key(&self, pane: Pane) -> CacheKey {
        let side = match pane {
            Pane::Base => Side::Parent,
            Pane::Revision => Side::Revision,
        };
        CacheKey::blame(
            &self.pane_ref(Pane::Base),
            &self.pane_ref(Pane::Revision),
            self.ctx.file_hash(),
            side,
        )
    }

    fn blame_allowed(&self, pane: Pane) -> bool {
        let permitted = match (pane, self.ctx.blame_status()) {
            (_, None) => false,
            (Pane::Base, Some(status)) => status.has_left_side(),
            (Pane::Revision, Some(status)) => status.has_right_side(),
        };
        permitted
            && self.api.supports_feature(Feature::Blame)
            && !self.ctx.session.is_commit_message()
            && !self.ctx.is_binary()
            && self.ctx.is_authenticated()
    }

    async fn fetch_blame(&self, pane: Pane) -> Result<Vec<BlameInfo>> {
        if !self.blame_allowed(pane) {
            debug!(file = %self.ctx.session.file, pane = ?pane, "Blame skipped");
            return Ok(Vec::new());
        }

        let session = &self.ctx.session;
        let change = self.ctx.change_number();
        let (revision, of_parent) = match (pane, session.base) {
            // blame of the parent commit is served by the revision itself
            (Pane::Base, None) => (session.revision_id.clone(), true),
            (Pane::Base, Some(base)) => (base.to_string(), false),
            (Pane::Revision, _) => (session.revision_id.clone(), false),
        };
        self.call(
            self.api
                .file_blame(&change, &revision, &session.file, of_parent),
        )
        .await
    }

    pub async fn mark_reviewed(&self) -> Result<()> {
        let session = &self.ctx.session;
        self.call(self.api.mark_reviewed(
            &self.ctx.change_number(),
            &session.revision_id,
            &session.file,
        ))
        .await?;
        info!(file = %session.file, revision = %session.revision_id, "File marked as reviewed");
        Ok(())
    }

    /// Execute one draft mutation against the server.
    pub async fn perform(&self, action: &DraftAction) -> Result<DraftOutcome> {
        let session = &self.ctx.session;
        let change = self.ctx.change_number();
        let revision = action.revision();
        let target = revision.target(&session.revision_id);
        let supports_unresolved = self.api.supports_feature(Feature::UnresolvedComments);

        let draft_id = match action.to_write(&session.file, supports_unresolved) {
            DraftWrite::Create(input) => {
                self.call(self.api.create_draft(&change, target, &input))
                    .await?
                    .id
            }
            DraftWrite::Update(draft_id, input) => {
                self.call(self.api.update_draft(&change, target, draft_id, &input))
                    .await?;
                draft_id.to_string()
            }
            DraftWrite::Delete(draft_id) => {
                self.call(self.api.delete_draft(&change, target, draft_id))
                    .await?;
                draft_id.to_string()
            }
        };

        info!(
            action = action.name(),
            revision = %revision,
            draft = %draft_id,
            "Draft action completed"
        );
        Ok(DraftOutcome {
            revision: revision.clone(),
            draft_id,
        })
    }
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(bytes)?)
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}
