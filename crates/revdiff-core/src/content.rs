//! Left/right file content for rendering.
//!
//! Text files are rebuilt from the diff body. Binary files are downloaded
//! from the raw content endpoint, but only when they are shown as images.
//! Failures never propagate: the affected side is simply absent.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use revdiff_cache::{CacheGateway, CacheKey};
use revdiff_model::constants::IMAGE_PREVIEW_EXTENSIONS;
use revdiff_model::{ChangeInfo, DiffContent, Side};
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, warn};

use crate::api::ReviewApi;
use crate::mode::DiffMode;
use crate::session::SessionContext;
use crate::snapshot::{ContentHandle, MaterializedContent};

pub struct ContentMaterializer {
    api: Arc<dyn ReviewApi>,
    cache: Arc<dyn CacheGateway>,
    ctx: Arc<SessionContext>,
    permits: Arc<Semaphore>,
    /// Parent changes resolved during this session, keyed by commit.
    parents: Mutex<HashMap<String, Option<ChangeInfo>>>,
}

impl ContentMaterializer {
    pub fn new(
        api: Arc<dyn ReviewApi>,
        cache: Arc<dyn CacheGateway>,
        ctx: Arc<SessionContext>,
        permits: Arc<Semaphore>,
    ) -> Self {
        Self {
            api,
            cache,
            ctx,
            permits,
            parents: Mutex::new(HashMap::new()),
        }
    }

    /// Fill the sides of `content` that exist for this file in `mode`.
    ///
    /// Sides that are not handled in `mode` are left untouched, so a second
    /// pass after a mode change keeps what the first pass produced.
    pub async fn materialize(
        &self,
        diff: &DiffContent,
        mode: DiffMode,
        content: &mut MaterializedContent,
    ) {
        let status = self.ctx.content_status();
        let session = &self.ctx.session;

        if !diff.binary {
            if status.has_left_side() {
                let text = render_lines(diff.left_lines());
                content.left = self.write_text(Side::Parent, text).await;
            }
            if status.has_right_side() {
                let text = render_lines(diff.right_lines());
                content.right = self.write_text(Side::Revision, text).await;
            }
            return;
        }

        if !mode.is_image() {
            debug!(file = %session.file, "Binary file outside image mode, no content");
            return;
        }

        if status.has_left_side() {
            content.left = self.download_base().await;
        }
        if status.has_right_side() {
            content.right = self
                .download(&self.ctx.change_number(), &session.revision_id, Side::Revision)
                .await;
        }
    }

    /// Entry of one pane of this base/revision pairing.
    fn content_key(&self, pane: Side) -> CacheKey {
        let session = &self.ctx.session;
        CacheKey::content(
            &session.base_ref(),
            &session.revision_ref(),
            self.ctx.file_hash(),
            pane,
        )
    }

    async fn write_text(&self, pane: Side, text: String) -> Option<ContentHandle> {
        let key = self.content_key(pane);
        if self.cache.exists(&key).await {
            return Some(ContentHandle::new(key));
        }

        if !text.is_empty() {
            match self.cache.write(&key, text.as_bytes()).await {
                Ok(()) => return Some(ContentHandle::new(key)),
                Err(e) => warn!(key = %key, error = %e, "Failed to write file content"),
            }
        }

        // no partial or empty artifact may stay behind
        if let Err(e) = self.cache.remove(&key).await {
            warn!(key = %key, error = %e, "Failed to remove empty file content");
        }
        None
    }

    async fn download_base(&self) -> Option<ContentHandle> {
        let session = &self.ctx.session;
        if session.base.is_some() {
            let base_ref = session.base_ref();
            return self
                .download(&self.ctx.change_number(), &base_ref, Side::Parent)
                .await;
        }

        // The parent commit is only reachable through the change it belongs to.
        let Some(commit) = self.ctx.parent_commit().map(str::to_owned) else {
            debug!(file = %session.file, "Revision has no parent commit");
            return None;
        };
        let parent = self.resolve_parent(&commit).await?;
        self.download(&parent.legacy_id.to_string(), &commit, Side::Parent)
            .await
    }

    async fn download(
        &self,
        change_id: &str,
        revision: &str,
        pane: Side,
    ) -> Option<ContentHandle> {
        use base64::engine::general_purpose::STANDARD;
        use base64::Engine;

        let key = self.content_key(pane);
        if self.cache.exists(&key).await {
            return Some(ContentHandle::new(key));
        }

        let file = &self.ctx.session.file;
        let body = {
            let _permit = self.permits.acquire().await.ok()?;
            match self.api.file_content(change_id, revision, file).await {
                Ok(body) => body,
                Err(e) => {
                    warn!(file = %file, revision, error = %e, "Can't download file content");
                    return None;
                }
            }
        };

        let encoded: Vec<u8> = body
            .iter()
            .copied()
            .filter(|b| !b.is_ascii_whitespace())
            .collect();
        let decoded = match STANDARD.decode(encoded) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!(file = %file, revision, error = %e, "Malformed file content");
                return None;
            }
        };

        match self.cache.write(&key, &decoded).await {
            Ok(()) => {
                debug!(key = %key, size = decoded.len(), "File content downloaded");
                Some(ContentHandle::new(key))
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to store file content");
                None
            }
        }
    }

    /// Change whose current revision is `commit`, `None` if there is none or
    /// the lookup failed.
    pub async fn resolve_parent(&self, commit: &str) -> Option<ChangeInfo> {
        let mut parents = self.parents.lock().await;
        if let Some(known) = parents.get(commit) {
            return known.clone();
        }

        let key = CacheKey::parent_change(commit);
        let resolved = match self.read_parent(&key).await {
            Some(cached) => cached,
            None => {
                let lookup = {
                    let _permit = self.permits.acquire().await.ok()?;
                    self.api.changes_by_commit(commit).await
                };
                let change = match lookup {
                    Ok(changes) => changes.into_iter().next(),
                    Err(e) => {
                        warn!(commit, error = %e, "Can't fetch parent change");
                        return None;
                    }
                };
                match serde_json::to_vec(&change) {
                    Ok(bytes) => {
                        if let Err(e) = self.cache.write(&key, &bytes).await {
                            warn!(key = %key, error = %e, "Failed to cache parent change");
                        }
                    }
                    Err(e) => warn!(commit, error = %e, "Failed to encode parent change"),
                }
                change
            }
        };

        if resolved.is_none() {
            debug!(commit, "No change found for parent commit");
        }
        parents.insert(commit.to_string(), resolved.clone());
        resolved
    }

    /// `Some(None)` is a cached negative lookup.
    async fn read_parent(&self, key: &CacheKey) -> Option<Option<ChangeInfo>> {
        if !self.cache.exists(key).await {
            return None;
        }
        let bytes = self.cache.read(key).await.ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}

fn render_lines<'a>(lines: impl Iterator<Item = &'a str>) -> String {
    let mut text = String::new();
    for line in lines {
        text.push_str(line);
        text.push('\n');
    }
    text
}

/// Whether the right side can be previewed as an image.
pub fn has_image_preview(file: &str, right: Option<&ContentHandle>) -> bool {
    if right.is_none() {
        return false;
    }
    Path::new(file)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_PREVIEW_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}
