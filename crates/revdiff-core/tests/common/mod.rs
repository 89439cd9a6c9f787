// Shared fixtures for the orchestration and viewer tests
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use chrono::{TimeZone, Utc};
use tempfile::TempDir;
use tokio::sync::mpsc;

use revdiff_cache::{CacheError, CacheGateway, CacheKey, DiskCache};
use revdiff_core::{
    ApiError, DiffConfig, DiffEvent, DiffRequest, Feature, FetchOrchestrator, ReviewApi,
    SessionContext,
};
use revdiff_model::{
    Account, BlameInfo, BlameRange, ChangeInfo, CommentInput, CommentMap, CommentRecord,
    DiffBlock, DiffContent, DiffSession, ServerVersion, Side,
};

pub const CHANGE_ID: &str = "4711";
pub const REVISION_ID: &str = "abc";
pub const PARENT_COMMIT: &str = "def";
pub const NEXT_REVISION_ID: &str = "xyz";

/// Change 4711: patch set 3 (`abc`, parent `def`) and patch set 4 (`xyz`,
/// parent `ghi`).
pub const CHANGE_JSON: &str = r#"{
    "id": "demo~master~I8473b95934b5732ac55d26311a706c9c2bde9940",
    "project": "demo",
    "branch": "master",
    "subject": "Add the thing",
    "_number": 4711,
    "current_revision": "abc",
    "revisions": {
        "abc": {
            "_number": 3,
            "commit": {"parents": [{"commit": "def"}], "subject": "Add the thing"},
            "files": {
                "/COMMIT_MSG": {"status": "A"},
                "src/main.rs": {"lines_inserted": 1, "lines_deleted": 1},
                "src/new.rs": {"status": "A", "lines_inserted": 2},
                "gone.txt": {"status": "D"},
                "blob.bin": {"binary": true},
                "icon.png": {"binary": true}
            }
        },
        "xyz": {
            "_number": 4,
            "commit": {"parents": [{"commit": "ghi"}], "subject": "Add the thing"},
            "files": {
                "src/main.rs": {"lines_inserted": 1, "lines_deleted": 1}
            }
        }
    }
}"#;

/// Revisions are addressable by sha or patch set number, drafts are stored
/// under the sha.
fn revision_key(revision: &str) -> String {
    match revision {
        "3" => REVISION_ID.to_string(),
        other => other.to_string(),
    }
}

pub fn change() -> ChangeInfo {
    serde_json::from_str(CHANGE_JSON).unwrap()
}

pub fn account() -> Account {
    Account::new("https://review.example.org/#1000096", true, ServerVersion::new(3, 4))
}

pub fn lines(items: &[&str]) -> Option<Vec<String>> {
    Some(items.iter().map(|s| s.to_string()).collect())
}

pub fn modified_diff() -> DiffContent {
    DiffContent {
        binary: false,
        content: vec![
            DiffBlock {
                ab: lines(&["fn main() {"]),
                ..Default::default()
            },
            DiffBlock {
                a: lines(&["    old();"]),
                b: lines(&["    new();"]),
                ..Default::default()
            },
            DiffBlock {
                ab: lines(&["}"]),
                ..Default::default()
            },
        ],
        change_type: Some("MODIFIED".into()),
    }
}

pub fn comment(id: &str, path: &str, side: Option<Side>, secs: i64) -> CommentRecord {
    CommentRecord {
        id: id.to_string(),
        path: Some(path.to_string()),
        side,
        line: Some(2),
        in_reply_to: None,
        message: Some(format!("comment {id}")),
        updated: Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
        author: None,
        unresolved: Some(true),
        robot_id: None,
        robot_run_id: None,
        patch_set: None,
    }
}

pub fn comment_map(path: &str, records: Vec<CommentRecord>) -> CommentMap {
    let mut map = CommentMap::new();
    map.insert(path.to_string(), records);
    map
}

pub fn blame(id: &str, start: u32, end: u32) -> BlameInfo {
    BlameInfo {
        author: "dev".into(),
        id: id.into(),
        time: 1_700_000_000,
        commit_msg: format!("commit {id}"),
        ranges: vec![BlameRange { start, end }],
    }
}

#[derive(Default)]
pub struct FakeState {
    /// Diff bodies keyed by the requested base.
    pub diffs: HashMap<Option<u32>, DiffContent>,
    pub comments: HashMap<String, CommentMap>,
    pub robot_comments: HashMap<String, CommentMap>,
    pub drafts: HashMap<String, CommentMap>,
    /// Blames keyed by (revision, base flag).
    pub blames: HashMap<(String, bool), Vec<BlameInfo>>,
    /// Raw bodies keyed by (change, revision), stored base64 encoded.
    pub contents: HashMap<(String, String), Bytes>,
    pub changes_by_commit: HashMap<String, Vec<ChangeInfo>>,
    /// Method names that answer with a server error.
    pub failing: HashSet<&'static str>,
    pub calls: Vec<String>,
    next_draft: u32,
}

pub struct FakeReviewApi {
    pub state: Mutex<FakeState>,
    features: HashSet<Feature>,
}

impl FakeReviewApi {
    pub fn new(features: &[Feature]) -> Self {
        Self {
            state: Mutex::new(FakeState::default()),
            features: features.iter().copied().collect(),
        }
    }

    pub fn with_all_features() -> Self {
        Self::new(&[Feature::Blame, Feature::UnresolvedComments])
    }

    pub fn update(&self, f: impl FnOnce(&mut FakeState)) {
        f(&mut self.state.lock().unwrap());
    }

    pub fn set_content(&self, change: &str, revision: &str, raw: &[u8]) {
        let encoded = Bytes::from(STANDARD.encode(raw));
        self.update(|s| {
            s.contents
                .insert((change.to_string(), revision.to_string()), encoded);
        });
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn record(&self, method: &'static str, call: String) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        if state.failing.contains(method) {
            return Err(ApiError::Status {
                status: 500,
                message: format!("{method} failed"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ReviewApi for FakeReviewApi {
    async fn file_diff(&self, request: &DiffRequest) -> Result<DiffContent, ApiError> {
        self.record(
            "file_diff",
            format!("file_diff {} base={:?}", request.file, request.base),
        )?;
        self.state
            .lock()
            .unwrap()
            .diffs
            .get(&request.base)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(request.file.clone()))
    }

    async fn comments(&self, _change_id: &str, revision: &str) -> Result<CommentMap, ApiError> {
        self.record("comments", format!("comments {revision}"))?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .comments
            .get(revision)
            .cloned()
            .unwrap_or_default())
    }

    async fn robot_comments(
        &self,
        _change_id: &str,
        revision: &str,
    ) -> Result<CommentMap, ApiError> {
        self.record("robot_comments", format!("robot_comments {revision}"))?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .robot_comments
            .get(revision)
            .cloned()
            .unwrap_or_default())
    }

    async fn drafts(&self, _change_id: &str, revision: &str) -> Result<CommentMap, ApiError> {
        self.record("drafts", format!("drafts {revision}"))?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .drafts
            .get(&revision_key(revision))
            .cloned()
            .unwrap_or_default())
    }

    async fn create_draft(
        &self,
        _change_id: &str,
        revision: &str,
        input: &CommentInput,
    ) -> Result<CommentRecord, ApiError> {
        self.record(
            "create_draft",
            format!("create_draft {revision} {}", serde_json::to_string(input).unwrap()),
        )?;
        let mut state = self.state.lock().unwrap();
        state.next_draft += 1;
        let record = CommentRecord {
            id: format!("draft-{}", state.next_draft),
            path: Some(input.path.clone()),
            side: input.side,
            line: input.line,
            in_reply_to: input.in_reply_to.clone(),
            message: Some(input.message.clone()),
            updated: Utc.timestamp_opt(1_800_000_000, 0).unwrap(),
            author: None,
            unresolved: input.unresolved,
            robot_id: None,
            robot_run_id: None,
            patch_set: None,
        };
        state
            .drafts
            .entry(revision_key(revision))
            .or_default()
            .entry(input.path.clone())
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    async fn update_draft(
        &self,
        _change_id: &str,
        revision: &str,
        draft_id: &str,
        input: &CommentInput,
    ) -> Result<CommentRecord, ApiError> {
        self.record("update_draft", format!("update_draft {revision} {draft_id}"))?;
        let mut state = self.state.lock().unwrap();
        let record = state
            .drafts
            .get_mut(&revision_key(revision))
            .and_then(|map| map.get_mut(&input.path))
            .and_then(|records| records.iter_mut().find(|r| r.id == draft_id))
            .ok_or_else(|| ApiError::NotFound(draft_id.to_string()))?;
        record.message = Some(input.message.clone());
        record.unresolved = input.unresolved;
        Ok(record.clone())
    }

    async fn delete_draft(
        &self,
        _change_id: &str,
        revision: &str,
        draft_id: &str,
    ) -> Result<(), ApiError> {
        self.record("delete_draft", format!("delete_draft {revision} {draft_id}"))?;
        let mut state = self.state.lock().unwrap();
        if let Some(map) = state.drafts.get_mut(&revision_key(revision)) {
            for records in map.values_mut() {
                records.retain(|r| r.id != draft_id);
            }
        }
        Ok(())
    }

    async fn file_blame(
        &self,
        _change_id: &str,
        revision: &str,
        file: &str,
        base: bool,
    ) -> Result<Vec<BlameInfo>, ApiError> {
        self.record(
            "file_blame",
            format!("file_blame {revision} {file} base={base}"),
        )?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .blames
            .get(&(revision.to_string(), base))
            .cloned()
            .unwrap_or_default())
    }

    async fn file_content(
        &self,
        change_id: &str,
        revision: &str,
        file: &str,
    ) -> Result<Bytes, ApiError> {
        self.record(
            "file_content",
            format!("file_content {change_id} {revision} {file}"),
        )?;
        self.state
            .lock()
            .unwrap()
            .contents
            .get(&(change_id.to_string(), revision.to_string()))
            .cloned()
            .ok_or_else(|| ApiError::NotFound(file.to_string()))
    }

    async fn mark_reviewed(
        &self,
        _change_id: &str,
        revision: &str,
        file: &str,
    ) -> Result<(), ApiError> {
        self.record("mark_reviewed", format!("mark_reviewed {revision} {file}"))
    }

    async fn changes_by_commit(&self, commit: &str) -> Result<Vec<ChangeInfo>, ApiError> {
        self.record("changes_by_commit", format!("changes_by_commit {commit}"))?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .changes_by_commit
            .get(commit)
            .cloned()
            .unwrap_or_default())
    }

    fn supports_feature(&self, feature: Feature) -> bool {
        self.features.contains(&feature)
    }
}

/// Disk cache that remembers which keys were removed.
pub struct RecordingCache {
    inner: DiskCache,
    removed: Mutex<Vec<String>>,
}

impl RecordingCache {
    pub fn removed(&self) -> Vec<String> {
        self.removed.lock().unwrap().clone()
    }
}

#[async_trait]
impl CacheGateway for RecordingCache {
    async fn exists(&self, key: &CacheKey) -> bool {
        self.inner.exists(key).await
    }

    async fn read(&self, key: &CacheKey) -> Result<Vec<u8>, CacheError> {
        self.inner.read(key).await
    }

    async fn write(&self, key: &CacheKey, data: &[u8]) -> Result<(), CacheError> {
        self.inner.write(key, data).await
    }

    async fn remove(&self, key: &CacheKey) -> Result<bool, CacheError> {
        self.removed.lock().unwrap().push(key.to_string());
        self.inner.remove(key).await
    }
}

/// Cache of change 4711 with the change record already written.
pub async fn test_cache() -> (Arc<RecordingCache>, TempDir) {
    let dir = TempDir::new().unwrap();
    let inner = DiskCache::open(dir.path(), &account().id, CHANGE_ID)
        .await
        .unwrap();
    inner
        .write(&CacheKey::change(), CHANGE_JSON.as_bytes())
        .await
        .unwrap();
    let cache = Arc::new(RecordingCache {
        inner,
        removed: Mutex::new(Vec::new()),
    });
    (cache, dir)
}

pub fn session(file: &str, base: u32) -> DiffSession {
    DiffSession::new(CHANGE_ID, REVISION_ID, file, base, 3)
}

pub fn test_config(dir: &TempDir) -> DiffConfig {
    DiffConfig {
        cache_dir: dir.path().to_path_buf(),
        ..DiffConfig::default()
    }
}

pub fn orchestrator(
    api: Arc<FakeReviewApi>,
    cache: Arc<RecordingCache>,
    account: Account,
    session: DiffSession,
    config: DiffConfig,
) -> FetchOrchestrator {
    let ctx = SessionContext::new(change(), account, session).unwrap();
    FetchOrchestrator::new(api, cache, Arc::new(ctx), config)
}

/// Next event, failing the test if none arrives in time.
pub async fn next_event(rx: &mut mpsc::Receiver<DiffEvent>) -> DiffEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for an event")
        .expect("event channel closed")
}

/// Skip events until one matches.
pub async fn wait_for(
    rx: &mut mpsc::Receiver<DiffEvent>,
    mut matches: impl FnMut(&DiffEvent) -> bool,
) -> DiffEvent {
    loop {
        let event = next_event(rx).await;
        if matches(&event) {
            return event;
        }
    }
}

/// Poll `check` until it holds.
pub async fn eventually(mut check: impl FnMut() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}
