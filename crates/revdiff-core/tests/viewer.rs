mod common;

use std::sync::Arc;
use std::time::Duration;

use revdiff_cache::{CacheGateway, CacheKey, DiskCache};
use revdiff_core::{
    CommentIntent, DiffError, DiffEvent, DiffMode, FileDiffViewer, PipelineKind, RevisionRef,
    ViewState,
};
use tempfile::TempDir;
use tokio::sync::mpsc;

use common::*;

async fn open_viewer(
    api: &Arc<FakeReviewApi>,
    cache: &Arc<RecordingCache>,
    dir: &TempDir,
    state: ViewState,
) -> (FileDiffViewer, mpsc::Receiver<DiffEvent>) {
    FileDiffViewer::open(
        api.clone(),
        cache.clone(),
        account(),
        session("src/main.rs", 0),
        test_config(dir),
        state,
    )
    .await
    .unwrap()
}

fn main_rs_api() -> Arc<FakeReviewApi> {
    let api = Arc::new(FakeReviewApi::with_all_features());
    api.update(|s| {
        s.diffs.insert(None, modified_diff());
        s.blames
            .insert((REVISION_ID.into(), true), vec![blame("parent", 1, 3)]);
        s.blames
            .insert((REVISION_ID.into(), false), vec![blame("rev", 1, 3)]);
    });
    api
}

/// Attach and wait until the first snapshot is published.
async fn loaded(viewer: &FileDiffViewer, rx: &mut mpsc::Receiver<DiffEvent>) {
    viewer.attach().unwrap().await.unwrap();
    wait_for(rx, |e| matches!(e, DiffEvent::Snapshot(_))).await;
}

#[tokio::test]
async fn test_open_without_change_record() {
    let dir = TempDir::new().unwrap();
    let cache = DiskCache::open(dir.path(), "anon", CHANGE_ID).await.unwrap();
    let api = Arc::new(FakeReviewApi::with_all_features());

    let result = FileDiffViewer::open(
        api,
        Arc::new(cache),
        account(),
        session("src/main.rs", 0),
        test_config(&dir),
        ViewState::new(DiffMode::Unified),
    )
    .await;
    assert!(matches!(result, Err(DiffError::SessionDataMissing(_))));
}

#[tokio::test]
async fn test_open_on_disk_uses_configured_cache_dir() {
    let dir = TempDir::new().unwrap();
    let api = main_rs_api();
    let main_rs = || session("src/main.rs", 0);
    let state = || ViewState::new(DiffMode::Unified);

    let missing =
        FileDiffViewer::open_on_disk(api.clone(), account(), main_rs(), test_config(&dir), state())
            .await;
    assert!(matches!(missing, Err(DiffError::SessionDataMissing(_))));

    let cache = DiskCache::open(dir.path(), &account().id, CHANGE_ID)
        .await
        .unwrap();
    cache
        .write(&CacheKey::change(), CHANGE_JSON.as_bytes())
        .await
        .unwrap();

    let (viewer, mut rx) =
        FileDiffViewer::open_on_disk(api.clone(), account(), main_rs(), test_config(&dir), state())
            .await
            .unwrap();
    loaded(&viewer, &mut rx).await;
    assert!(viewer.snapshot().unwrap().right_content().is_some());
}

#[tokio::test]
async fn test_attach_publishes_and_marks_reviewed() {
    let (cache, dir) = test_cache().await;
    let api = main_rs_api();
    let (viewer, mut rx) = open_viewer(&api, &cache, &dir, ViewState::new(DiffMode::SideBySide)).await;

    viewer.attach().unwrap().await.unwrap();
    assert!(!viewer.is_running(PipelineKind::Diff));

    assert!(matches!(
        next_event(&mut rx).await,
        DiffEvent::Started(PipelineKind::Diff)
    ));
    assert!(matches!(
        next_event(&mut rx).await,
        DiffEvent::DiffComplete {
            binary: false,
            has_image_preview: false
        }
    ));
    let DiffEvent::Snapshot(snapshot) = next_event(&mut rx).await else {
        panic!("expected a snapshot");
    };
    assert_eq!(snapshot.mode, DiffMode::SideBySide);
    assert!(viewer.snapshot().is_some());

    let right = snapshot.right_content().unwrap();
    assert_eq!(
        viewer.read_content(right).await.unwrap(),
        b"fn main() {\n    new();\n}\n"
    );

    eventually(|| api.count("mark_reviewed") == 1).await;
    assert!(api
        .calls()
        .contains(&format!("mark_reviewed {REVISION_ID} src/main.rs")));
    // blames are only fetched on request
    assert_eq!(api.count("file_blame"), 0);
}

#[tokio::test]
async fn test_failed_load_reports_failure() {
    let (cache, dir) = test_cache().await;
    let api = main_rs_api();
    api.update(|s| {
        s.failing.insert("file_diff");
    });
    let (viewer, mut rx) = open_viewer(&api, &cache, &dir, ViewState::new(DiffMode::Unified)).await;

    viewer.attach().unwrap().await.unwrap();
    let event = wait_for(&mut rx, |e| matches!(e, DiffEvent::Failed { .. })).await;
    assert!(matches!(
        event,
        DiffEvent::Failed {
            kind: PipelineKind::Diff,
            ..
        }
    ));
    assert!(viewer.snapshot().is_none());
    assert_eq!(api.count("mark_reviewed"), 0);
}

#[tokio::test]
async fn test_new_draft_refreshes_drafts() {
    let (cache, dir) = test_cache().await;
    let api = main_rs_api();
    let (viewer, mut rx) = open_viewer(&api, &cache, &dir, ViewState::new(DiffMode::Unified)).await;
    loaded(&viewer, &mut rx).await;

    viewer
        .dispatch(CommentIntent::NewDraft {
            left: false,
            line: Some(2),
            message: "Needs a test".into(),
        })
        .unwrap()
        .await
        .unwrap();
    assert!(!viewer.is_running(PipelineKind::Action));

    let created = wait_for(&mut rx, |e| matches!(e, DiffEvent::DraftCreated { .. })).await;
    let DiffEvent::DraftCreated { revision, draft_id } = created else {
        unreachable!();
    };
    assert_eq!(revision, "3");
    assert_eq!(draft_id, "draft-1");

    let removed = cache.removed();
    assert!(removed.contains(&"0_drafts.json".to_string()));
    assert!(removed.contains(&"3_drafts.json".to_string()));

    let refreshed = wait_for(&mut rx, |e| match e {
        DiffEvent::Snapshot(snapshot) => snapshot.drafts.find("draft-1").is_some(),
        _ => false,
    })
    .await;
    let DiffEvent::Snapshot(snapshot) = refreshed else {
        unreachable!();
    };
    let draft = snapshot.drafts.find("draft-1").unwrap();
    assert_eq!(draft.message.as_deref(), Some("Needs a test"));
    assert_eq!(draft.patch_set, Some(3));
    assert!(snapshot.drafts.left.is_empty());
    // drafts were fetched from the server again, not from the cache
    assert_eq!(api.count("drafts"), 2);
}

#[tokio::test]
async fn test_done_reply_on_parent_side() {
    let (cache, dir) = test_cache().await;
    let api = main_rs_api();
    let (viewer, mut rx) = open_viewer(&api, &cache, &dir, ViewState::new(DiffMode::Unified)).await;
    loaded(&viewer, &mut rx).await;

    viewer
        .dispatch(CommentIntent::Done {
            revision: RevisionRef::parent(),
            comment_id: "c1".into(),
            line: Some(1),
        })
        .unwrap()
        .await
        .unwrap();

    let call = api
        .calls()
        .into_iter()
        .find(|c| c.starts_with("create_draft"))
        .unwrap();
    assert!(call.starts_with(&format!("create_draft {REVISION_ID} ")), "{call}");
    assert!(call.contains(r#""message":"Done""#));
    assert!(call.contains(r#""in_reply_to":"c1""#));
    assert!(call.contains(r#""unresolved":false"#));

    let created = wait_for(&mut rx, |e| matches!(e, DiffEvent::DraftCreated { .. })).await;
    assert!(matches!(created, DiffEvent::DraftCreated { revision, .. } if revision == "0"));
}

#[tokio::test]
async fn test_failed_action_keeps_drafts() {
    let (cache, dir) = test_cache().await;
    let api = main_rs_api();
    api.update(|s| {
        s.failing.insert("create_draft");
    });
    let (viewer, mut rx) = open_viewer(&api, &cache, &dir, ViewState::new(DiffMode::Unified)).await;
    loaded(&viewer, &mut rx).await;

    viewer
        .dispatch(CommentIntent::NewDraft {
            left: true,
            line: None,
            message: "file comment".into(),
        })
        .unwrap()
        .await
        .unwrap();

    let failed = wait_for(&mut rx, |e| matches!(e, DiffEvent::Failed { .. })).await;
    assert!(matches!(
        failed,
        DiffEvent::Failed {
            kind: PipelineKind::Action,
            ..
        }
    ));
    assert!(!viewer.is_running(PipelineKind::Action));
    assert!(cache.removed().is_empty());
    assert_eq!(api.count("drafts"), 1);
}

#[tokio::test]
async fn test_show_blame_fetches_once() {
    let (cache, dir) = test_cache().await;
    let api = main_rs_api();
    let (viewer, mut rx) = open_viewer(&api, &cache, &dir, ViewState::new(DiffMode::Unified)).await;
    loaded(&viewer, &mut rx).await;

    viewer.show_blame(true, true).unwrap().await.unwrap();
    assert!(viewer.view_state().show_blame_left);
    assert!(!viewer.view_state().show_blame_right);

    wait_for(&mut rx, |e| matches!(e, DiffEvent::BlameProgress(true))).await;
    let DiffEvent::Snapshot(snapshot) = next_event(&mut rx).await else {
        panic!("expected a snapshot with blames");
    };
    assert_eq!(snapshot.blames.left[0].id, "parent");
    assert_eq!(snapshot.blames.right[0].id, "rev");
    assert!(matches!(
        next_event(&mut rx).await,
        DiffEvent::BlameProgress(false)
    ));

    // both sides known: the current snapshot is republished
    assert!(viewer.show_blame(false, true).is_none());
    assert!(matches!(next_event(&mut rx).await, DiffEvent::Snapshot(_)));
    assert_eq!(api.count("file_blame"), 2);
}

#[tokio::test]
async fn test_restored_blame_toggle_fetches_after_load() {
    let (cache, dir) = test_cache().await;
    let api = main_rs_api();
    let state = ViewState {
        show_blame_right: true,
        scroll_position: Some(42),
        ..ViewState::new(DiffMode::Unified)
    };
    let (viewer, mut rx) = open_viewer(&api, &cache, &dir, state).await;
    assert_eq!(viewer.scroll_position(), Some(42));

    viewer.attach().unwrap().await.unwrap();
    wait_for(&mut rx, |e| matches!(e, DiffEvent::BlameProgress(false))).await;

    let snapshot = viewer.snapshot().unwrap();
    assert!(!snapshot.blames.is_incomplete());
    assert_eq!(api.count("file_blame"), 2);
}

#[tokio::test]
async fn test_view_state_round_trip() {
    let (cache, dir) = test_cache().await;
    let api = main_rs_api();
    let (viewer, _rx) = open_viewer(&api, &cache, &dir, ViewState::new(DiffMode::Unified)).await;

    viewer.set_scroll_position(Some(120));
    viewer.set_skip_lines_history(Some("12,40".into()));
    let state = viewer.view_state();
    assert_eq!(state.scroll_position, Some(120));
    assert_eq!(state.skip_lines_history.as_deref(), Some("12,40"));
    assert_eq!(viewer.skip_lines_history(), state.skip_lines_history);
    assert_eq!(state.mode, DiffMode::Unified);
}

#[tokio::test]
async fn test_detach_stops_everything() {
    let (cache, dir) = test_cache().await;
    let api = main_rs_api();
    let (viewer, mut rx) = open_viewer(&api, &cache, &dir, ViewState::new(DiffMode::Unified)).await;
    loaded(&viewer, &mut rx).await;

    viewer.detach();
    assert!(viewer.attach().is_none());
    assert!(viewer.reload_drafts().is_none());

    let drained = tokio::time::timeout(Duration::from_secs(5), async {
        while rx.recv().await.is_some() {}
    })
    .await;
    assert!(drained.is_ok(), "event channel should close after detach");
}
