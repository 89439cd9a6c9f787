//! Two-sided comment reconciliation.
//!
//! The server returns comments per revision as a path map. A diff view
//! shows two panes, so the maps of the base and the revision are folded into
//! one ordered sequence per pane, each record stamped with the patch set it
//! is displayed against.

use revdiff_model::{CommentMap, CommentPair, CommentRecord, Side};

/// Reconcile the comments of `file` for one pane.
///
/// `comments` is the map fetched for this pane. `other_side` is only passed
/// for the left pane of a parent-commit view; parent-side records are kept
/// only when it is present.
pub fn reconcile(
    file: &str,
    comments: Option<&CommentMap>,
    other_side: Option<&CommentMap>,
    base: u32,
    parent_base: u32,
    is_left: bool,
) -> Vec<CommentRecord> {
    let own = comments.and_then(|map| map.get(file));
    let other = other_side.and_then(|map| map.get(file));

    let mut out = Vec::new();
    for record in own.into_iter().flatten() {
        let mut record = record.clone();
        if record.side.is_none() && base != parent_base && !is_left {
            record.side = Some(Side::Revision);
        } else if record.side == Some(Side::Revision) && is_left {
            record.side = None;
        }

        if other.is_none() && record.is_parent_side() {
            continue;
        }
        record.patch_set = Some(stamp(&record, base, parent_base));
        out.push(record);
    }

    // Parent-side records living in the other pane's payload. Rules above
    // are not applied to them.
    if base == 0 {
        for record in other.into_iter().flatten().filter(|r| r.is_parent_side()) {
            let mut record = record.clone();
            record.patch_set = Some(stamp(&record, base, parent_base));
            out.push(record);
        }
    }

    out.sort_by_key(|record| record.updated);
    out
}

fn stamp(record: &CommentRecord, base: u32, parent_base: u32) -> u32 {
    if record.is_parent_side() {
        parent_base
    } else {
        base
    }
}

/// Left and right panes of a view comparing `revision` against `base`
/// (`0` for the parent commit).
pub fn reconcile_pair(
    file: &str,
    base_side: &CommentMap,
    revision_side: &CommentMap,
    base: u32,
    revision: u32,
) -> CommentPair {
    let other = (base == 0).then_some(revision_side);
    CommentPair::new(
        reconcile(file, Some(base_side), other, base, base, true),
        reconcile(file, Some(revision_side), None, revision, base, false),
    )
}
