//! Marker-based reconciliation with the WordPress media library.
//!
//! 1. `search=job:<id>` (fast path, relies on WordPress's search index)
//! 2. scan the most recent items and match the marker in description,
//!    caption, title or alt text (the index can lag behind new uploads)
//! 3. match → cache `completed` into the store and apply pending metadata
//! 4. no match → still processing; callers poll again
//!
//! A failing listing call is surfaced as an error and leaves the record alone.

use anyhow::{Context, Result};
use tracing::{debug, info, instrument};

use super::pipeline::apply_metadata;
use crate::kernel::jobs::{marker_for, now_utc_iso, JobPatch, JobRecord, JobState};
use crate::kernel::{BaseMediaLibrary, MediaItem, MediaPatch, ServerDeps};

const SEARCH_PAGE_SIZE: u32 = 20;

#[derive(Debug, Clone, PartialEq)]
pub enum Reconciliation {
    /// No such job was ever admitted.
    Unknown,
    /// Found remotely (or already recorded as completed).
    Completed(JobRecord),
    /// The pipeline itself recorded a failure.
    Failed(JobRecord),
    /// Not visible remotely yet.
    Pending(JobRecord),
}

/// Find the media item carrying `marker`: search first, then the recent scan.
pub async fn find_by_marker(
    library: &dyn BaseMediaLibrary,
    marker: &str,
    scan_depth: u32,
) -> Result<Option<MediaItem>> {
    let hits = library
        .search_media(marker, SEARCH_PAGE_SIZE)
        .await
        .context("WordPress media search failed")?;
    if let Some(item) = hits.into_iter().find(|item| item.mentions(marker)) {
        debug!(id = item.id, "marker found via search");
        return Ok(Some(item));
    }

    let recent = library
        .recent_media(scan_depth)
        .await
        .context("WordPress recent media listing failed")?;
    let found = recent.into_iter().find(|item| item.mentions(marker));
    if let Some(item) = &found {
        debug!(id = item.id, "marker found via recent scan");
    }
    Ok(found)
}

#[instrument(skip(deps))]
pub async fn reconcile(job_id: &str, deps: &ServerDeps) -> Result<Reconciliation> {
    let Some(record) = deps.wordpress_jobs.get(job_id).await else {
        return Ok(Reconciliation::Unknown);
    };

    match record.state {
        JobState::Completed => return Ok(Reconciliation::Completed(record)),
        JobState::Error => return Ok(Reconciliation::Failed(record)),
        JobState::Processing => {}
    }

    let marker = record
        .get_str("verify_token")
        .map(str::to_string)
        .unwrap_or_else(|| marker_for(job_id));

    let Some(item) = find_by_marker(deps.media_library.as_ref(), &marker, deps.reconcile_scan_depth).await? else {
        debug!(job_id, "no media item carries the marker yet");
        return Ok(Reconciliation::Pending(record));
    };
    info!(job_id, id = item.id, "reconciled upload with media library");

    let mut patch = JobPatch::new()
        .state(JobState::Completed)
        .set("attachment_id", item.id)
        .set_opt("source_url", item.source_url.clone())
        .set("reconciled_at", now_utc_iso())
        .set("finished_at", now_utc_iso());

    if let Some(pending) = record
        .get("pending_metadata")
        .and_then(|v| serde_json::from_value::<MediaPatch>(v.clone()).ok())
        .filter(|p| !p.is_empty())
    {
        patch = patch.set(
            "metadata_update",
            apply_metadata(deps.media_library.as_ref(), item.id, &pending).await,
        );
    }

    // The pipeline may have recorded a failure while the lookup ran; the store
    // keeps that terminal state, so report what it holds.
    let cached = deps.wordpress_jobs.patch(job_id, patch).await?;
    Ok(match cached.state {
        JobState::Completed => Reconciliation::Completed(cached),
        JobState::Error => Reconciliation::Failed(cached),
        JobState::Processing => Reconciliation::Pending(cached),
    })
}
