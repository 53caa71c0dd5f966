//! WordPress video pipeline.
//!
//! download → verify credentials → multipart POST /media → metadata patch → completed.
//!
//! The POST carries the `job:<id>` marker as the media description. When a
//! proxy cuts the POST short with a 504, WordPress usually still finishes; the
//! job then stays `processing` with a `verify_token` until the reconciler
//! finds the item by its marker.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::{json, Value};
use tracing::{error, info, warn};

use super::models::{metadata_patch, WordPressUploadJob};
use crate::kernel::jobs::{now_utc_iso, JobContext, JobPatch, JobState};
use crate::kernel::{BaseMediaLibrary, MediaPatch, MediaUpload, MediaUploadOutcome, ServerDeps};

pub async fn run(ctx: JobContext, deps: Arc<ServerDeps>, job: WordPressUploadJob) -> Result<()> {
    let upload_name = job
        .filename
        .clone()
        .unwrap_or_else(|| format!("video_{}.mp4", ctx.job_id()));
    info!(file = %upload_name, "WP job start");

    // 1) Source media
    let temp_file = ctx.temp_path("wp", "");
    let bytes = deps
        .transfer
        .download(&job.video_url, &temp_file, "download")
        .await
        .context("Source download failed")?;
    info!(bytes, "download complete");

    // 2) Credentials
    if let Err(e) = deps.media_library.verify_credentials().await {
        error!(error = %e, "authentication failed");
        return Err(e.context("WordPress authentication failed"));
    }

    // 3) Primary transfer
    let mime_type = mime_guess::from_path(&upload_name)
        .first_raw()
        .unwrap_or("video/mp4")
        .to_string();
    let upload = MediaUpload {
        filename: upload_name.clone(),
        mime_type,
        title: None,
        alt_text: None,
        description: Some(ctx.marker()),
    };
    let pending = metadata_patch(job.title.as_deref(), job.alt_text.as_deref(), job.post_id);

    let outcome = deps
        .media_library
        .upload_media(&temp_file, &upload)
        .await
        .context("WordPress upload failed")?;

    let item = match outcome {
        MediaUploadOutcome::Created(item) => item,
        MediaUploadOutcome::Unverified { status } => {
            warn!(status, marker = %ctx.marker(), "upload unverified; leaving job for reconciliation");
            let mut patch = JobPatch::new()
                .set("verify_token", ctx.marker())
                .set("upload_status", status)
                .set("filename", upload_name);
            if !pending.is_empty() {
                patch = patch.set("pending_metadata", serde_json::to_value(&pending)?);
            }
            ctx.record(patch).await?;
            return Ok(());
        }
    };
    info!(id = item.id, url = ?item.source_url, "upload complete");

    // 4) Side effects
    let mut done = JobPatch::new();
    if !pending.is_empty() {
        done = done.set(
            "metadata_update",
            apply_metadata(deps.media_library.as_ref(), item.id, &pending).await,
        );
    }

    // 5) Finalize
    let done = done
        .state(JobState::Completed)
        .set("attachment_id", item.id)
        .set_opt("source_url", item.source_url)
        .set("filename", upload_name)
        .set("finished_at", now_utc_iso());
    ctx.record(done).await?;

    info!("WP automation complete");
    Ok(())
}

/// Non-fatal metadata patch; the outcome is recorded on the job.
pub async fn apply_metadata(library: &dyn BaseMediaLibrary, id: u64, patch: &MediaPatch) -> Value {
    info!(id, "updating media metadata");
    match library.update_media(id, patch).await {
        Ok(()) => {
            info!(id, "metadata updated");
            json!({ "ok": true })
        }
        Err(e) => {
            warn!(id, error = %e, "meta update failed");
            json!({ "ok": false, "error": e.to_string() })
        }
    }
}
