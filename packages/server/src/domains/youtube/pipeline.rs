//! YouTube upload pipeline.
//!
//! download → OAuth refresh → resumable upload → thumbnail → Bunny delete → completed.
//! Thumbnail and Bunny delete are side effects: their failures are recorded on
//! the job but never fail it.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use super::models::YoutubeUploadJob;
use super::schedule::{plan_publish, PublishPlan};
use crate::common::filename_from_url;
use crate::kernel::jobs::{now_utc_iso, JobContext, JobPatch, JobState};
use crate::kernel::{ServerDeps, VideoMetadata};

pub async fn run(ctx: JobContext, deps: Arc<ServerDeps>, job: YoutubeUploadJob) -> Result<()> {
    let filename = filename_from_url(&job.video_url)
        .unwrap_or_else(|| format!("video_{}.mp4", ctx.job_id()));
    info!(channel = %job.channel, file = %filename, "YT job start");

    // 1) Source media
    let temp_file = ctx.temp_path("temp", ".mp4");
    let bytes = deps
        .transfer
        .download(&job.video_url, &temp_file, "download")
        .await
        .context("Source download failed")?;
    info!(bytes, path = %temp_file.display(), "download complete");

    // 2) Authenticate eagerly so a revoked token reads as an auth failure
    let access_token = match deps.credentials.access_token(&job.channel).await {
        Ok(token) => token,
        Err(e) => {
            error!(channel = %job.channel, error = %e, "authentication failed");
            return Err(e.context(format!("Authentication failed for channel {}", job.channel)));
        }
    };

    // 3) Primary transfer
    let plan = plan_publish(job.publish_at.as_deref(), Utc::now(), deps.reference_offset);
    match &plan {
        PublishPlan::Immediate => {}
        PublishPlan::Scheduled { publish_at } => info!(publish_at = %publish_at, "scheduling publish"),
        PublishPlan::Stale { requested } => {
            info!(requested = %requested, "publish_at is in the past; publishing immediately")
        }
        PublishPlan::Unparseable { raw, reason } => {
            warn!(publish_at = %raw, reason = %reason, "publish_at parse failed; publishing immediately")
        }
    }
    let (privacy_status, publish_at) = plan.visibility(&job.privacy);

    let metadata = VideoMetadata {
        title: job.title.clone(),
        description: job.description.clone(),
        tags: job.tags.clone(),
        privacy_status,
        publish_at: publish_at.clone(),
        made_for_kids: false,
    };
    let video_id = deps
        .video_platform
        .upload_video(&access_token, &temp_file, &metadata)
        .await
        .context("YouTube upload failed")?;
    let youtube_url = format!("https://youtu.be/{video_id}");
    info!(url = %youtube_url, "YT upload complete");

    // 4) Side effects
    let mut done = JobPatch::new();

    if let Some(thumbnail_url) = &job.thumbnail_url {
        let outcome = set_thumbnail(&ctx, &deps, &access_token, &video_id, thumbnail_url).await;
        done = done.set("thumbnail", outcome);
    }

    if let Some(delete_url) = &job.bunny_delete_url {
        done = done.set("bunny_delete", delete_source(&deps, delete_url).await);
    }

    // 5) Finalize
    let done = done
        .state(JobState::Completed)
        .set("youtube_url", youtube_url)
        .set("video_id", video_id)
        .set("channel", job.channel.as_str())
        .set("source_filename", filename)
        .set_opt("scheduled_publish_at", publish_at)
        .set("finished_at", now_utc_iso());
    ctx.record(done).await?;

    info!("YT automation complete");
    Ok(())
}

async fn set_thumbnail(
    ctx: &JobContext,
    deps: &ServerDeps,
    access_token: &str,
    video_id: &str,
    thumbnail_url: &str,
) -> Value {
    match upload_thumbnail(ctx, deps, access_token, video_id, thumbnail_url).await {
        Ok(()) => {
            info!("thumbnail set");
            json!({ "ok": true })
        }
        Err(e) => {
            let message = format!("{e:#}");
            warn!(error = %message, "thumbnail error (non-fatal)");
            json!({ "ok": false, "error": message })
        }
    }
}

async fn upload_thumbnail(
    ctx: &JobContext,
    deps: &ServerDeps,
    access_token: &str,
    video_id: &str,
    thumbnail_url: &str,
) -> Result<()> {
    let thumb_file = ctx.temp_path("thumb", ".jpg");
    deps.transfer
        .download(thumbnail_url, &thumb_file, "thumbnail download")
        .await
        .context("Thumbnail download failed")?;
    deps.video_platform
        .set_thumbnail(access_token, video_id, &thumb_file)
        .await
}

async fn delete_source(deps: &ServerDeps, delete_url: &str) -> Value {
    info!("deleting source from Bunny temp storage");
    match deps.cdn.delete(delete_url).await {
        Ok(receipt) => {
            if receipt.ok {
                info!(status = receipt.status_code, "Bunny delete OK");
            } else {
                warn!(status = receipt.status_code, body = %receipt.text, "Bunny delete failed");
            }
            serde_json::to_value(&receipt).unwrap_or_else(|e| json!({ "ok": receipt.ok, "error": e.to_string() }))
        }
        Err(e) => {
            warn!(error = %e, "Bunny delete exception");
            json!({ "ok": false, "error": e.to_string() })
        }
    }
}
