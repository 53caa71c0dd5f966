//! YouTube domain actions - admission and status lookup.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use uuid::Uuid;

use super::models::YoutubeUploadJob;
use super::pipeline;
use crate::kernel::jobs::{now_utc_iso, JobDomain, JobHandle, JobPatch, JobRecord, JobState};
use crate::kernel::ServerDeps;

pub struct YoutubeAdmission {
    pub job_id: String,
    pub channel: String,
    pub handle: JobHandle,
}

/// Record the job as `processing` and start the pipeline in the background.
pub async fn admit_upload(job: YoutubeUploadJob, deps: Arc<ServerDeps>) -> Result<YoutubeAdmission> {
    let job_id = Uuid::new_v4().to_string();
    let channel = job.channel.clone();

    deps.youtube_jobs
        .patch(
            &job_id,
            JobPatch::new()
                .state(JobState::Processing)
                .set("job_id", job_id.as_str())
                .set("channel", channel.as_str())
                .set("title", job.title.as_str())
                .set("location_raw", job.location.as_str())
                .set("started_at", now_utc_iso()),
        )
        .await?;

    info!(job_id = %job_id, channel = %channel, "received YT job");

    let ctx = deps
        .executor
        .context(&job_id, JobDomain::Youtube, Some(deps.youtube_jobs.clone()));
    let pipeline_deps = deps.clone();
    let handle = deps
        .executor
        .spawn(ctx, move |ctx| pipeline::run(ctx, pipeline_deps, job));

    Ok(YoutubeAdmission {
        job_id,
        channel,
        handle,
    })
}

pub async fn get_status(job_id: &str, deps: &ServerDeps) -> Option<JobRecord> {
    deps.youtube_jobs.get(job_id).await
}
