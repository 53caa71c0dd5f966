//! WordPress domain actions - admission and status lookup.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use uuid::Uuid;

use super::images;
use super::models::{ImageUploadJob, WordPressUploadJob};
use super::pipeline;
use crate::kernel::jobs::{now_utc_iso, JobDomain, JobHandle, JobPatch, JobRecord, JobState};
use crate::kernel::ServerDeps;

pub struct WordPressAdmission {
    pub job_id: String,
    pub handle: JobHandle,
}

/// Record the job as `processing` and start the pipeline in the background.
pub async fn admit_upload(job: WordPressUploadJob, deps: Arc<ServerDeps>) -> Result<WordPressAdmission> {
    let job_id = Uuid::new_v4().to_string();

    deps.wordpress_jobs
        .patch(
            &job_id,
            JobPatch::new()
                .state(JobState::Processing)
                .set("job_id", job_id.as_str())
                .set_opt("title", job.title.clone())
                .set_opt("location_raw", job.location.clone())
                .set("started_at", now_utc_iso()),
        )
        .await?;

    info!(job_id = %job_id, "received WP job");

    let ctx = deps
        .executor
        .context(&job_id, JobDomain::Wordpress, Some(deps.wordpress_jobs.clone()));
    let pipeline_deps = deps.clone();
    let handle = deps
        .executor
        .spawn(ctx, move |ctx| pipeline::run(ctx, pipeline_deps, job));

    Ok(WordPressAdmission { job_id, handle })
}

/// Start an image upload. Image jobs keep no status record.
pub fn admit_image_upload(job: ImageUploadJob, deps: Arc<ServerDeps>) -> WordPressAdmission {
    let job_id = Uuid::new_v4().to_string();
    info!(job_id = %job_id, "received WP image job");

    let ctx = deps.executor.context(&job_id, JobDomain::WordpressImage, None);
    let pipeline_deps = deps.clone();
    let handle = deps
        .executor
        .spawn(ctx, move |ctx| images::run(ctx, pipeline_deps, job));

    WordPressAdmission { job_id, handle }
}

pub async fn get_status(job_id: &str, deps: &ServerDeps) -> Option<JobRecord> {
    deps.wordpress_jobs.get(job_id).await
}
