//! Job executor: one detached tokio task per admitted job.
//!
//! ```text
//! admission ──► JobExecutor::spawn(ctx, pipeline)
//!                   │
//!                   └─► supervisor task
//!                           ├─► inner task: pipeline(ctx)   (instrumented with the job span)
//!                           ├─► Err / panic ──► patch state=error, finished_at
//!                           └─► ctx.cleanup()               (always)
//! ```
//!
//! The pipeline owns its success patch (a WordPress 504 must leave the record
//! `processing`), the executor owns the failure patch.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::task::JoinHandle;
use tracing::{error, info, Instrument};

use super::context::JobContext;
use super::job_store::JobStore;
use super::record::{now_utc_iso, JobDomain, JobPatch, JobState};

/// How a job task ended, as seen by the supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Finished,
    Failed(String),
    Panicked(String),
}

/// Observable handle to a spawned job. Dropping it detaches the job.
pub struct JobHandle {
    job_id: String,
    inner: JoinHandle<JobOutcome>,
}

impl JobHandle {
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }

    /// Wait for the supervisor. The supervisor itself never panics.
    pub async fn join(self) -> JobOutcome {
        match self.inner.await {
            Ok(outcome) => outcome,
            Err(e) => JobOutcome::Panicked(e.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct JobExecutor {
    temp_dir: PathBuf,
}

impl JobExecutor {
    pub fn new(temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            temp_dir: temp_dir.into(),
        }
    }

    pub fn temp_dir(&self) -> &PathBuf {
        &self.temp_dir
    }

    pub fn context(
        &self,
        job_id: impl Into<String>,
        domain: JobDomain,
        store: Option<Arc<JobStore>>,
    ) -> JobContext {
        JobContext::new(job_id, domain, store, self.temp_dir.clone())
    }

    /// Run `pipeline` in the background. Fatal errors and panics end as a
    /// terminal `error` record; temp artifacts are removed on every path.
    pub fn spawn<F, Fut>(&self, ctx: JobContext, pipeline: F) -> JobHandle
    where
        F: FnOnce(JobContext) -> Fut,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let job_id = ctx.job_id().to_string();
        let span = ctx.span().clone();
        let work = pipeline(ctx.clone()).instrument(span.clone());

        let supervisor = async move {
            info!("job started");
            let inner = tokio::spawn(work);

            let outcome = match inner.await {
                Ok(Ok(())) => {
                    info!("job finished");
                    JobOutcome::Finished
                }
                Ok(Err(e)) => {
                    let message = format!("{e:#}");
                    error!(error = %message, "job failed");
                    JobOutcome::Failed(message)
                }
                Err(join_error) => {
                    let message = panic_message(join_error);
                    error!(error = %message, "job panicked");
                    JobOutcome::Panicked(message)
                }
            };

            if let JobOutcome::Failed(message) | JobOutcome::Panicked(message) = &outcome {
                let patch = JobPatch::new()
                    .state(JobState::Error)
                    .set("error", message.as_str())
                    .set("finished_at", now_utc_iso());
                if let Err(e) = ctx.record(patch).await {
                    error!(error = %e, "failed to record error state");
                }
            }

            ctx.cleanup().await;
            outcome
        }
        .instrument(span);

        JobHandle {
            job_id,
            inner: tokio::spawn(supervisor),
        }
    }
}

fn panic_message(join_error: tokio::task::JoinError) -> String {
    if join_error.is_cancelled() {
        return "job task was cancelled".to_string();
    }
    let payload = join_error.into_panic();
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panic: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panic: {s}")
    } else {
        "panic: <non-string payload>".to_string()
    }
}
