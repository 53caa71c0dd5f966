//! Per-job execution context handed to pipelines.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use tracing::{debug, info_span, warn, Span};

use super::job_store::JobStore;
use super::record::{JobDomain, JobPatch, JobRecord};

/// Everything a running job needs besides its collaborators: identity, the
/// log span, the status sink and the temp files it must leave behind clean.
#[derive(Clone)]
pub struct JobContext {
    job_id: String,
    domain: JobDomain,
    span: Span,
    store: Option<Arc<JobStore>>,
    temp_dir: PathBuf,
    artifacts: Arc<Mutex<Vec<PathBuf>>>,
}

impl JobContext {
    pub fn new(
        job_id: impl Into<String>,
        domain: JobDomain,
        store: Option<Arc<JobStore>>,
        temp_dir: impl Into<PathBuf>,
    ) -> Self {
        let job_id = job_id.into();
        let span = info_span!("job", domain = domain.as_str(), id = %short_id(&job_id));
        Self {
            job_id,
            domain,
            span,
            store,
            temp_dir: temp_dir.into(),
            artifacts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn domain(&self) -> JobDomain {
        self.domain
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    /// `job:<id>`, the tag written into remote metadata.
    pub fn marker(&self) -> String {
        marker_for(&self.job_id)
    }

    /// Patch this job's record. Jobs without a store (image uploads) log only.
    pub async fn record(&self, patch: JobPatch) -> Result<Option<JobRecord>> {
        match &self.store {
            Some(store) => store.patch(&self.job_id, patch).await.map(Some),
            None => {
                debug!(job_id = %self.job_id, "no status store for domain; patch dropped");
                Ok(None)
            }
        }
    }

    /// Reserve `<prefix>_<job_id><ext>` in the temp dir and register it for cleanup.
    pub fn temp_path(&self, prefix: &str, ext: &str) -> PathBuf {
        let path = self
            .temp_dir
            .join(format!("{prefix}_{}{ext}", self.job_id));
        self.register_artifact(&path);
        path
    }

    pub fn register_artifact(&self, path: &Path) {
        let mut artifacts = self.artifacts.lock().unwrap_or_else(|e| e.into_inner());
        if !artifacts.iter().any(|p| p == path) {
            artifacts.push(path.to_path_buf());
        }
    }

    pub fn artifacts(&self) -> Vec<PathBuf> {
        self.artifacts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Remove every registered temp file. Missing files are fine.
    pub async fn cleanup(&self) {
        for path in self.artifacts() {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!(path = %path.display(), "removed temp file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "could not remove temp file"),
            }
        }
    }
}

pub fn marker_for(job_id: &str) -> String {
    format!("job:{job_id}")
}

fn short_id(job_id: &str) -> &str {
    job_id.get(..8).unwrap_or(job_id)
}
