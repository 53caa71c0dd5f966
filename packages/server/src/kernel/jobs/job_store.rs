//! File-backed status store.
//!
//! Each domain owns one JSON document mapping job id → [`JobRecord`]. Every
//! `patch` is a read-modify-write of the whole document. Writes go to a
//! sibling `.tmp` file, are synced, then renamed over the document, so a
//! reader never sees a half-written file.
//!
//! Patches within one store are serialized by an async mutex: two jobs that
//! finish at the same instant cannot lose each other's update.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::record::{JobDomain, JobPatch, JobRecord, PatchEffect};

pub type JobMap = HashMap<String, JobRecord>;

pub struct JobStore {
    domain: JobDomain,
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JobStore {
    /// Store for `domain` inside `dir`. Nothing touches the disk until the first write.
    pub fn new(dir: impl AsRef<Path>, domain: JobDomain) -> Result<Self> {
        let file = domain
            .status_file()
            .with_context(|| format!("domain {domain} keeps no status records"))?;

        Ok(Self {
            domain,
            path: dir.as_ref().join(file),
            write_lock: Mutex::new(()),
        })
    }

    pub fn domain(&self) -> JobDomain {
        self.domain
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the whole document. Missing or malformed degrades to an empty map.
    pub async fn read_all(&self) -> JobMap {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return JobMap::new(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "status document unreadable; treating as empty");
                return JobMap::new();
            }
        };

        match serde_json::from_slice(&raw) {
            Ok(jobs) => jobs,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "status document malformed; treating as empty");
                JobMap::new()
            }
        }
    }

    pub async fn get(&self, job_id: &str) -> Option<JobRecord> {
        self.read_all().await.remove(job_id)
    }

    /// Merge `patch` into the record for `job_id` and persist the document.
    ///
    /// Returns the merged record. A state change on a terminal record is
    /// dropped (other attributes still land).
    pub async fn patch(&self, job_id: &str, patch: JobPatch) -> Result<JobRecord> {
        let _guard = self.write_lock.lock().await;

        let mut jobs = self.read_all().await;
        let record = jobs.entry(job_id.to_string()).or_default();

        if let PatchEffect::StateRejected { kept, attempted } = record.apply(patch) {
            warn!(
                domain = %self.domain,
                job_id = %job_id,
                kept = %kept,
                attempted = %attempted,
                "refusing to move terminal job to a new state"
            );
        }
        let merged = record.clone();

        self.write_document(&jobs).await?;
        debug!(domain = %self.domain, job_id = %job_id, state = %merged.state, "status patched");

        Ok(merged)
    }

    async fn write_document(&self, jobs: &JobMap) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                tokio::fs::create_dir_all(dir)
                    .await
                    .with_context(|| format!("Failed to create status dir {}", dir.display()))?;
            }
        }

        let json = serde_json::to_vec(jobs).context("Failed to serialize status document")?;
        let tmp = self.path.with_extension("json.tmp");

        let mut file = tokio::fs::File::create(&tmp)
            .await
            .with_context(|| format!("Failed to create {}", tmp.display()))?;
        file.write_all(&json)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        file.flush().await?;
        file.sync_all()
            .await
            .with_context(|| format!("Failed to sync {}", tmp.display()))?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::jobs::JobState;
    use serde_json::json;
    use std::sync::Arc;

    fn store(dir: &tempfile::TempDir) -> JobStore {
        JobStore::new(dir.path(), JobDomain::Youtube).unwrap()
    }

    #[tokio::test]
    async fn test_missing_document_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);

        assert!(store.read_all().await.is_empty());
        assert!(store.get("nope").await.is_none());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_corrupt_document_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        std::fs::write(store.path(), b"{not json").unwrap();

        assert!(store.read_all().await.is_empty());
    }

    #[tokio::test]
    async fn test_patch_creates_and_merges() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);

        store
            .patch("job-1", JobPatch::new().state(JobState::Processing).set("title", "T"))
            .await
            .unwrap();
        let merged = store
            .patch("job-1", JobPatch::new().set("channel", "UK"))
            .await
            .unwrap();

        assert_eq!(merged.state, JobState::Processing);
        assert_eq!(merged.get_str("title"), Some("T"));
        assert_eq!(merged.get_str("channel"), Some("UK"));

        // survives a fresh handle on the same directory
        let reopened = JobStore::new(dir.path(), JobDomain::Youtube).unwrap();
        assert_eq!(reopened.get("job-1").await, Some(merged));
    }

    #[tokio::test]
    async fn test_terminal_state_survives_later_patch() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);

        store
            .patch("job-1", JobPatch::new().state(JobState::Completed).set("youtube_url", "https://youtu.be/x"))
            .await
            .unwrap();
        let after = store
            .patch("job-1", JobPatch::new().state(JobState::Processing).set("note", "late"))
            .await
            .unwrap();

        assert_eq!(after.state, JobState::Completed);
        assert_eq!(after.get_str("note"), Some("late"));
        assert_eq!(after.get_str("youtube_url"), Some("https://youtu.be/x"));
    }

    #[tokio::test]
    async fn test_concurrent_patches_do_not_lose_updates() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(store(&dir));

        let mut handles = Vec::new();
        for i in 0..32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .patch(&format!("job-{i}"), JobPatch::new().state(JobState::Completed).set("n", i))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let jobs = store.read_all().await;
        assert_eq!(jobs.len(), 32);
        assert_eq!(jobs["job-7"].get("n"), Some(&json!(7)));
    }

    #[tokio::test]
    async fn test_document_is_plain_json_map() {
        let dir = tempfile::tempdir().unwrap();
        let store = JobStore::new(dir.path(), JobDomain::Wordpress).unwrap();
        store
            .patch("abc", JobPatch::new().state(JobState::Processing))
            .await
            .unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(dir.path().join("wp_status.json")).unwrap()).unwrap();
        assert_eq!(raw, json!({"abc": {"state": "processing"}}));
    }

    #[test]
    fn test_image_domain_has_no_store() {
        let dir = tempfile::tempdir().unwrap();
        assert!(JobStore::new(dir.path(), JobDomain::WordpressImage).is_err());
    }
}
