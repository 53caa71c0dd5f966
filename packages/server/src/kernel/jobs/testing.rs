//! Job testing utilities.
//!
//! Jobs run detached, so tests poll the status store until the record
//! reaches the state they expect.

use std::time::Duration;

use anyhow::{bail, Result};

use super::{JobRecord, JobState, JobStore};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Poll `store` until `job_id` is in `state`, or fail after `timeout`.
pub async fn wait_for_state(
    store: &JobStore,
    job_id: &str,
    state: JobState,
    timeout: Duration,
) -> Result<JobRecord> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let record = store.get(job_id).await;
        if let Some(record) = &record {
            if record.state == state {
                return Ok(record.clone());
            }
        }
        if tokio::time::Instant::now() >= deadline {
            bail!(
                "job {} did not reach {} within {:?} (last seen: {:?})",
                job_id,
                state,
                timeout,
                record.map(|r| r.state)
            );
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Poll until `job_id` is terminal (completed or error).
pub async fn wait_for_terminal(store: &JobStore, job_id: &str, timeout: Duration) -> Result<JobRecord> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if let Some(record) = store.get(job_id).await {
            if record.state.is_terminal() {
                return Ok(record);
            }
        }
        if tokio::time::Instant::now() >= deadline {
            bail!("job {} did not finish within {:?}", job_id, timeout);
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}
