//! Job infrastructure for background media transfers.
//!
//! - [`JobStore`] - durable per-domain status document
//! - [`JobRecord`] / [`JobPatch`] - record model and merge rules
//! - [`JobExecutor`] - spawns pipelines, records failures, cleans temp files
//! - [`JobContext`] - per-job identity, span, status sink, temp artifacts
//!
//! Pipelines live in their domains; this module only runs them.

mod context;
mod job_store;
mod record;
mod runner;
pub mod testing;

pub use context::{marker_for, JobContext};
pub use job_store::{JobMap, JobStore};
pub use record::{now_utc_iso, JobDomain, JobPatch, JobRecord, JobState, PatchEffect};
pub use runner::{JobExecutor, JobHandle, JobOutcome};
