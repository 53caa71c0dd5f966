//! Streaming transfer primitive.
//!
//! Downloads go straight from the response byte stream to disk through a
//! 1 MiB buffered writer; the payload is never held in memory. Progress is
//! reported at coarse percentage checkpoints so multi-minute transfers prove
//! liveness in logs without flooding them.
//!
//! Uploads use [`ProgressStream`], a decorator over any byte stream that
//! counts bytes as the HTTP client pulls them.

use std::io;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use pin_project_lite::pin_project;
use thiserror::Error;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::io::ReaderStream;
use tracing::{info, warn};

/// Read/write chunk size for transfers.
pub const CHUNK_SIZE: usize = 1_048_576;

/// Percentage step for downloads and multipart uploads.
pub const DEFAULT_PROGRESS_STEP: u8 = 10;

/// Percentage step for resumable uploads.
pub const RESUMABLE_PROGRESS_STEP: u8 = 5;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl TransferError {
    fn io(path: &Path, source: io::Error) -> Self {
        TransferError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

// =============================================================================
// Progress reporting
// =============================================================================

/// Side-effect-only sink for progress checkpoints.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, label: &str, percent: u8);
}

/// Logs `"<label> <pct>%"` at info level. Lines land in the caller's span,
/// so the job id is attached automatically.
pub struct TracingProgress;

impl ProgressReporter for TracingProgress {
    fn report(&self, label: &str, percent: u8) {
        info!(percent, "{label} {percent}%");
    }
}

/// Report without letting a misbehaving reporter abort the transfer.
pub fn report_progress(reporter: &dyn ProgressReporter, label: &str, percent: u8) {
    if catch_unwind(AssertUnwindSafe(|| reporter.report(label, percent))).is_err() {
        warn!(label, percent, "progress reporter panicked; ignoring");
    }
}

/// Turns byte counts into percentage checkpoints on multiples of `step`.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total: Option<u64>,
    done: u64,
    step: u8,
    next_percent: u32,
}

impl ProgressTracker {
    /// `total` of `None` (or zero) means no percentages are ever reported.
    pub fn new(total: Option<u64>, step: u8) -> Self {
        Self {
            total: total.filter(|t| *t > 0),
            done: 0,
            step: step.max(1),
            next_percent: step.max(1) as u32,
        }
    }

    pub fn done(&self) -> u64 {
        self.done
    }

    /// Record `n` more bytes; returns a percentage when a checkpoint is crossed.
    pub fn advance(&mut self, n: u64) -> Option<u8> {
        self.done += n;
        self.set_done(self.done)
    }

    /// Record an absolute position (resumable uploads learn it from the server).
    pub fn set_done(&mut self, done: u64) -> Option<u8> {
        self.done = done;
        let total = self.total?;
        let percent = ((self.done.min(total) * 100) / total) as u32;
        if percent < self.next_percent {
            return None;
        }
        let step = self.step as u32;
        let checkpoint = percent / step * step;
        self.next_percent = checkpoint + step;
        Some(checkpoint as u8)
    }
}

// =============================================================================
// Download
// =============================================================================

/// Stream `source_url` into `destination`, reporting progress under `label`.
///
/// Returns the number of bytes written.
pub async fn stream_download(
    client: &reqwest::Client,
    source_url: &str,
    destination: &Path,
    label: &str,
    reporter: &dyn ProgressReporter,
) -> Result<u64, TransferError> {
    let response = client.get(source_url).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(TransferError::Status {
            status: status.as_u16(),
            url: source_url.to_string(),
        });
    }

    let mut tracker = ProgressTracker::new(response.content_length(), DEFAULT_PROGRESS_STEP);

    let file = tokio::fs::File::create(destination)
        .await
        .map_err(|e| TransferError::io(destination, e))?;
    let mut writer = BufWriter::with_capacity(CHUNK_SIZE, file);

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if chunk.is_empty() {
            continue;
        }
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| TransferError::io(destination, e))?;
        if let Some(percent) = tracker.advance(chunk.len() as u64) {
            report_progress(reporter, &format!("{label} download"), percent);
        }
    }

    writer
        .flush()
        .await
        .map_err(|e| TransferError::io(destination, e))?;

    info!(bytes = tracker.done(), path = %destination.display(), "{label} download complete");
    Ok(tracker.done())
}

// =============================================================================
// Upload body
// =============================================================================

pin_project! {
    /// Byte stream decorator that reports how much of the body has been sent.
    pub struct ProgressStream<S> {
        #[pin]
        inner: S,
        tracker: ProgressTracker,
        label: String,
        reporter: Arc<dyn ProgressReporter>,
    }
}

impl<S> ProgressStream<S> {
    pub fn new(
        inner: S,
        total: u64,
        step: u8,
        label: impl Into<String>,
        reporter: Arc<dyn ProgressReporter>,
    ) -> Self {
        Self {
            inner,
            tracker: ProgressTracker::new(Some(total), step),
            label: label.into(),
            reporter,
        }
    }
}

impl<S> Stream for ProgressStream<S>
where
    S: Stream<Item = io::Result<Bytes>>,
{
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        let polled = this.inner.poll_next(cx);
        if let Poll::Ready(Some(Ok(bytes))) = &polled {
            if let Some(percent) = this.tracker.advance(bytes.len() as u64) {
                report_progress(this.reporter.as_ref(), this.label, percent);
            }
        }
        polled
    }
}

/// Open `path` as a chunked byte stream. Returns the stream and the file length.
pub async fn file_body_stream(
    path: &Path,
) -> Result<(ReaderStream<tokio::fs::File>, u64), TransferError> {
    let file = tokio::fs::File::open(path)
        .await
        .map_err(|e| TransferError::io(path, e))?;
    let len = file
        .metadata()
        .await
        .map_err(|e| TransferError::io(path, e))?
        .len();
    Ok((ReaderStream::with_capacity(file, CHUNK_SIZE), len))
}

/// File body for an HTTP request, reporting progress lines as `label`.
pub async fn progress_body(
    path: &Path,
    label: &str,
    reporter: Arc<dyn ProgressReporter>,
) -> Result<(reqwest::Body, u64), TransferError> {
    let (stream, len) = file_body_stream(path).await?;
    let stream = ProgressStream::new(stream, len, DEFAULT_PROGRESS_STEP, label, reporter);
    Ok((reqwest::Body::wrap_stream(stream), len))
}
