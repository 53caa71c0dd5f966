//! YouTube Data API v3 client: OAuth refresh, resumable upload, thumbnails.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, LOCATION, RANGE};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, info};

use super::transfer::{report_progress, ProgressReporter, ProgressTracker, RESUMABLE_PROGRESS_STEP};
use super::{BaseCredentialsProvider, BaseVideoPlatform, VideoMetadata};
use crate::config::ChannelCredentials;

/// Resumable chunk size; must be a multiple of 256 KiB.
const UPLOAD_CHUNK_SIZE: usize = 32 * 256 * 1024;

/// Consecutive 308 replies that may leave the offset unchanged before giving up.
const MAX_STALLED_CHUNKS: u32 = 3;

const TOKEN_TIMEOUT: Duration = Duration::from_secs(30);
const CHUNK_TIMEOUT: Duration = Duration::from_secs(900);
const METADATA_TIMEOUT: Duration = Duration::from_secs(120);

fn preview(body: &str, limit: usize) -> String {
    body.chars().take(limit).collect()
}

// =============================================================================
// OAuth
// =============================================================================

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Refresh-token grant against Google's token endpoint, one credential set per channel.
pub struct GoogleOAuthProvider {
    client: Client,
    token_uri: String,
    channels: HashMap<String, ChannelCredentials>,
}

impl GoogleOAuthProvider {
    pub fn new(token_uri: impl Into<String>, channels: HashMap<String, ChannelCredentials>) -> Self {
        Self {
            client: Client::new(),
            token_uri: token_uri.into(),
            channels,
        }
    }
}

#[async_trait]
impl BaseCredentialsProvider for GoogleOAuthProvider {
    async fn access_token(&self, channel: &str) -> Result<String> {
        let creds = self
            .channels
            .get(channel)
            .with_context(|| format!("No OAuth credentials configured for channel {channel}"))?;

        let response = self
            .client
            .post(&self.token_uri)
            .timeout(TOKEN_TIMEOUT)
            .form(&[
                ("client_id", creds.client_id.as_str()),
                ("client_secret", creds.client_secret.as_str()),
                ("refresh_token", creds.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .context("Failed to send OAuth refresh request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("OAuth refresh failed for {} ({}): {}", channel, status, preview(&body, 500));
        }

        let token: TokenResponse = response
            .json()
            .await
            .context("Failed to parse OAuth token response")?;

        debug!(channel, "OAuth access token refreshed");
        Ok(token.access_token)
    }
}

// =============================================================================
// Videos
// =============================================================================

#[derive(Debug, Deserialize)]
struct VideoResource {
    id: String,
}

pub struct YoutubeClient {
    client: Client,
    upload_base: String,
    reporter: Arc<dyn ProgressReporter>,
}

impl YoutubeClient {
    pub fn new(reporter: Arc<dyn ProgressReporter>) -> Self {
        Self {
            client: Client::new(),
            upload_base: "https://www.googleapis.com/upload/youtube/v3".to_string(),
            reporter,
        }
    }

    /// Set a custom upload base URL (proxies, test servers).
    pub fn with_upload_base(mut self, url: impl Into<String>) -> Self {
        self.upload_base = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Open a resumable session; returns the session URI.
    async fn start_session(
        &self,
        access_token: &str,
        total: u64,
        metadata: &VideoMetadata,
    ) -> Result<String> {
        let mut status = json!({
            "privacyStatus": metadata.privacy_status,
            "madeForKids": metadata.made_for_kids,
        });
        if let Some(publish_at) = &metadata.publish_at {
            status["publishAt"] = json!(publish_at);
        }
        let body = json!({
            "snippet": {
                "title": metadata.title,
                "description": metadata.description,
                "tags": metadata.tags,
            },
            "status": status,
        });

        let response = self
            .client
            .post(format!("{}/videos", self.upload_base))
            .query(&[("uploadType", "resumable"), ("part", "snippet,status")])
            .header(AUTHORIZATION, format!("Bearer {access_token}"))
            .header("X-Upload-Content-Type", "video/*")
            .header("X-Upload-Content-Length", total.to_string())
            .timeout(METADATA_TIMEOUT)
            .json(&body)
            .send()
            .await
            .context("Failed to start resumable upload session")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("YouTube upload session rejected {}: {}", status, preview(&body, 800));
        }

        response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .context("YouTube upload session response had no Location header")
    }
}

/// Parse the `Range: bytes=0-N` header of a 308 into the next offset.
fn next_offset_from_range(range: Option<&str>) -> u64 {
    range
        .and_then(|r| r.strip_prefix("bytes="))
        .and_then(|r| r.split('-').nth(1))
        .and_then(|end| end.parse::<u64>().ok())
        .map(|end| end + 1)
        .unwrap_or(0)
}

/// Resume position after a 308, given the offset the chunk was sent from.
/// Fails when the server claims bytes past the end or keeps making no progress.
fn resume_offset(offset: u64, range: Option<&str>, total: u64, stalls: &mut u32) -> Result<u64> {
    let next = next_offset_from_range(range);
    if next >= total {
        anyhow::bail!("YouTube acknowledged {next} of {total} bytes but did not finish the upload");
    }
    if next > offset {
        *stalls = 0;
    } else {
        *stalls += 1;
        if *stalls > MAX_STALLED_CHUNKS {
            anyhow::bail!("YouTube upload stalled at byte {next} of {total}");
        }
    }
    Ok(next)
}

#[async_trait]
impl BaseVideoPlatform for YoutubeClient {
    async fn upload_video(
        &self,
        access_token: &str,
        file: &Path,
        metadata: &VideoMetadata,
    ) -> Result<String> {
        let mut source = tokio::fs::File::open(file)
            .await
            .with_context(|| format!("Failed to open {}", file.display()))?;
        let total = source.metadata().await?.len();
        if total == 0 {
            anyhow::bail!("Source media {} is empty", file.display());
        }

        let session = self.start_session(access_token, total, metadata).await?;
        info!(bytes = total, "YouTube resumable session opened");

        let mut tracker = ProgressTracker::new(Some(total), RESUMABLE_PROGRESS_STEP);
        let mut offset = 0u64;
        let mut stalls = 0u32;
        let mut buf = vec![0u8; UPLOAD_CHUNK_SIZE];

        loop {
            let want = UPLOAD_CHUNK_SIZE.min((total - offset) as usize);
            source.seek(std::io::SeekFrom::Start(offset)).await?;
            source
                .read_exact(&mut buf[..want])
                .await
                .with_context(|| format!("Failed to read {} at {}", file.display(), offset))?;
            let end = offset + want as u64 - 1;

            let response = self
                .client
                .put(&session)
                .header(AUTHORIZATION, format!("Bearer {access_token}"))
                .header(CONTENT_LENGTH, want.to_string())
                .header(CONTENT_RANGE, format!("bytes {offset}-{end}/{total}"))
                .timeout(CHUNK_TIMEOUT)
                .body(buf[..want].to_vec())
                .send()
                .await
                .context("YouTube chunk upload failed")?;

            match response.status() {
                StatusCode::OK | StatusCode::CREATED => {
                    if let Some(percent) = tracker.set_done(total) {
                        report_progress(self.reporter.as_ref(), "upload", percent);
                    }
                    let video: VideoResource = response
                        .json()
                        .await
                        .context("Failed to parse YouTube video resource")?;
                    return Ok(video.id);
                }
                StatusCode::PERMANENT_REDIRECT => {
                    let range = response.headers().get(RANGE).and_then(|v| v.to_str().ok());
                    offset = resume_offset(offset, range, total, &mut stalls)?;
                    if let Some(percent) = tracker.set_done(offset) {
                        report_progress(self.reporter.as_ref(), "upload", percent);
                    }
                }
                status => {
                    let body = response.text().await.unwrap_or_default();
                    anyhow::bail!("YouTube chunk rejected {}: {}", status, preview(&body, 800));
                }
            }
        }
    }

    async fn set_thumbnail(&self, access_token: &str, video_id: &str, image: &Path) -> Result<()> {
        let data = tokio::fs::read(image)
            .await
            .with_context(|| format!("Failed to read thumbnail {}", image.display()))?;

        let response = self
            .client
            .post(format!("{}/thumbnails/set", self.upload_base))
            .query(&[("videoId", video_id), ("uploadType", "media")])
            .header(AUTHORIZATION, format!("Bearer {access_token}"))
            .header(CONTENT_TYPE, "image/jpeg")
            .timeout(METADATA_TIMEOUT)
            .body(data)
            .send()
            .await
            .context("Failed to send thumbnail")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Thumbnail rejected {}: {}", status, preview(&body, 500));
        }
        Ok(())
    }
}
