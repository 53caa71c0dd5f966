//! WordPress REST (`/wp-json/wp/v2`) media client using application passwords.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::CONTENT_DISPOSITION;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use tracing::{error, info, warn};

use super::transfer::{progress_body, ProgressReporter};
use super::{BaseMediaLibrary, MediaItem, MediaPatch, MediaUpload, MediaUploadOutcome};
use crate::config::WordPressConfig;

const UPLOAD_TIMEOUT: Duration = Duration::from_secs(900);
const METADATA_TIMEOUT: Duration = Duration::from_secs(120);
const LISTING_TIMEOUT: Duration = Duration::from_secs(60);
/// WordPress caps `per_page` at 100.
const MAX_PAGE_SIZE: usize = 100;

pub struct WordPressClient {
    client: Client,
    config: WordPressConfig,
    reporter: Arc<dyn ProgressReporter>,
}

impl WordPressClient {
    pub fn new(config: WordPressConfig, reporter: Arc<dyn ProgressReporter>) -> Self {
        Self {
            client: Client::new(),
            config,
            reporter,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_base.trim_end_matches('/'), path)
    }

    fn upload_form(part: Part, upload: &MediaUpload) -> Form {
        let mut form = Form::new().part("file", part);
        if let Some(title) = &upload.title {
            form = form.text("title", title.clone());
        }
        if let Some(alt_text) = &upload.alt_text {
            form = form.text("alt_text", alt_text.clone());
        }
        if let Some(description) = &upload.description {
            form = form.text("description", description.clone());
        }
        form
    }

    async fn post_media(&self, form: Form, filename: &str) -> Result<MediaUploadOutcome> {
        let endpoint = self.endpoint("media");
        info!(endpoint = %endpoint, "POST media");

        let response = self
            .client
            .post(&endpoint)
            .basic_auth(&self.config.user, Some(&self.config.app_password))
            .header(CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\""))
            .timeout(UPLOAD_TIMEOUT)
            .multipart(form)
            .send()
            .await
            .context("WordPress media upload request failed")?;

        let status = response.status();
        info!(status = status.as_u16(), "media upload response");

        if status == StatusCode::GATEWAY_TIMEOUT {
            warn!("media upload hit a gateway timeout; outcome unverified");
            return Ok(MediaUploadOutcome::Unverified {
                status: status.as_u16(),
            });
        }

        if !status.is_success() {
            let body = body_preview(response, 1200).await;
            error!(status = status.as_u16(), body = %body, "media upload failed");
            anyhow::bail!("WordPress media upload failed {}: {}", status, body);
        }

        let item: MediaItem = response
            .json()
            .await
            .context("Failed to parse WordPress media response")?;
        Ok(MediaUploadOutcome::Created(item))
    }

    async fn list_media(&self, query: &[(&str, String)]) -> Result<Vec<MediaItem>> {
        let response = self
            .client
            .get(self.endpoint("media"))
            .basic_auth(&self.config.user, Some(&self.config.app_password))
            .query(query)
            .timeout(LISTING_TIMEOUT)
            .send()
            .await
            .context("WordPress media listing request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = body_preview(response, 500).await;
            anyhow::bail!("WordPress media listing failed {}: {}", status, body);
        }

        response
            .json()
            .await
            .context("Failed to parse WordPress media listing")
    }
}

/// First `limit` chars of a response body, for logs and error messages.
async fn body_preview(response: Response, limit: usize) -> String {
    response
        .text()
        .await
        .unwrap_or_default()
        .chars()
        .take(limit)
        .collect()
}

#[async_trait]
impl BaseMediaLibrary for WordPressClient {
    async fn verify_credentials(&self) -> Result<()> {
        let response = self
            .client
            .get(self.endpoint("users/me"))
            .basic_auth(&self.config.user, Some(&self.config.app_password))
            .timeout(METADATA_TIMEOUT)
            .send()
            .await
            .context("WordPress credential check failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = body_preview(response, 300).await;
            anyhow::bail!("WordPress rejected credentials {}: {}", status, body);
        }
        Ok(())
    }

    async fn upload_media(&self, file: &Path, upload: &MediaUpload) -> Result<MediaUploadOutcome> {
        let (body, len) = progress_body(file, "upload", self.reporter.clone()).await?;
        let part = Part::stream_with_length(body, len)
            .file_name(upload.filename.clone())
            .mime_str(&upload.mime_type)
            .context("Invalid media MIME type")?;

        self.post_media(Self::upload_form(part, upload), &upload.filename)
            .await
    }

    async fn upload_media_bytes(&self, data: Vec<u8>, upload: &MediaUpload) -> Result<MediaUploadOutcome> {
        let part = Part::bytes(data)
            .file_name(upload.filename.clone())
            .mime_str(&upload.mime_type)
            .context("Invalid media MIME type")?;

        self.post_media(Self::upload_form(part, upload), &upload.filename)
            .await
    }

    async fn update_media(&self, id: u64, patch: &MediaPatch) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint(&format!("media/{id}")))
            .basic_auth(&self.config.user, Some(&self.config.app_password))
            .timeout(METADATA_TIMEOUT)
            .json(patch)
            .send()
            .await
            .context("WordPress metadata update request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = body_preview(response, 800).await;
            anyhow::bail!("WordPress metadata update failed {}: {}", status, body);
        }
        Ok(())
    }

    async fn search_media(&self, query: &str, per_page: u32) -> Result<Vec<MediaItem>> {
        self.list_media(&[
            ("search", query.to_string()),
            ("per_page", per_page.to_string()),
            ("orderby", "date".to_string()),
            ("order", "desc".to_string()),
        ])
        .await
    }

    async fn recent_media(&self, limit: u32) -> Result<Vec<MediaItem>> {
        let limit = limit.max(1) as usize;
        // `page` offsets by `per_page`, so it must not change between requests
        let page_size = limit.min(MAX_PAGE_SIZE);
        let mut items = Vec::with_capacity(limit);
        let mut page = 1u32;

        while items.len() < limit {
            let batch = self
                .list_media(&[
                    ("per_page", page_size.to_string()),
                    ("page", page.to_string()),
                    ("orderby", "date".to_string()),
                    ("order", "desc".to_string()),
                ])
                .await?;
            let short = batch.len() < page_size;
            items.extend(batch);
            if short {
                break;
            }
            page += 1;
        }

        items.truncate(limit);
        Ok(items)
    }
}

/// Stand-in used when `WP_API_BASE` is not set: every call fails, so
/// WordPress jobs end in a clear `error` record instead of never starting.
pub struct UnconfiguredMediaLibrary;

impl UnconfiguredMediaLibrary {
    fn missing<T>() -> Result<T> {
        anyhow::bail!("WordPress is not configured (missing WP_API_BASE, WP_USER or WP_APP_PASSWORD)")
    }
}

#[async_trait]
impl BaseMediaLibrary for UnconfiguredMediaLibrary {
    async fn verify_credentials(&self) -> Result<()> {
        Self::missing()
    }

    async fn upload_media(&self, _file: &Path, _upload: &MediaUpload) -> Result<MediaUploadOutcome> {
        Self::missing()
    }

    async fn upload_media_bytes(&self, _data: Vec<u8>, _upload: &MediaUpload) -> Result<MediaUploadOutcome> {
        Self::missing()
    }

    async fn update_media(&self, _id: u64, _patch: &MediaPatch) -> Result<()> {
        Self::missing()
    }

    async fn search_media(&self, _query: &str, _per_page: u32) -> Result<Vec<MediaItem>> {
        Self::missing()
    }

    async fn recent_media(&self, _limit: u32) -> Result<Vec<MediaItem>> {
        Self::missing()
    }
}
