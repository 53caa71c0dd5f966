// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Pipelines (domains/*) drive these; tests swap in the doubles from
// kernel::test_dependencies.
//
// Naming convention: Base* for trait names (e.g., BaseMediaLibrary, BaseCdn)

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::transfer::TransferError;

// =============================================================================
// Transfer (source media fetch)
// =============================================================================

#[async_trait]
pub trait BaseTransfer: Send + Sync {
    /// Stream `url` into `destination`. `label` prefixes progress lines.
    async fn download(&self, url: &str, destination: &Path, label: &str) -> Result<u64, TransferError>;
}

// =============================================================================
// Credentials (OAuth refresh)
// =============================================================================

#[async_trait]
pub trait BaseCredentialsProvider: Send + Sync {
    /// Exchange the stored long-lived credential for `channel` into an access token.
    async fn access_token(&self, channel: &str) -> Result<String>;
}

// =============================================================================
// Video platform (YouTube)
// =============================================================================

/// Snippet + status sent with a new video.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoMetadata {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub privacy_status: String,
    /// UTC `YYYY-MM-DDTHH:MM:SSZ`; only set together with `privacy_status = "private"`.
    pub publish_at: Option<String>,
    pub made_for_kids: bool,
}

#[async_trait]
pub trait BaseVideoPlatform: Send + Sync {
    /// Resumable upload; returns the platform video id.
    async fn upload_video(
        &self,
        access_token: &str,
        file: &Path,
        metadata: &VideoMetadata,
    ) -> Result<String>;

    async fn set_thumbnail(&self, access_token: &str, video_id: &str, image: &Path) -> Result<()>;
}

// =============================================================================
// Media library (WordPress)
// =============================================================================

/// Fields sent with the multipart create call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaUpload {
    pub filename: String,
    pub mime_type: String,
    pub title: Option<String>,
    pub alt_text: Option<String>,
    /// Carries the `job:<id>` marker for later reconciliation.
    pub description: Option<String>,
}

/// WordPress `{ "rendered": "..." }` text field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rendered {
    #[serde(default)]
    pub rendered: String,
}

impl From<&str> for Rendered {
    fn from(text: &str) -> Self {
        Self {
            rendered: text.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: u64,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub title: Rendered,
    #[serde(default)]
    pub description: Rendered,
    #[serde(default)]
    pub caption: Rendered,
    #[serde(default)]
    pub alt_text: String,
}

impl MediaItem {
    /// Whether `marker` appears in any free-text field of this item.
    pub fn mentions(&self, marker: &str) -> bool {
        [
            self.description.rendered.as_str(),
            self.caption.rendered.as_str(),
            self.title.rendered.as_str(),
            self.alt_text.as_str(),
        ]
        .iter()
        .any(|field| field.contains(marker))
    }
}

/// Result of the primary multipart POST.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaUploadOutcome {
    Created(MediaItem),
    /// The proxy cut the call short (HTTP 504); the platform may still finish.
    Unverified { status: u16 },
}

/// Metadata / attach-to-post update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<u64>,
}

impl MediaPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.alt_text.is_none() && self.post.is_none()
    }
}

#[async_trait]
pub trait BaseMediaLibrary: Send + Sync {
    /// Check the stored credentials before any upload work starts.
    async fn verify_credentials(&self) -> Result<()>;

    async fn upload_media(&self, file: &Path, upload: &MediaUpload) -> Result<MediaUploadOutcome>;

    async fn upload_media_bytes(&self, data: Vec<u8>, upload: &MediaUpload) -> Result<MediaUploadOutcome>;

    async fn update_media(&self, id: u64, patch: &MediaPatch) -> Result<()>;

    /// Platform full-text search over media.
    async fn search_media(&self, query: &str, per_page: u32) -> Result<Vec<MediaItem>>;

    /// Up to `limit` most recent items, newest first.
    async fn recent_media(&self, limit: u32) -> Result<Vec<MediaItem>>;
}

// =============================================================================
// CDN (Bunny source cleanup)
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CdnDeleteReceipt {
    pub ok: bool,
    pub status_code: u16,
    pub text: String,
}

#[async_trait]
pub trait BaseCdn: Send + Sync {
    /// Authenticated delete-by-URL. Non-2xx comes back as a receipt with `ok: false`.
    async fn delete(&self, url: &str) -> Result<CdnDeleteReceipt>;
}
