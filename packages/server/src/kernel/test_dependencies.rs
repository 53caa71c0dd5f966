// TestDependencies - mock implementations for testing
//
// Provides mock collaborators that can be injected into ServerDeps for tests.
// Every mock records its calls so tests can assert on what a pipeline did.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::FixedOffset;

use super::jobs::{JobDomain, JobExecutor, JobStore};
use super::transfer::TransferError;
use super::{
    BaseCdn, BaseCredentialsProvider, BaseMediaLibrary, BaseTransfer, BaseVideoPlatform,
    CdnDeleteReceipt, MediaItem, MediaPatch, MediaUpload, MediaUploadOutcome, ServerDeps,
    VideoMetadata,
};
use crate::domains::youtube::channels::ChannelRouter;

// =============================================================================
// Mock Transfer
// =============================================================================

pub const DEFAULT_FIXTURE: &[u8] = b"fake media payload";

pub struct MockTransfer {
    fixtures: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    failing: Arc<Mutex<HashSet<String>>>,
    delay: Option<Duration>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockTransfer {
    pub fn new() -> Self {
        Self {
            fixtures: Arc::new(Mutex::new(HashMap::new())),
            failing: Arc::new(Mutex::new(HashSet::new())),
            delay: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Serve `bytes` for `url` instead of the default payload
    pub fn with_fixture(self, url: &str, bytes: Vec<u8>) -> Self {
        self.fixtures.lock().unwrap().insert(url.to_string(), bytes);
        self
    }

    /// Answer `url` with a 404
    pub fn with_failure(self, url: &str) -> Self {
        self.failing.lock().unwrap().insert(url.to_string());
        self
    }

    /// Sleep before every download, to observe jobs mid-flight
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Get all URLs that were downloaded
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockTransfer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseTransfer for MockTransfer {
    async fn download(&self, url: &str, destination: &Path, _label: &str) -> Result<u64, TransferError> {
        self.calls.lock().unwrap().push(url.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.lock().unwrap().contains(url) {
            return Err(TransferError::Status {
                status: 404,
                url: url.to_string(),
            });
        }

        let bytes = self
            .fixtures
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_else(|| DEFAULT_FIXTURE.to_vec());

        tokio::fs::write(destination, &bytes)
            .await
            .map_err(|source| TransferError::Io {
                path: destination.to_path_buf(),
                source,
            })?;
        Ok(bytes.len() as u64)
    }
}

// =============================================================================
// Mock Credentials
// =============================================================================

pub struct MockCredentials {
    rejected: Arc<Mutex<HashSet<String>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockCredentials {
    pub fn new() -> Self {
        Self {
            rejected: Arc::new(Mutex::new(HashSet::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Refresh for `channel` fails like a revoked refresh token
    pub fn rejecting(self, channel: &str) -> Self {
        self.rejected.lock().unwrap().insert(channel.to_string());
        self
    }

    /// Channels a token was requested for, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockCredentials {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseCredentialsProvider for MockCredentials {
    async fn access_token(&self, channel: &str) -> Result<String> {
        self.calls.lock().unwrap().push(channel.to_string());
        if self.rejected.lock().unwrap().contains(channel) {
            anyhow::bail!("OAuth refresh failed for {}: invalid_grant", channel);
        }
        Ok(format!("token-{channel}"))
    }
}

// =============================================================================
// Mock Video Platform
// =============================================================================

pub struct MockVideoPlatform {
    video_id: String,
    fail_upload: bool,
    fail_thumbnail: bool,
    uploads: Arc<Mutex<Vec<VideoMetadata>>>,
    thumbnails: Arc<Mutex<Vec<String>>>,
}

impl MockVideoPlatform {
    pub fn new() -> Self {
        Self {
            video_id: "dQw4w9WgXcQ".to_string(),
            fail_upload: false,
            fail_thumbnail: false,
            uploads: Arc::new(Mutex::new(Vec::new())),
            thumbnails: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_video_id(mut self, video_id: &str) -> Self {
        self.video_id = video_id.to_string();
        self
    }

    pub fn failing_upload(mut self) -> Self {
        self.fail_upload = true;
        self
    }

    pub fn failing_thumbnail(mut self) -> Self {
        self.fail_thumbnail = true;
        self
    }

    /// Metadata of every upload attempt
    pub fn uploads(&self) -> Vec<VideoMetadata> {
        self.uploads.lock().unwrap().clone()
    }

    /// Video ids a thumbnail was set on
    pub fn thumbnails(&self) -> Vec<String> {
        self.thumbnails.lock().unwrap().clone()
    }
}

impl Default for MockVideoPlatform {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseVideoPlatform for MockVideoPlatform {
    async fn upload_video(
        &self,
        _access_token: &str,
        file: &Path,
        metadata: &VideoMetadata,
    ) -> Result<String> {
        self.uploads.lock().unwrap().push(metadata.clone());
        if self.fail_upload {
            anyhow::bail!("YouTube chunk rejected 403 Forbidden: quotaExceeded");
        }
        anyhow::ensure!(file.exists(), "upload source {} missing", file.display());
        Ok(self.video_id.clone())
    }

    async fn set_thumbnail(&self, _access_token: &str, video_id: &str, _image: &Path) -> Result<()> {
        if self.fail_thumbnail {
            anyhow::bail!("Thumbnail rejected 403 Forbidden: channel not verified");
        }
        self.thumbnails.lock().unwrap().push(video_id.to_string());
        Ok(())
    }
}

// =============================================================================
// Mock Media Library
// =============================================================================

pub struct MockMediaLibrary {
    next_id: AtomicU64,
    /// Library contents, newest first.
    items: Arc<Mutex<Vec<MediaItem>>>,
    gateway_timeout: bool,
    search_blind: bool,
    fail_search: bool,
    fail_credentials: bool,
    fail_update: bool,
    uploads: Arc<Mutex<Vec<MediaUpload>>>,
    updates: Arc<Mutex<Vec<(u64, MediaPatch)>>>,
}

impl MockMediaLibrary {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(100),
            items: Arc::new(Mutex::new(Vec::new())),
            gateway_timeout: false,
            search_blind: false,
            fail_search: false,
            fail_credentials: false,
            fail_update: false,
            uploads: Arc::new(Mutex::new(Vec::new())),
            updates: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Uploads still land in the library, but the response is a 504
    pub fn with_gateway_timeout(mut self) -> Self {
        self.gateway_timeout = true;
        self
    }

    /// Search never matches; only the recent-items scan can find media
    pub fn with_search_blind(mut self) -> Self {
        self.search_blind = true;
        self
    }

    pub fn failing_search(mut self) -> Self {
        self.fail_search = true;
        self
    }

    pub fn rejecting_credentials(mut self) -> Self {
        self.fail_credentials = true;
        self
    }

    pub fn failing_update(mut self) -> Self {
        self.fail_update = true;
        self
    }

    /// Seed an existing item (goes to the front, as the newest)
    pub fn with_item(self, item: MediaItem) -> Self {
        self.items.lock().unwrap().insert(0, item);
        self
    }

    pub fn uploads(&self) -> Vec<MediaUpload> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn updates(&self) -> Vec<(u64, MediaPatch)> {
        self.updates.lock().unwrap().clone()
    }

    pub fn items(&self) -> Vec<MediaItem> {
        self.items.lock().unwrap().clone()
    }

    fn create(&self, upload: &MediaUpload) -> MediaUploadOutcome {
        self.uploads.lock().unwrap().push(upload.clone());

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let item = MediaItem {
            id,
            source_url: Some(format!(
                "https://example.com/wp-content/uploads/{}",
                upload.filename
            )),
            title: upload.title.as_deref().unwrap_or(&upload.filename).into(),
            description: upload.description.as_deref().unwrap_or_default().into(),
            alt_text: upload.alt_text.clone().unwrap_or_default(),
            ..Default::default()
        };
        self.items.lock().unwrap().insert(0, item.clone());

        if self.gateway_timeout {
            MediaUploadOutcome::Unverified { status: 504 }
        } else {
            MediaUploadOutcome::Created(item)
        }
    }
}

impl Default for MockMediaLibrary {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseMediaLibrary for MockMediaLibrary {
    async fn verify_credentials(&self) -> Result<()> {
        if self.fail_credentials {
            anyhow::bail!("WordPress rejected credentials 401 Unauthorized: rest_not_logged_in");
        }
        Ok(())
    }

    async fn upload_media(&self, file: &Path, upload: &MediaUpload) -> Result<MediaUploadOutcome> {
        anyhow::ensure!(file.exists(), "upload source {} missing", file.display());
        Ok(self.create(upload))
    }

    async fn upload_media_bytes(&self, data: Vec<u8>, upload: &MediaUpload) -> Result<MediaUploadOutcome> {
        anyhow::ensure!(!data.is_empty(), "empty upload body");
        Ok(self.create(upload))
    }

    async fn update_media(&self, id: u64, patch: &MediaPatch) -> Result<()> {
        self.updates.lock().unwrap().push((id, patch.clone()));
        if self.fail_update {
            anyhow::bail!("WordPress metadata update failed 500: internal error");
        }
        Ok(())
    }

    async fn search_media(&self, query: &str, per_page: u32) -> Result<Vec<MediaItem>> {
        if self.fail_search {
            anyhow::bail!("WordPress media listing failed 503: maintenance");
        }
        if self.search_blind {
            return Ok(Vec::new());
        }
        Ok(self
            .items
            .lock()
            .unwrap()
            .iter()
            .filter(|item| item.mentions(query))
            .take(per_page as usize)
            .cloned()
            .collect())
    }

    async fn recent_media(&self, limit: u32) -> Result<Vec<MediaItem>> {
        if self.fail_search {
            anyhow::bail!("WordPress media listing failed 503: maintenance");
        }
        Ok(self
            .items
            .lock()
            .unwrap()
            .iter()
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

// =============================================================================
// Mock CDN
// =============================================================================

pub struct MockCdn {
    status_code: u16,
    deletes: Arc<Mutex<Vec<String>>>,
}

impl MockCdn {
    pub fn new() -> Self {
        Self {
            status_code: 200,
            deletes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Answer deletes with `status_code`
    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = status_code;
        self
    }

    pub fn deletes(&self) -> Vec<String> {
        self.deletes.lock().unwrap().clone()
    }
}

impl Default for MockCdn {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseCdn for MockCdn {
    async fn delete(&self, url: &str) -> Result<CdnDeleteReceipt> {
        self.deletes.lock().unwrap().push(url.to_string());
        Ok(CdnDeleteReceipt {
            ok: (200..300).contains(&self.status_code),
            status_code: self.status_code,
            text: if self.status_code == 200 {
                "{\"HttpCode\":200,\"Message\":\"File deleted successfuly.\"}".to_string()
            } else {
                "{\"HttpCode\":404,\"Message\":\"Object Not Found\"}".to_string()
            },
        })
    }
}

// =============================================================================
// TestDependencies
// =============================================================================

pub struct TestDependencies {
    pub transfer: Arc<MockTransfer>,
    pub credentials: Arc<MockCredentials>,
    pub video_platform: Arc<MockVideoPlatform>,
    pub media_library: Arc<MockMediaLibrary>,
    pub cdn: Arc<MockCdn>,
    pub channel_router: ChannelRouter,
    pub reference_offset: FixedOffset,
    pub reconcile_scan_depth: u32,
    pub catalog_endpoint: String,
}

impl TestDependencies {
    pub fn new() -> Self {
        Self {
            transfer: Arc::new(MockTransfer::new()),
            credentials: Arc::new(MockCredentials::new()),
            video_platform: Arc::new(MockVideoPlatform::new()),
            media_library: Arc::new(MockMediaLibrary::new()),
            cdn: Arc::new(MockCdn::new()),
            channel_router: ChannelRouter::default(),
            reference_offset: FixedOffset::east_opt(0).unwrap(),
            reconcile_scan_depth: 50,
            catalog_endpoint: "http://127.0.0.1:9/catalog".to_string(),
        }
    }

    /// Set a mock transfer
    pub fn mock_transfer(mut self, transfer: MockTransfer) -> Self {
        self.transfer = Arc::new(transfer);
        self
    }

    /// Set mock OAuth credentials
    pub fn mock_credentials(mut self, credentials: MockCredentials) -> Self {
        self.credentials = Arc::new(credentials);
        self
    }

    /// Set a mock video platform
    pub fn mock_video_platform(mut self, platform: MockVideoPlatform) -> Self {
        self.video_platform = Arc::new(platform);
        self
    }

    /// Set a mock media library
    pub fn mock_media_library(mut self, library: MockMediaLibrary) -> Self {
        self.media_library = Arc::new(library);
        self
    }

    /// Set a mock CDN
    pub fn mock_cdn(mut self, cdn: MockCdn) -> Self {
        self.cdn = Arc::new(cdn);
        self
    }

    pub fn reference_offset(mut self, offset: FixedOffset) -> Self {
        self.reference_offset = offset;
        self
    }

    pub fn reconcile_scan_depth(mut self, depth: u32) -> Self {
        self.reconcile_scan_depth = depth;
        self
    }

    pub fn catalog_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.catalog_endpoint = endpoint.into();
        self
    }

    /// Convert into ServerDeps with stores and temp files under `dir`
    pub fn into_deps(&self, dir: &Path) -> Arc<ServerDeps> {
        Arc::new(ServerDeps::new(
            self.transfer.clone(),
            self.credentials.clone(),
            self.video_platform.clone(),
            self.media_library.clone(),
            self.cdn.clone(),
            Arc::new(JobStore::new(dir, JobDomain::Youtube).unwrap()),
            Arc::new(JobStore::new(dir, JobDomain::Wordpress).unwrap()),
            JobExecutor::new(dir),
            self.channel_router.clone(),
            self.reference_offset,
            self.reconcile_scan_depth,
            reqwest::Client::new(),
            self.catalog_endpoint.clone(),
        ))
    }
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}
