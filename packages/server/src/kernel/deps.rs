//! Server dependencies for pipelines (using traits for testability)
//!
//! This module provides the central dependency container used by every
//! upload pipeline and route. All external services sit behind the `Base*`
//! traits so tests can swap in the doubles from `test_dependencies`.

use std::sync::Arc;

use anyhow::Result;
use chrono::FixedOffset;

use crate::config::Config;
use crate::domains::youtube::channels::ChannelRouter;
use crate::kernel::bunny_client::BunnyCdn;
use crate::kernel::http_transfer::HttpTransfer;
use crate::kernel::jobs::{JobDomain, JobExecutor, JobStore};
use crate::kernel::transfer::{ProgressReporter, TracingProgress};
use crate::kernel::wordpress_client::{UnconfiguredMediaLibrary, WordPressClient};
use crate::kernel::youtube_client::{GoogleOAuthProvider, YoutubeClient};
use crate::kernel::{BaseCdn, BaseCredentialsProvider, BaseMediaLibrary, BaseTransfer, BaseVideoPlatform};

// =============================================================================
// ServerDeps
// =============================================================================

/// Server dependencies accessible to pipelines (using traits for testability)
#[derive(Clone)]
pub struct ServerDeps {
    pub transfer: Arc<dyn BaseTransfer>,
    pub credentials: Arc<dyn BaseCredentialsProvider>,
    pub video_platform: Arc<dyn BaseVideoPlatform>,
    pub media_library: Arc<dyn BaseMediaLibrary>,
    pub cdn: Arc<dyn BaseCdn>,
    pub youtube_jobs: Arc<JobStore>,
    pub wordpress_jobs: Arc<JobStore>,
    pub executor: JobExecutor,
    pub channel_router: ChannelRouter,
    /// Zone for `publish_at` values without an offset.
    pub reference_offset: FixedOffset,
    pub reconcile_scan_depth: u32,
    /// Plain client for the catalog scraper.
    pub http: reqwest::Client,
    pub catalog_endpoint: String,
}

impl ServerDeps {
    /// Create new ServerDeps with the given dependencies
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        transfer: Arc<dyn BaseTransfer>,
        credentials: Arc<dyn BaseCredentialsProvider>,
        video_platform: Arc<dyn BaseVideoPlatform>,
        media_library: Arc<dyn BaseMediaLibrary>,
        cdn: Arc<dyn BaseCdn>,
        youtube_jobs: Arc<JobStore>,
        wordpress_jobs: Arc<JobStore>,
        executor: JobExecutor,
        channel_router: ChannelRouter,
        reference_offset: FixedOffset,
        reconcile_scan_depth: u32,
        http: reqwest::Client,
        catalog_endpoint: String,
    ) -> Self {
        Self {
            transfer,
            credentials,
            video_platform,
            media_library,
            cdn,
            youtube_jobs,
            wordpress_jobs,
            executor,
            channel_router,
            reference_offset,
            reconcile_scan_depth,
            http,
            catalog_endpoint,
        }
    }

    /// Wire the real reqwest-backed clients from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let reporter: Arc<dyn ProgressReporter> = Arc::new(TracingProgress);

        let media_library: Arc<dyn BaseMediaLibrary> = match &config.wordpress {
            Some(wp) => Arc::new(WordPressClient::new(wp.clone(), reporter.clone())),
            None => Arc::new(UnconfiguredMediaLibrary),
        };

        Ok(Self::new(
            Arc::new(HttpTransfer::new(reporter.clone())?),
            Arc::new(GoogleOAuthProvider::new(
                config.youtube_token_uri.clone(),
                config.youtube_channels.clone(),
            )),
            Arc::new(YoutubeClient::new(reporter)),
            media_library,
            Arc::new(BunnyCdn::new(config.bunny_api_key.clone())),
            Arc::new(JobStore::new(&config.status_dir, JobDomain::Youtube)?),
            Arc::new(JobStore::new(&config.status_dir, JobDomain::Wordpress)?),
            JobExecutor::new(config.temp_dir.clone()),
            config.channel_router.clone(),
            config.reference_offset,
            config.reconcile_scan_depth,
            reqwest::Client::new(),
            config.catalog_endpoint.clone(),
        ))
    }
}
