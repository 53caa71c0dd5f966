//! Source downloads over plain HTTP(S), streamed to disk.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::transfer::{stream_download, ProgressReporter, TransferError};
use super::BaseTransfer;

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(600);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// [`BaseTransfer`] over plain HTTP(S) GET.
pub struct HttpTransfer {
    client: Client,
    reporter: Arc<dyn ProgressReporter>,
}

impl HttpTransfer {
    pub fn new(reporter: Arc<dyn ProgressReporter>) -> Result<Self, TransferError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(DOWNLOAD_TIMEOUT)
            .build()?;

        Ok(Self { client, reporter })
    }
}

#[async_trait]
impl BaseTransfer for HttpTransfer {
    async fn download(&self, url: &str, destination: &Path, label: &str) -> Result<u64, TransferError> {
        stream_download(&self.client, url, destination, label, self.reporter.as_ref()).await
    }
}
