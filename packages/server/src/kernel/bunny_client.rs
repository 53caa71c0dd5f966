//! Bunny storage client for removing source files after a YouTube job.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{info, warn};

use super::{BaseCdn, CdnDeleteReceipt};

const DELETE_TIMEOUT: Duration = Duration::from_secs(60);

/// Bunny storage client; deletes temp source files once a job has shipped them.
pub struct BunnyCdn {
    client: Client,
    access_key: Option<String>,
}

impl BunnyCdn {
    pub fn new(access_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            access_key,
        }
    }
}

#[async_trait]
impl BaseCdn for BunnyCdn {
    async fn delete(&self, url: &str) -> Result<CdnDeleteReceipt> {
        let mut request = self.client.delete(url).timeout(DELETE_TIMEOUT);
        if let Some(key) = &self.access_key {
            request = request.header("AccessKey", key);
        } else {
            warn!("BUNNY_API_KEY not configured; sending unauthenticated delete");
        }

        let response = request.send().await.context("Bunny delete request failed")?;
        let status = response.status();
        let text: String = response
            .text()
            .await
            .unwrap_or_default()
            .chars()
            .take(500)
            .collect();

        info!(status = status.as_u16(), "Bunny delete response");

        Ok(CdnDeleteReceipt {
            ok: status.is_success(),
            status_code: status.as_u16(),
            text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::HeaderMap, http::StatusCode, routing::delete, Router};

    async fn storage(headers: HeaderMap) -> (StatusCode, String) {
        match headers.get("AccessKey").and_then(|v| v.to_str().ok()) {
            Some("secret") => (StatusCode::OK, "x".repeat(800)),
            _ => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
        }
    }

    async fn serve() -> String {
        let app = Router::new().route("/zone/clip.mp4", delete(storage));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}/zone/clip.mp4")
    }

    #[tokio::test]
    async fn test_delete_sends_access_key_and_truncates_body() {
        let url = serve().await;
        let receipt = BunnyCdn::new(Some("secret".to_string())).delete(&url).await.unwrap();

        assert!(receipt.ok);
        assert_eq!(receipt.status_code, 200);
        assert_eq!(receipt.text.len(), 500);
    }

    #[tokio::test]
    async fn test_rejected_delete_is_a_receipt_not_an_error() {
        let url = serve().await;
        let receipt = BunnyCdn::new(None).delete(&url).await.unwrap();

        assert!(!receipt.ok);
        assert_eq!(receipt.status_code, 401);
        assert_eq!(receipt.text, "Unauthorized");
    }
}
