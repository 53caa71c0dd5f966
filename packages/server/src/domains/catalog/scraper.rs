//! Product catalog scraper.
//!
//! Pages through a JSON listing endpoint (`?page=N&feature[type]=all`), whose
//! first page reports `details.count` and `details.products_per_page`.
//! Products are de-duplicated by URL across pages. The walk stops early once
//! the time budget is spent and reports `truncated: true`.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use chrono::Utc;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::common::{short_url_hash, slugify};

const MAX_RETRIES: u32 = 4;
const MIN_TIMEOUT_SECS: f64 = 0.1;
const MAX_TIMEOUT_SECS: f64 = 300.0;
const DEFAULT_BACKOFF: Duration = Duration::from_millis(600);
const RETRY_STATUSES: [StatusCode; 5] = [
    StatusCode::TOO_MANY_REQUESTS,
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("page 1 was not JSON (status {status}): {details}")]
    FirstPageNotJson {
        status: u16,
        body_preview: String,
        details: String,
    },

    #[error("catalog request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// `GET /products` query parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogQuery {
    /// Time budget for the whole walk, in seconds.
    pub max_seconds: u64,
    /// Per-request timeout, in seconds.
    pub timeout: f64,
}

impl Default for CatalogQuery {
    fn default() -> Self {
        Self {
            max_seconds: 120,
            timeout: 25.0,
        }
    }
}

impl CatalogQuery {
    /// Per-request timeout clamped to a usable range; non-finite input falls
    /// back to the default.
    pub fn request_timeout(&self) -> Duration {
        let secs = if self.timeout.is_finite() {
            self.timeout.clamp(MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS)
        } else {
            Self::default().timeout
        };
        Duration::from_secs_f64(secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub source: String,
    pub brand: String,
    pub brand_slug: String,
    pub product_name: String,
    pub product_url: String,
    pub image_url: Option<String>,
    pub is_new: bool,
    pub hash: String,
    pub first_seen: String,
    pub last_seen: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageStat {
    pub requested_page: u64,
    pub response_page: Option<u64>,
    pub status: u16,
    pub returned_count: Option<usize>,
    pub unique_added: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_preview: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogSummary {
    pub total: usize,
    pub unique_urls: usize,
    pub reported_count: u64,
    pub per_page: u64,
    pub expected_pages: u64,
    pub duration_seconds: f64,
    pub truncated: bool,
    pub page_stats: Vec<PageStat>,
    pub products: Vec<Product>,
}

pub struct CatalogScraper {
    client: Client,
    endpoint: String,
    source: String,
    backoff: Duration,
}

impl CatalogScraper {
    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            source: "etg".to_string(),
            backoff: DEFAULT_BACKOFF,
        }
    }

    /// Base delay between retries; doubles per attempt.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// GET one page, retrying 429/5xx and connection errors.
    async fn get_page(&self, page: u64, timeout: Duration) -> Result<Response, reqwest::Error> {
        let mut attempt = 0;
        loop {
            let result = self
                .client
                .get(&self.endpoint)
                .query(&[("page", page.to_string()), ("feature[type]", "all".to_string())])
                .header(USER_AGENT, "media-relay catalog-ingestor/1.0")
                .header(ACCEPT, "application/json,text/plain,*/*")
                .header("X-Requested-With", "XMLHttpRequest")
                .timeout(timeout)
                .send()
                .await;

            let retryable = match &result {
                Ok(response) => RETRY_STATUSES.contains(&response.status()),
                Err(e) => e.is_connect() || e.is_timeout(),
            };
            if !retryable || attempt >= MAX_RETRIES {
                return result;
            }

            attempt += 1;
            let delay = self.backoff * 2u32.pow(attempt - 1);
            debug!(page, attempt, delay_ms = delay.as_millis() as u64, "retrying catalog page");
            tokio::time::sleep(delay).await;
        }
    }

    pub async fn scrape(&self, query: &CatalogQuery) -> Result<CatalogSummary, CatalogError> {
        let started = Instant::now();
        let budget = Duration::from_secs(query.max_seconds);
        let timeout = query.request_timeout();
        let today = Utc::now().format("%Y-%m-%d").to_string();

        let first = self.get_page(1, timeout).await?;
        let status = first.status().as_u16();
        let body = first.text().await?;
        let data: Value = serde_json::from_str(&body).map_err(|e| CatalogError::FirstPageNotJson {
            status,
            body_preview: body.chars().take(200).collect(),
            details: e.to_string(),
        })?;

        let reported_count = lenient_u64(&data["details"]["count"]).unwrap_or(0);
        let per_page = lenient_u64(&data["details"]["products_per_page"])
            .filter(|n| *n > 0)
            .unwrap_or(15);
        let expected_pages = reported_count.div_ceil(per_page).max(1);
        info!(reported_count, per_page, expected_pages, "catalog page 1 loaded");

        let mut seen = HashSet::new();
        let mut products = Vec::new();
        let mut page_stats = Vec::new();

        page_stats.push(self.ingest(1, status, &data, &today, &mut seen, &mut products));

        let mut truncated = false;
        for page in 2..=expected_pages {
            if started.elapsed() > budget {
                warn!(page, "catalog time budget spent; truncating");
                truncated = true;
                break;
            }

            let response = self.get_page(page, timeout).await?;
            let status = response.status().as_u16();
            let body = response.text().await?;
            match serde_json::from_str::<Value>(&body) {
                Ok(data) => page_stats.push(self.ingest(page, status, &data, &today, &mut seen, &mut products)),
                Err(_) => {
                    warn!(page, status, "catalog page was not JSON");
                    page_stats.push(PageStat {
                        requested_page: page,
                        response_page: None,
                        status,
                        returned_count: None,
                        unique_added: 0,
                        error: Some("not_json".to_string()),
                        body_preview: Some(body.chars().take(120).collect()),
                    });
                }
            }
        }

        let duration = started.elapsed().as_secs_f64();
        Ok(CatalogSummary {
            total: products.len(),
            unique_urls: seen.len(),
            reported_count,
            per_page,
            expected_pages,
            duration_seconds: (duration * 100.0).round() / 100.0,
            truncated,
            page_stats,
            products,
        })
    }

    fn ingest(
        &self,
        page: u64,
        status: u16,
        data: &Value,
        today: &str,
        seen: &mut HashSet<String>,
        products: &mut Vec<Product>,
    ) -> PageStat {
        let items = data["products"].as_array().map(Vec::as_slice).unwrap_or_default();
        let mut added = 0;

        for item in items {
            let Some(url) = item["url"].as_str().filter(|u| !u.is_empty()) else {
                continue;
            };
            if !seen.insert(url.to_string()) {
                continue;
            }

            let brand = item["manufacturer"]
                .as_str()
                .map(str::trim)
                .filter(|b| !b.is_empty())
                .unwrap_or("Unknown")
                .to_string();
            products.push(Product {
                source: self.source.clone(),
                brand_slug: slugify(&brand),
                brand,
                product_name: item["name"].as_str().unwrap_or_default().trim().to_string(),
                product_url: url.to_string(),
                image_url: item["image"].as_str().map(str::to_string),
                is_new: truthy(&item["new"]),
                hash: short_url_hash(url),
                first_seen: today.to_string(),
                last_seen: today.to_string(),
            });
            added += 1;
        }

        PageStat {
            requested_page: page,
            response_page: lenient_u64(&data["details"]["page"]).or(if page == 1 { Some(1) } else { None }),
            status,
            returned_count: Some(items.len()),
            unique_added: added,
            error: None,
            body_preview: None,
        }
    }
}

/// A count that may arrive as a number or a numeric string.
fn lenient_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty() && s != "0" && !s.eq_ignore_ascii_case("false"),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Null => false,
    }
}
