//! WordPress image uploads: single images (background job) and product
//! galleries (synchronous batch). Every image is normalized to 16:9 first.

use std::sync::Arc;

use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use serde::Serialize;
use tracing::{info, warn, Instrument};
use uuid::Uuid;

use super::models::{ImageUploadJob, ProductImageBatch};
use super::pipeline::apply_metadata;
use crate::common::{filename_from_url, force_jpg_extension};
use crate::kernel::jobs::{JobContext, JobDomain};
use crate::kernel::{MediaPatch, MediaUpload, MediaUploadOutcome, ServerDeps};

pub const MAX_IMAGE_WIDTH: u32 = 1000;
pub const JPEG_QUALITY: u8 = 90;

/// Pad onto a white 16:9 canvas (centered), cap the width, re-encode as JPEG.
pub fn normalize_to_16_9(data: &[u8], max_width: u32) -> Result<Vec<u8>> {
    let source = image::load_from_memory(data)
        .context("Failed to decode image")?
        .to_rgb8();
    let (width, height) = source.dimensions();
    anyhow::ensure!(width > 0 && height > 0, "image has no pixels");

    // Integer math: 16:9 canvas that contains the source in both dimensions.
    let (canvas_w, canvas_h) = if u64::from(width) * 9 < u64::from(height) * 16 {
        ((u64::from(height) * 16 / 9) as u32, height)
    } else {
        (width, (u64::from(width) * 9 / 16) as u32)
    };

    let mut canvas = RgbImage::from_pixel(canvas_w, canvas_h, Rgb([255, 255, 255]));
    let x = (canvas_w - width) / 2;
    let y = (canvas_h - height) / 2;
    imageops::overlay(&mut canvas, &source, i64::from(x), i64::from(y));

    if canvas_w > max_width {
        let scaled_h = ((u64::from(canvas_h) * u64::from(max_width)) / u64::from(canvas_w)).max(1) as u32;
        canvas = imageops::resize(&canvas, max_width, scaled_h, FilterType::Lanczos3);
    }

    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY)
        .encode_image(&canvas)
        .context("Failed to encode JPEG")?;
    Ok(out)
}

/// Read `path` and normalize it off the async runtime.
async fn normalized_image(path: &std::path::Path) -> Result<Vec<u8>> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    tokio::task::spawn_blocking(move || normalize_to_16_9(&data, MAX_IMAGE_WIDTH))
        .await
        .context("image normalization task failed")?
}

// =============================================================================
// Single image (background)
// =============================================================================

pub async fn run(ctx: JobContext, deps: Arc<ServerDeps>, job: ImageUploadJob) -> Result<()> {
    let filename = force_jpg_extension(
        &job.filename
            .clone()
            .or_else(|| filename_from_url(&job.file_url))
            .unwrap_or_else(|| format!("image_{}.jpg", ctx.job_id())),
    );
    info!(file = %filename, "WP image job start");

    let temp_file = ctx.temp_path("img", "");
    deps.transfer
        .download(&job.file_url, &temp_file, "download")
        .await
        .context("Image download failed")?;

    deps.media_library
        .verify_credentials()
        .await
        .context("WordPress authentication failed")?;

    let processed = normalized_image(&temp_file).await?;
    info!(bytes = processed.len(), "image normalized to 16:9");

    let upload = MediaUpload {
        filename: filename.clone(),
        mime_type: "image/jpeg".to_string(),
        title: Some(job.title.clone().unwrap_or_else(|| filename.clone())),
        alt_text: job.alt_text.clone(),
        description: Some(ctx.marker()),
    };

    match deps
        .media_library
        .upload_media_bytes(processed, &upload)
        .await
        .context("WordPress image upload failed")?
    {
        MediaUploadOutcome::Created(item) => {
            info!(id = item.id, url = ?item.source_url, "image upload complete");
            if let Some(post) = job.post_id {
                let patch = MediaPatch {
                    post: Some(post),
                    ..Default::default()
                };
                apply_metadata(deps.media_library.as_ref(), item.id, &patch).await;
            }
        }
        MediaUploadOutcome::Unverified { status } => {
            warn!(status, marker = %ctx.marker(), "image upload unverified");
        }
    }
    Ok(())
}

// =============================================================================
// Product gallery (synchronous)
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedImage {
    pub url: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductImagesReport {
    pub uploaded: usize,
    pub failed: Vec<FailedImage>,
    pub gallery_ids: Vec<u64>,
    pub featured_id: Option<u64>,
}

pub async fn upload_product_images(batch: ProductImageBatch, deps: &ServerDeps) -> ProductImagesReport {
    let ctx = deps
        .executor
        .context(Uuid::new_v4().to_string(), JobDomain::WordpressImage, None);
    let report = upload_batch(&ctx, batch, deps)
        .instrument(ctx.span().clone())
        .await;
    ctx.cleanup().await;
    report
}

async fn upload_batch(ctx: &JobContext, batch: ProductImageBatch, deps: &ServerDeps) -> ProductImagesReport {
    info!(count = batch.urls.len(), "product image batch start");

    let mut report = ProductImagesReport {
        uploaded: 0,
        failed: Vec::new(),
        gallery_ids: Vec::new(),
        featured_id: None,
    };

    for (idx, url) in batch.urls.iter().enumerate() {
        let n = idx + 1;
        let title = match &batch.title_prefix {
            Some(prefix) => format!("{prefix} ({n})"),
            None => filename_from_url(url).unwrap_or_else(|| format!("image_{n}.jpg")),
        };
        let alt_text = batch.alt_text.as_ref().map(|alt| format!("{alt} ({n})"));

        match upload_product_image(ctx, deps, n, url, title, alt_text).await {
            Ok(id) => {
                report.gallery_ids.push(id);
                if batch.featured_url.as_deref() == Some(url.as_str()) {
                    report.featured_id = Some(id);
                }
            }
            Err(e) => {
                warn!(url = %url, error = %format!("{e:#}"), "product image failed");
                report.failed.push(FailedImage {
                    url: url.clone(),
                    error: format!("{e:#}"),
                });
            }
        }
    }

    report.uploaded = report.gallery_ids.len();
    info!(uploaded = report.uploaded, failed = report.failed.len(), "product image batch done");
    report
}

async fn upload_product_image(
    ctx: &JobContext,
    deps: &ServerDeps,
    n: usize,
    url: &str,
    title: String,
    alt_text: Option<String>,
) -> Result<u64> {
    let temp_file = ctx.temp_path(&format!("img{n}"), "");
    deps.transfer
        .download(url, &temp_file, "download")
        .await
        .context("Image download failed")?;
    let processed = normalized_image(&temp_file).await?;

    let filename = force_jpg_extension(
        &filename_from_url(url).unwrap_or_else(|| format!("image_{n}.jpg")),
    );
    let upload = MediaUpload {
        filename,
        mime_type: "image/jpeg".to_string(),
        title: Some(title),
        alt_text,
        description: None,
    };

    match deps.media_library.upload_media_bytes(processed, &upload).await? {
        MediaUploadOutcome::Created(item) => Ok(item.id),
        MediaUploadOutcome::Unverified { status } => {
            anyhow::bail!("WP media upload unverified (HTTP {status})")
        }
    }
}
