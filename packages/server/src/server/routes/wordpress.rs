use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use super::youtube::JobIdQuery;
use crate::domains::wordpress::{
    actions, images, reconcile, ImageUploadRequest, ProductImagesReport, ProductImagesRequest,
    Reconciliation, WordPressUploadRequest,
};
use crate::kernel::jobs::{JobRecord, JobState};
use crate::server::app::AxumAppState;
use crate::server::error::{ApiError, ApiResult};
use crate::server::extract::LenientJson;

#[derive(Debug, Serialize)]
pub struct WordPressAccepted {
    pub status: &'static str,
    pub job_id: String,
}

fn accepted(job_id: String) -> (StatusCode, Json<WordPressAccepted>) {
    (
        StatusCode::ACCEPTED,
        Json(WordPressAccepted {
            status: "processing",
            job_id,
        }),
    )
}

/// POST /upload-to-wordpress
pub async fn upload_to_wordpress_handler(
    Extension(state): Extension<AxumAppState>,
    LenientJson(request): LenientJson<WordPressUploadRequest>,
) -> ApiResult<(StatusCode, Json<WordPressAccepted>)> {
    let job = request.validate()?;
    let admission = actions::admit_upload(job, Arc::clone(&state.deps)).await?;
    Ok(accepted(admission.job_id))
}

/// GET /wp-status?job_id=... answers with the stored record as-is.
pub async fn wp_status_handler(
    Extension(state): Extension<AxumAppState>,
    Query(query): Query<JobIdQuery>,
) -> ApiResult<(StatusCode, Json<JobRecord>)> {
    let job_id = query.require()?;
    let record = actions::get_status(&job_id, &state.deps)
        .await
        .ok_or(ApiError::NotFound)?;

    let status = match record.state {
        JobState::Completed => StatusCode::OK,
        JobState::Processing => StatusCode::ACCEPTED,
        JobState::Error => StatusCode::INTERNAL_SERVER_ERROR,
    };
    Ok((status, Json(record)))
}

/// GET /wp-status-by-job?job_id=... resolves the outcome against WordPress.
pub async fn wp_status_by_job_handler(
    Extension(state): Extension<AxumAppState>,
    Query(query): Query<JobIdQuery>,
) -> ApiResult<(StatusCode, Json<JobRecord>)> {
    let job_id = query.require()?;

    match reconcile::reconcile(&job_id, &state.deps).await? {
        Reconciliation::Unknown => Err(ApiError::NotFound),
        Reconciliation::Completed(record) => Ok((StatusCode::OK, Json(record))),
        Reconciliation::Pending(record) => Ok((StatusCode::ACCEPTED, Json(record))),
        Reconciliation::Failed(record) => Ok((StatusCode::INTERNAL_SERVER_ERROR, Json(record))),
    }
}

/// POST /upload-image-to-wordpress
pub async fn upload_image_handler(
    Extension(state): Extension<AxumAppState>,
    LenientJson(request): LenientJson<ImageUploadRequest>,
) -> ApiResult<(StatusCode, Json<WordPressAccepted>)> {
    let job = request.validate()?;
    let admission = actions::admit_image_upload(job, Arc::clone(&state.deps));
    Ok(accepted(admission.job_id))
}

/// POST /upload-product-images runs the whole batch before answering.
pub async fn upload_product_images_handler(
    Extension(state): Extension<AxumAppState>,
    LenientJson(request): LenientJson<ProductImagesRequest>,
) -> ApiResult<Json<ProductImagesReport>> {
    let batch = request.validate()?;
    Ok(Json(images::upload_product_images(batch, &state.deps).await))
}
