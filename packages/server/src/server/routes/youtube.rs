use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::domains::youtube::{actions, YoutubeUploadRequest};
use crate::kernel::jobs::JobRecord;
use crate::server::app::AxumAppState;
use crate::server::error::{ApiError, ApiResult};
use crate::server::extract::LenientJson;

#[derive(Debug, Serialize)]
pub struct YoutubeAccepted {
    pub status: &'static str,
    pub job_id: String,
    pub channel: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct JobIdQuery {
    pub job_id: Option<String>,
}

impl JobIdQuery {
    pub fn require(self) -> ApiResult<String> {
        self.job_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| ApiError::BadRequest("Missing job_id parameter".to_string()))
    }
}

/// POST /upload-to-youtube
pub async fn upload_to_youtube_handler(
    Extension(state): Extension<AxumAppState>,
    LenientJson(request): LenientJson<YoutubeUploadRequest>,
) -> ApiResult<(StatusCode, Json<YoutubeAccepted>)> {
    let job = request.validate(&state.deps.channel_router)?;
    let admission = actions::admit_upload(job, Arc::clone(&state.deps)).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(YoutubeAccepted {
            status: "processing",
            job_id: admission.job_id,
            channel: admission.channel,
        }),
    ))
}

/// GET /status-check?job_id=...
pub async fn status_check_handler(
    Extension(state): Extension<AxumAppState>,
    Query(query): Query<JobIdQuery>,
) -> ApiResult<Json<JobRecord>> {
    let job_id = query.require()?;
    actions::get_status(&job_id, &state.deps)
        .await
        .map(Json)
        .ok_or(ApiError::NotFound)
}
