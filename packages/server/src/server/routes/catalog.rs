use axum::{
    extract::{Extension, Query},
    Json,
};
use serde_json::json;

use crate::domains::catalog::{CatalogError, CatalogQuery, CatalogScraper, CatalogSummary};
use crate::server::app::AxumAppState;
use crate::server::error::{ApiError, ApiResult};

/// GET /products?max_seconds=&timeout=
pub async fn products_handler(
    Extension(state): Extension<AxumAppState>,
    Query(query): Query<CatalogQuery>,
) -> ApiResult<Json<CatalogSummary>> {
    let scraper = CatalogScraper::new(state.deps.http.clone(), state.deps.catalog_endpoint.clone());

    match scraper.scrape(&query).await {
        Ok(summary) => Ok(Json(summary)),
        Err(CatalogError::FirstPageNotJson {
            status,
            body_preview,
            details,
        }) => Err(ApiError::BadGateway(json!({
            "error": "page1_not_json",
            "status": status,
            "body_preview": body_preview,
            "details": details,
        }))),
        Err(e) => Err(ApiError::Internal(e.into())),
    }
}
