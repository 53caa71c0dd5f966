//! Application setup and server configuration.

use std::sync::Arc;

use axum::{
    extract::Extension,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::kernel::ServerDeps;
use crate::server::middleware::request_id;
use crate::server::routes::{
    health_handler, products_handler, status_check_handler, upload_image_handler,
    upload_product_images_handler, upload_to_wordpress_handler, upload_to_youtube_handler,
    wp_status_by_job_handler, wp_status_handler,
};

/// Shared application state
#[derive(Clone)]
pub struct AxumAppState {
    pub deps: Arc<ServerDeps>,
}

/// Build the Axum application router
pub fn build_app(deps: Arc<ServerDeps>) -> Router {
    let app_state = AxumAppState { deps };

    Router::new()
        // Health check (GET also answers HEAD)
        .route("/", get(health_handler))
        // YouTube
        .route("/upload-to-youtube", post(upload_to_youtube_handler))
        .route("/status-check", get(status_check_handler))
        // WordPress
        .route("/upload-to-wordpress", post(upload_to_wordpress_handler))
        .route("/wp-status", get(wp_status_handler))
        .route("/wp-status-by-job", get(wp_status_by_job_handler))
        .route("/upload-image-to-wordpress", post(upload_image_handler))
        .route("/upload-product-images", post(upload_product_images_handler))
        // Catalog
        .route("/products", get(products_handler))
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(middleware::from_fn(request_id))
        .layer(Extension(app_state))
        .layer(TraceLayer::new_for_http())
}
