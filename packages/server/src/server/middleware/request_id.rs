use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Tag each request with an 8-char id, log its arrival and final status, and
/// echo the id back in `x-request-id`.
pub async fn request_id(request: Request, next: Next) -> Response {
    let id = Uuid::new_v4().simple().to_string()[..8].to_string();
    let span = info_span!("request", id = %id);

    let method = request.method().clone();
    let path = request.uri().path().to_string();

    async move {
        info!(%method, %path, "received");
        let mut response = next.run(request).await;
        info!(status = response.status().as_u16(), "-> {}", response.status());
        if let Ok(value) = HeaderValue::from_str(&id) {
            response.headers_mut().insert(REQUEST_ID_HEADER, value);
        }
        response
    }
    .instrument(span)
    .await
}
