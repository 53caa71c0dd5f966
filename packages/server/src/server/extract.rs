use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;
use tracing::debug;

/// JSON body that never rejects. Webhook senders post empty or broken bodies
/// now and then; those become `T::default()` and fail validation downstream
/// with a proper 400 instead of axum's extractor rejection.
#[derive(Debug, Clone, Default)]
pub struct LenientJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for LenientJson<T>
where
    T: DeserializeOwned + Default,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = match Bytes::from_request(req, state).await {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!(error = %e, "could not read request body");
                return Ok(Self(T::default()));
            }
        };
        Ok(Self(parse_lenient(&bytes)))
    }
}

pub fn parse_lenient<T: DeserializeOwned + Default>(bytes: &[u8]) -> T {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return T::default();
    }
    match serde_json::from_slice(bytes) {
        Ok(value) => value,
        Err(e) => {
            debug!(error = %e, "malformed JSON body treated as empty");
            T::default()
        }
    }
}
