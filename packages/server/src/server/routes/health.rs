/// Liveness probe for the hosting platform. Answers GET and HEAD.
pub async fn health_handler() -> &'static str {
    "Media upload relay is live!"
}
