//! Integration tests for the WordPress upload, reconciliation and image flows.

mod common;

use std::time::Duration;

use serde_json::json;
use test_context::test_context;
use uploader_core::kernel::jobs::{JobPatch, JobState};
use uploader_core::kernel::test_dependencies::{MockMediaLibrary, MockTransfer};
use uploader_core::kernel::TestDependencies;

use crate::common::{media_item_with_marker, png_bytes, TestHarness};

fn upload_body() -> serde_json::Value {
    json!({
        "video_url": "https://cdn.example/uploads/demo.mp4",
        "filename": "demo.mp4",
        "title": "Demo reel",
        "alt_text": "Machine demo",
        "post_id": "42",
    })
}

async fn admit(ctx: &TestHarness) -> String {
    let response = ctx.client().post_json("/upload-to-wordpress", &upload_body()).await;
    assert_eq!(response.status, 202);
    assert_eq!(response.json()["status"], "processing");
    response.json()["job_id"].as_str().unwrap().to_string()
}

#[test_context(TestHarness)]
#[tokio::test]
async fn upload_completes_and_applies_metadata(ctx: &TestHarness) {
    let job_id = admit(ctx).await;

    let record = ctx.wait_wordpress(&job_id, JobState::Completed).await;
    assert_eq!(record.get("attachment_id"), Some(&json!(100)));
    assert_eq!(
        record.get_str("source_url"),
        Some("https://example.com/wp-content/uploads/demo.mp4")
    );
    assert_eq!(record.get_str("filename"), Some("demo.mp4"));
    assert_eq!(record.get("metadata_update").unwrap()["ok"], true);

    let uploads = ctx.mocks.media_library.uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].description.as_deref(), Some(format!("job:{job_id}").as_str()));
    assert_eq!(uploads[0].mime_type, "video/mp4");

    let updates = ctx.mocks.media_library.updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].0, 100);
    assert_eq!(updates[0].1.title.as_deref(), Some("Demo reel"));
    assert_eq!(updates[0].1.alt_text.as_deref(), Some("Machine demo"));
    assert_eq!(updates[0].1.post, Some(42));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn wp_status_maps_state_to_status_code(ctx: &TestHarness) {
    let client = ctx.client();
    let job_id = admit(ctx).await;
    ctx.wait_wordpress(&job_id, JobState::Completed).await;

    let done = client.get(&format!("/wp-status?job_id={job_id}")).await;
    assert_eq!(done.status, 200);
    assert_eq!(done.json()["state"], "completed");

    ctx.deps
        .wordpress_jobs
        .patch("stuck", JobPatch::new().state(JobState::Processing))
        .await
        .unwrap();
    assert_eq!(client.get("/wp-status?job_id=stuck").await.status, 202);

    ctx.deps
        .wordpress_jobs
        .patch(
            "broken",
            JobPatch::new().state(JobState::Error).set("error", "Source download failed"),
        )
        .await
        .unwrap();
    let broken = client.get("/wp-status?job_id=broken").await;
    assert_eq!(broken.status, 500);
    assert_eq!(broken.json()["error"], "Source download failed");

    assert_eq!(client.get("/wp-status?job_id=nope").await.status, 404);
    assert_eq!(client.get("/wp-status").await.status, 400);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn missing_video_url_is_rejected(ctx: &TestHarness) {
    let response = ctx
        .client()
        .post_json("/upload-to-wordpress", &json!({"title": "no source"}))
        .await;

    assert_eq!(response.status, 400);
    assert_eq!(response.json()["error"], "Missing video_url");
    assert!(ctx.deps.wordpress_jobs.read_all().await.is_empty());
}

#[tokio::test]
async fn gateway_timeout_is_reconciled_by_marker() {
    let ctx = TestHarness::with_mocks(
        TestDependencies::new().mock_media_library(MockMediaLibrary::new().with_gateway_timeout()),
    );
    let client = ctx.client();
    let job_id = admit(&ctx).await;

    // The pipeline leaves the job pending with the marker as its verify token
    let mut record = ctx.deps.wordpress_jobs.get(&job_id).await.unwrap();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while record.get("verify_token").is_none() {
        assert!(tokio::time::Instant::now() < deadline, "verify_token never recorded");
        tokio::time::sleep(Duration::from_millis(10)).await;
        record = ctx.deps.wordpress_jobs.get(&job_id).await.unwrap();
    }
    assert_eq!(record.state, JobState::Processing);
    assert_eq!(record.get_str("verify_token"), Some(format!("job:{job_id}").as_str()));
    assert_eq!(record.get("upload_status"), Some(&json!(504)));
    assert_eq!(record.get("pending_metadata").unwrap()["post"], 42);

    assert_eq!(client.get(&format!("/wp-status?job_id={job_id}")).await.status, 202);

    let reconciled = client.get(&format!("/wp-status-by-job?job_id={job_id}")).await;
    assert_eq!(reconciled.status, 200);
    let body = reconciled.json();
    assert_eq!(body["state"], "completed");
    assert_eq!(body["attachment_id"], 100);
    assert!(body["reconciled_at"].as_str().is_some());
    assert_eq!(body["metadata_update"]["ok"], true);

    let status = client.get(&format!("/wp-status?job_id={job_id}")).await;
    assert_eq!(status.status, 200);
    assert_eq!(status.json()["state"], "completed");

    // A second lookup answers from the store without patching again
    let again = client.get(&format!("/wp-status-by-job?job_id={job_id}")).await;
    assert_eq!(again.status, 200);
    assert_eq!(again.json(), body);
    assert_eq!(ctx.mocks.media_library.updates().len(), 1);
}

#[tokio::test]
async fn reconciler_scans_recent_items_when_search_lags() {
    let ctx = TestHarness::with_mocks(
        TestDependencies::new().mock_media_library(MockMediaLibrary::new().with_search_blind()),
    );
    ctx.deps
        .wordpress_jobs
        .patch(
            "lagging",
            JobPatch::new()
                .state(JobState::Processing)
                .set("verify_token", "job:lagging"),
        )
        .await
        .unwrap();

    let client = ctx.client();
    let pending = client.get("/wp-status-by-job?job_id=lagging").await;
    assert_eq!(pending.status, 202);
    assert_eq!(pending.json()["state"], "processing");

    let ctx = TestHarness::with_mocks(TestDependencies::new().mock_media_library(
        MockMediaLibrary::new()
            .with_search_blind()
            .with_item(media_item_with_marker(555, "<p>job:lagging</p>")),
    ));
    ctx.deps
        .wordpress_jobs
        .patch("lagging", JobPatch::new().state(JobState::Processing))
        .await
        .unwrap();

    let found = ctx.client().get("/wp-status-by-job?job_id=lagging").await;
    assert_eq!(found.status, 200);
    assert_eq!(found.json()["attachment_id"], 555);
}

#[tokio::test]
async fn reconciler_search_failure_leaves_record_untouched() {
    let ctx = TestHarness::with_mocks(
        TestDependencies::new().mock_media_library(MockMediaLibrary::new().failing_search()),
    );
    ctx.deps
        .wordpress_jobs
        .patch("job-x", JobPatch::new().state(JobState::Processing))
        .await
        .unwrap();
    let before = ctx.deps.wordpress_jobs.get("job-x").await.unwrap();

    let response = ctx.client().get("/wp-status-by-job?job_id=job-x").await;

    assert_eq!(response.status, 500);
    assert!(response.json()["error"].as_str().unwrap().contains("503"));
    assert_eq!(ctx.deps.wordpress_jobs.get("job-x").await.unwrap(), before);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn reconciler_unknown_failed_and_missing(ctx: &TestHarness) {
    let client = ctx.client();
    assert_eq!(client.get("/wp-status-by-job?job_id=ghost").await.status, 404);
    assert_eq!(client.get("/wp-status-by-job").await.status, 400);

    ctx.deps
        .wordpress_jobs
        .patch("failed", JobPatch::new().state(JobState::Error).set("error", "boom"))
        .await
        .unwrap();
    let failed = client.get("/wp-status-by-job?job_id=failed").await;
    assert_eq!(failed.status, 500);
    assert_eq!(failed.json()["state"], "error");
}

#[tokio::test]
async fn rejected_credentials_end_in_error() {
    let ctx = TestHarness::with_mocks(
        TestDependencies::new().mock_media_library(MockMediaLibrary::new().rejecting_credentials()),
    );
    let job_id = admit(&ctx).await;

    let record = ctx.wait_wordpress(&job_id, JobState::Error).await;
    assert!(record.get_str("error").unwrap().contains("WordPress authentication failed"));
    assert!(ctx.mocks.media_library.uploads().is_empty());
}

#[tokio::test]
async fn metadata_failure_is_not_fatal() {
    let ctx = TestHarness::with_mocks(
        TestDependencies::new().mock_media_library(MockMediaLibrary::new().failing_update()),
    );
    let job_id = admit(&ctx).await;

    let record = ctx.wait_wordpress(&job_id, JobState::Completed).await;
    assert_eq!(record.get("metadata_update").unwrap()["ok"], false);
}

#[tokio::test]
async fn error_state_is_absorbing() {
    let ctx = TestHarness::new();
    let store = &ctx.deps.wordpress_jobs;
    store
        .patch("done", JobPatch::new().state(JobState::Error).set("error", "first"))
        .await
        .unwrap();

    let record = store
        .patch("done", JobPatch::new().state(JobState::Completed).set("note", "late"))
        .await
        .unwrap();

    assert_eq!(record.state, JobState::Error);
    assert_eq!(record.get_str("note"), Some("late"));
}

#[tokio::test]
async fn image_upload_is_normalized_and_attached() {
    let source = "https://cdn.example/photos/spindle.png?v=3";
    let ctx = TestHarness::with_mocks(
        TestDependencies::new().mock_transfer(MockTransfer::new().with_fixture(source, png_bytes(400, 400))),
    );

    let response = ctx
        .client()
        .post_json(
            "/upload-image-to-wordpress",
            &json!({"file_url": source, "post_id": 9, "alt_text": "Spindle"}),
        )
        .await;
    assert_eq!(response.status, 202);
    assert_eq!(response.json()["status"], "processing");

    ctx.settle_until(|| !ctx.mocks.media_library.updates().is_empty()).await;

    let uploads = ctx.mocks.media_library.uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].filename, "spindle.jpg");
    assert_eq!(uploads[0].mime_type, "image/jpeg");
    assert_eq!(uploads[0].alt_text.as_deref(), Some("Spindle"));

    let updates = ctx.mocks.media_library.updates();
    assert_eq!(updates[0].1.post, Some(9));

    // Image jobs keep no status records
    assert!(ctx.deps.wordpress_jobs.read_all().await.is_empty());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn image_upload_requires_file_url(ctx: &TestHarness) {
    let response = ctx.client().post_raw("/upload-image-to-wordpress", "{}").await;
    assert_eq!(response.status, 400);
    assert_eq!(response.json()["error"], "Missing file_url");
}

#[tokio::test]
async fn product_images_batch_reports_uploads_and_failures() {
    let ctx = TestHarness::with_mocks(
        TestDependencies::new().mock_transfer(
            MockTransfer::new()
                .with_fixture("https://shop.example/a.png", png_bytes(320, 240))
                .with_fixture("https://shop.example/b.png", png_bytes(1600, 400))
                .with_failure("https://shop.example/missing.png"),
        ),
    );

    let response = ctx
        .client()
        .post_json(
            "/upload-product-images",
            &json!({
                "image_urls": [
                    "https://shop.example/a.png?w=100",
                    "https://shop.example/a.png",
                    "https://shop.example/a_thumb.png",
                    "https://shop.example/b.png",
                    "https://shop.example/missing.png",
                    null,
                    ""
                ],
                "featured_url": "https://shop.example/b.png",
                "title_prefix": "Lathe",
                "alt_text": "Lathe photo",
            }),
        )
        .await;

    assert_eq!(response.status, 200);
    let body = response.json();
    assert_eq!(body["uploaded"], 2);
    assert_eq!(body["gallery_ids"], json!([100, 101]));
    assert_eq!(body["featured_id"], 101);
    assert_eq!(body["failed"].as_array().unwrap().len(), 1);
    assert_eq!(body["failed"][0]["url"], "https://shop.example/missing.png");

    let uploads = ctx.mocks.media_library.uploads();
    assert_eq!(uploads[0].title.as_deref(), Some("Lathe (1)"));
    assert_eq!(uploads[0].alt_text.as_deref(), Some("Lathe photo (1)"));
    assert_eq!(uploads[1].title.as_deref(), Some("Lathe (2)"));
    assert!(uploads.iter().all(|u| u.mime_type == "image/jpeg"));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn product_images_without_usable_urls_is_rejected(ctx: &TestHarness) {
    let response = ctx
        .client()
        .post_json(
            "/upload-product-images",
            &json!({"image_urls": ["https://shop.example/x_thumb.jpg", ""]}),
        )
        .await;

    assert_eq!(response.status, 400);
    assert_eq!(response.json()["error"], "No valid image_urls");
}
