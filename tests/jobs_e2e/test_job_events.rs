//! E2E tests: push ingress webhook and health endpoints.

use actix_web::test;
use funding_jobs_lib::services::JobFeed;
use serde_json::{Value, json};

use super::test_helpers::*;

#[actix_rt::test]
async fn test_missing_ingest_key_is_rejected() {
    let feed = JobFeed::new();
    let mut rx = feed.subscribe();
    let app = create_ingest_app(feed).await;

    let (status, body) = post_job_events(&app, None, job_json("job-1", "Queued", None)).await;

    assert_eq!(status, 401);
    assert_eq!(body["error"], "UNAUTHORIZED");
    assert!(rx.try_recv().is_err(), "nothing should be published");
}

#[actix_rt::test]
async fn test_wrong_ingest_key_is_rejected() {
    let app = create_ingest_app(JobFeed::new()).await;

    let (status, _) =
        post_job_events(&app, Some("not-the-key"), job_json("job-1", "Queued", None)).await;

    assert_eq!(status, 401);
}

#[actix_rt::test]
async fn test_single_record_is_published() {
    let feed = JobFeed::new();
    let mut rx = feed.subscribe();
    let app = create_ingest_app(feed).await;

    let (status, body) = post_job_events(
        &app,
        Some(TEST_INGEST_KEY),
        job_json("job-1", "InProgress", None),
    )
    .await;

    assert_eq!(status, 202, "unexpected response: {}", body);
    assert_eq!(body["accepted"], 1);
    assert_eq!(body["receivers"], 1);
    let record = rx.try_recv().expect("record should be published");
    assert_eq!(record.id.as_deref(), Some("job-1"));
}

#[actix_rt::test]
async fn test_batch_is_published_in_order() {
    let feed = JobFeed::new();
    let mut rx = feed.subscribe();
    let app = create_ingest_app(feed).await;

    let batch = json!([
        job_json("job-1", "Queued", None),
        job_json("job-2", "Completed", Some("Failed")),
    ]);
    let (status, body) = post_job_events(&app, Some(TEST_INGEST_KEY), batch).await;

    assert_eq!(status, 202);
    assert_eq!(body["accepted"], 2);
    assert_eq!(rx.try_recv().unwrap().id.as_deref(), Some("job-1"));
    assert_eq!(rx.try_recv().unwrap().id.as_deref(), Some("job-2"));
}

#[actix_rt::test]
async fn test_record_without_id_rejects_whole_batch() {
    let feed = JobFeed::new();
    let mut rx = feed.subscribe();
    let app = create_ingest_app(feed).await;

    let batch = json!([
        job_json("job-1", "Queued", None),
        { "runningStatus": "Queued" },
    ]);
    let (status, body) = post_job_events(&app, Some(TEST_INGEST_KEY), batch).await;

    assert_eq!(status, 400);
    assert_eq!(body["error"], "INVALID_INPUT");
    assert!(rx.try_recv().is_err(), "nothing should be published");
}

#[actix_rt::test]
async fn test_non_record_body_is_rejected() {
    let app = create_ingest_app(JobFeed::new()).await;

    let (status, body) = post_job_events(&app, Some(TEST_INGEST_KEY), json!("job-1")).await;

    assert_eq!(status, 400);
    assert_eq!(body["error"], "INVALID_INPUT");
}

#[actix_rt::test]
async fn test_publish_without_sessions_reports_zero_receivers() {
    let app = create_ingest_app(JobFeed::new()).await;

    let (status, body) = post_job_events(
        &app,
        Some(TEST_INGEST_KEY),
        job_json("job-1", "Queued", None),
    )
    .await;

    assert_eq!(status, 202);
    assert_eq!(body["receivers"], 0);
}

#[actix_rt::test]
async fn test_ready_reports_push_state() {
    let feed = JobFeed::new();
    let app = create_ingest_app(feed.clone()).await;

    let req = test::TestRequest::get().uri("/api/v1/ready").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "ready");
    assert_eq!(body["push"], "polling");

    let _stream = feed.attach_push();
    let req = test::TestRequest::get().uri("/api/v1/ready").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["push"], "connected");
}

#[actix_rt::test]
async fn test_info_and_health() {
    let app = create_ingest_app(JobFeed::new()).await;

    let req = test::TestRequest::get().uri("/api/v1/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "healthy");

    let req = test::TestRequest::get().uri("/api/v1/info").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["environment"], "development");
    assert_eq!(body["push_streams"], 0);
}
