//! E2E tests: jobs API client against the mock jobs API.

use funding_jobs_lib::error::TransportError;
use funding_jobs_lib::models::{JobType, JobTypeCode, RunningStatus};
use funding_jobs_lib::services::JobStatusSource;
use serde_json::Value;

use super::mock_jobs_api::MockJobsApi;
use super::test_helpers::*;

#[actix_rt::test]
async fn test_get_job_sends_api_key() {
    let mock = MockJobsApi::start().await;
    mock.put_job(job_json("job-1", "InProgress", None));
    let client = test_client(&mock.base_url);

    let record = client.get_job("job-1").await.unwrap().expect("job exists");

    assert_eq!(record.id.as_deref(), Some("job-1"));
    assert_eq!(record.running_status, Some(RunningStatus::InProgress));
    assert_eq!(
        record.job_type,
        Some(JobTypeCode::Known(JobType::RefreshFundingJob))
    );

    let requests = mock.requests();
    assert_eq!(requests[0].path, "/api/jobs/job-1");
    assert_eq!(requests[0].api_key.as_deref(), Some(TEST_API_KEY));
}

#[actix_rt::test]
async fn test_unknown_job_is_none() {
    let mock = MockJobsApi::start().await;
    let client = test_client(&mock.base_url);

    assert!(client.get_job("missing").await.unwrap().is_none());
}

#[actix_rt::test]
async fn test_latest_jobs_skip_types_without_jobs() {
    let mock = MockJobsApi::start().await;
    mock.put_latest(
        "spec-1",
        "RefreshFundingJob",
        job_json("job-1", "Completed", Some("Succeeded")),
    );
    mock.put_latest("spec-1", "ApproveAllProviderFundingJob", Value::Null);
    let client = test_client(&mock.base_url);

    let records = client
        .get_latest_jobs(
            "spec-1",
            &[
                JobType::RefreshFundingJob.into(),
                JobType::ApproveAllProviderFundingJob.into(),
            ],
        )
        .await
        .unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id.as_deref(), Some("job-1"));
    assert_eq!(
        mock.requests()[0].path,
        "/api/jobs/latest/spec-1/RefreshFundingJob,ApproveAllProviderFundingJob"
    );
}

#[actix_rt::test]
async fn test_latest_jobs_of_any_type() {
    let mock = MockJobsApi::start().await;
    mock.put_latest("spec-1", "RefreshFundingJob", job_json("job-1", "Queued", None));
    mock.put_latest("spec-1", "ReIndexPublishedProvidersJob", job_json("job-2", "Queued", None));
    let client = test_client(&mock.base_url);

    let records = client.get_latest_jobs("spec-1", &[]).await.unwrap();
    assert_eq!(records.len(), 2);

    assert!(client.get_latest_jobs("spec-unknown", &[]).await.unwrap().is_empty());
}

#[actix_rt::test]
async fn test_latest_successful_job() {
    let mock = MockJobsApi::start().await;
    mock.put_latest_success(
        "spec-1",
        "RefreshFundingJob",
        job_json("job-ok", "Completed", Some("Succeeded")),
    );
    let client = test_client(&mock.base_url);

    let record = client
        .get_latest_successful_job("spec-1", &JobType::RefreshFundingJob.into())
        .await
        .unwrap()
        .expect("successful job exists");
    assert_eq!(record.id.as_deref(), Some("job-ok"));

    let none = client
        .get_latest_successful_job("spec-1", &JobType::ApproveAllProviderFundingJob.into())
        .await
        .unwrap();
    assert!(none.is_none());
}

#[actix_rt::test]
async fn test_server_error_is_reported() {
    let mock = MockJobsApi::start().await;
    mock.fail_with(500);
    let client = test_client(&mock.base_url);

    match client.get_job("job-1").await {
        Err(TransportError::Status { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "mock failure");
        }
        other => panic!("expected status error, got {:?}", other),
    }
}

#[actix_rt::test]
async fn test_malformed_body_is_decode_error() {
    let mock = MockJobsApi::start().await;
    mock.respond_with_raw("{not json");
    let client = test_client(&mock.base_url);

    assert!(matches!(
        client.get_job("job-1").await,
        Err(TransportError::Decode(_))
    ));
}

#[actix_rt::test]
async fn test_unreachable_api_is_request_error() {
    // Port 1 is reserved and nothing listens on it
    let client = test_client("http://127.0.0.1:1");

    assert!(matches!(
        client.get_job("job-1").await,
        Err(TransportError::Request(_))
    ));
}
