//! Shared test helpers for job notification E2E tests.

use actix_web::{App, dev::ServiceResponse, test, web};
use funding_jobs_lib::auth::IngestKey;
use funding_jobs_lib::config::{Config, Environment};
use funding_jobs_lib::middleware::RequestLogger;
use funding_jobs_lib::services::{JobFeed, JobsApiClient};
use secrecy::SecretString;
use serde_json::{Value, json};
use std::time::Duration;

/// Ingest key used in tests.
pub const TEST_INGEST_KEY: &str = "test-ingest-key-for-e2e";

/// Jobs API key used in tests.
pub const TEST_API_KEY: &str = "test-jobs-api-key";

pub fn test_config(jobs_api_url: &str) -> Config {
    Config {
        environment: Environment::Development,
        host: "127.0.0.1".to_string(),
        port: 0,
        jobs_api_url: jobs_api_url.to_string(),
        jobs_api_key: Some(SecretString::from(TEST_API_KEY.to_string())),
        ingest_key: Some(SecretString::from(TEST_INGEST_KEY.to_string())),
        poll_interval: Duration::from_millis(50),
        api_timeout: Duration::from_secs(5),
        feed_capacity: 16,
    }
}

pub fn test_client(base_url: &str) -> JobsApiClient {
    JobsApiClient::new(
        base_url,
        Some(SecretString::from(TEST_API_KEY.to_string())),
        Duration::from_secs(5),
    )
    .expect("failed to build jobs API client")
}

/// A raw job record as the jobs service sends it.
pub fn job_json(id: &str, running: &str, completion: Option<&str>) -> Value {
    let mut record = json!({
        "id": id,
        "jobDefinitionId": "RefreshFundingJob",
        "runningStatus": running,
        "specificationId": "spec-1",
        "invokerUserDisplayName": "Test User",
        "lastUpdated": "2024-03-01T09:00:00Z",
    });
    if let Some(completion) = completion {
        record["completionStatus"] = json!(completion);
    }
    record
}

/// Create an app with the health and push ingress routes.
pub async fn create_ingest_app(
    feed: JobFeed,
) -> impl actix_web::dev::Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>
{
    let config = test_config("http://127.0.0.1:1");
    let ingest_key = IngestKey::new(config.ingest_key.clone());

    test::init_service(
        App::new()
            .wrap(RequestLogger)
            .app_data(web::Data::new(config))
            .app_data(web::Data::new(feed))
            .app_data(web::Data::new(ingest_key))
            .service(
                web::scope("/api/v1")
                    .configure(funding_jobs_lib::api::configure_health_routes)
                    .configure(funding_jobs_lib::api::configure_job_event_routes),
            ),
    )
    .await
}

/// POST a body to the webhook, optionally with an ingest key.
pub async fn post_job_events<S>(app: &S, key: Option<&str>, body: Value) -> (u16, Value)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let mut req = test::TestRequest::post()
        .uri("/api/v1/job-events")
        .set_json(body);
    if let Some(key) = key {
        req = req.insert_header(("X-Ingest-Key", key));
    }

    let resp = test::call_service(app, req.to_request()).await;
    let status = resp.status().as_u16();
    let body: Value = test::read_body_json(resp).await;
    (status, body)
}
