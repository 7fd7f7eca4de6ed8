//! E2E tests: notification sessions fed by polling the mock jobs API.

use std::sync::Arc;
use std::time::Duration;

use funding_jobs_lib::models::ws_event::SubscribePayload;
use funding_jobs_lib::models::{
    ClientMessage, JobMonitoringFilter, MonitorMode, ServerMessage, SubscriptionRequest,
};
use funding_jobs_lib::services::{
    JobFeed, JobStatusSource, NotificationSession, PollEvent, SessionChannels,
};
use serde_json::json;

use super::mock_jobs_api::MockJobsApi;
use super::test_helpers::*;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

fn start_session(mock: &MockJobsApi, feed: JobFeed) -> (NotificationSession, SessionChannels) {
    let source: Arc<dyn JobStatusSource> = Arc::new(test_client(&mock.base_url));
    NotificationSession::new(source, feed, POLL_INTERVAL)
}

fn subscribe(session: &mut NotificationSession, request: SubscriptionRequest) {
    let replies = session.handle_client_message(ClientMessage::Subscribe(SubscribePayload {
        correlation_id: None,
        request,
    }));
    assert!(matches!(replies[0], ServerMessage::Subscribed(_)));
}

async fn next_poll_event(channels: &mut SessionChannels) -> PollEvent {
    tokio::time::timeout(Duration::from_secs(5), channels.poll_events.recv())
        .await
        .expect("timed out waiting for a poll event")
        .expect("poll channel closed")
}

#[actix_rt::test]
async fn test_polling_picks_up_status_changes() {
    let mock = MockJobsApi::start().await;
    mock.put_job(job_json("job-1", "InProgress", None));
    let (mut session, mut channels) = start_session(&mock, JobFeed::new());

    subscribe(
        &mut session,
        SubscriptionRequest::new(JobMonitoringFilter::for_job("job-1")),
    );

    let first = session.handle_poll_event(next_poll_event(&mut channels).await);
    match first {
        Some(ServerMessage::Notifications(payload)) => {
            let job = payload.latest_job.expect("job recorded");
            assert!(job.is_active);
        }
        other => panic!("expected notifications, got {:?}", other),
    }

    let mut finished = job_json("job-1", "Completed", Some("Succeeded"));
    finished["lastUpdated"] = json!("2024-03-01T09:05:00Z");
    mock.put_job(finished);

    // Keep polling until the completed record lands
    let job = loop {
        if let Some(ServerMessage::Notifications(payload)) =
            session.handle_poll_event(next_poll_event(&mut channels).await)
        {
            let job = payload.latest_job.expect("job recorded");
            if job.is_complete {
                break job;
            }
        }
    };
    assert!(job.is_successful);
    assert_eq!(job.status_description, "completed successfully");
}

#[actix_rt::test]
async fn test_prior_notifications_for_specification() {
    let mock = MockJobsApi::start().await;
    mock.put_latest(
        "spec-1",
        "RefreshFundingJob",
        job_json("job-7", "Completed", Some("Failed")),
    );
    let (mut session, mut channels) = start_session(&mock, JobFeed::new());

    subscribe(
        &mut session,
        SubscriptionRequest::new(
            JobMonitoringFilter::for_specification("spec-1")
                .with_job_types([funding_jobs_lib::models::JobType::RefreshFundingJob]),
        )
        .monitor_mode(MonitorMode::Push)
        .fetch_prior_notifications(true),
    );

    match session.handle_poll_event(next_poll_event(&mut channels).await) {
        Some(ServerMessage::Notifications(payload)) => {
            assert_eq!(payload.display.len(), 1);
            assert_eq!(payload.display[0].title, "Job failed: Refreshing funding");
        }
        other => panic!("expected notifications, got {:?}", other),
    }
    assert!(mock.requests()[0].path.starts_with("/api/jobs/latest/spec-1/"));
}

#[actix_rt::test]
async fn test_prior_notifications_include_latest_success() {
    let mock = MockJobsApi::start().await;
    mock.put_latest(
        "spec-1",
        "RefreshFundingJob",
        job_json("job-7", "Completed", Some("Failed")),
    );
    mock.put_latest_success(
        "spec-1",
        "RefreshFundingJob",
        job_json("job-6", "Completed", Some("Succeeded")),
    );
    let (mut session, mut channels) = start_session(&mock, JobFeed::new());

    subscribe(
        &mut session,
        SubscriptionRequest::new(
            JobMonitoringFilter::for_specification("spec-1")
                .with_job_types([funding_jobs_lib::models::JobType::RefreshFundingJob]),
        )
        .monitor_fallback(funding_jobs_lib::models::MonitorFallback::None)
        .fetch_prior_notifications(true),
    );

    let first = next_poll_event(&mut channels).await;
    let second = next_poll_event(&mut channels).await;
    let ids: Vec<_> = [&first, &second]
        .iter()
        .map(|event| match event {
            PollEvent::Job { record, .. } => record.id.clone().unwrap_or_default(),
            other => panic!("expected a job, got {:?}", other),
        })
        .collect();
    assert_eq!(ids, vec!["job-6".to_string(), "job-7".to_string()]);

    let paths: Vec<_> = mock.requests().into_iter().map(|r| r.path).collect();
    assert!(paths.iter().any(|p| p.starts_with("/api/jobs/latest-success/spec-1/")));
}

#[actix_rt::test]
async fn test_poll_failures_reach_the_client() {
    let mock = MockJobsApi::start().await;
    mock.fail_with(503);
    let (mut session, mut channels) = start_session(&mock, JobFeed::new());

    subscribe(
        &mut session,
        SubscriptionRequest::new(JobMonitoringFilter::for_job("job-1")),
    );

    let event = next_poll_event(&mut channels).await;
    assert!(matches!(event, PollEvent::Failed { .. }));
    assert!(session.handle_poll_event(event).is_none());

    match channels.outbox.try_recv() {
        Ok(ServerMessage::JobError(payload)) => {
            assert!(payload.message.contains("503"), "message: {}", payload.message);
        }
        other => panic!("expected job error, got {:?}", other),
    }
}

#[actix_rt::test]
async fn test_attached_push_stream_suspends_polling() {
    let mock = MockJobsApi::start().await;
    mock.put_job(job_json("job-1", "Queued", None));
    let feed = JobFeed::new();
    let stream = feed.attach_push();
    let (mut session, _channels) = start_session(&mock, feed);

    subscribe(
        &mut session,
        SubscriptionRequest::new(JobMonitoringFilter::for_job("job-1")),
    );
    tokio::time::sleep(POLL_INTERVAL * 4).await;
    assert!(mock.requests().is_empty());

    drop(stream);
    tokio::time::sleep(POLL_INTERVAL * 4).await;
    assert!(!mock.requests().is_empty());

    session.close();
}
