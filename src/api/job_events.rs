//! Push ingress from the jobs service.
//!
//! The jobs service pushes raw job records either one request at a time through
//! the webhook, or over a long-lived WebSocket stream. Both paths publish into the
//! shared [`JobFeed`]. While at least one stream is attached, push-monitored
//! subscriptions stop polling.

use std::time::Instant;

use actix_web::{HttpRequest, HttpResponse, post, web};
use actix_ws::Message;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use super::websocket::{PING_INTERVAL, PONG_TIMEOUT};
use crate::auth::IngestAuth;
use crate::error::{AppError, AppResult};
use crate::models::RawJobRecord;
use crate::services::JobFeed;

/// One job record or a batch of them.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum JobEventBatch {
    Many(Vec<RawJobRecord>),
    One(Box<RawJobRecord>),
}

impl JobEventBatch {
    /// Unpack the batch, rejecting it whole if any record has no job id.
    pub fn into_records(self) -> AppResult<Vec<RawJobRecord>> {
        let records = match self {
            JobEventBatch::Many(records) => records,
            JobEventBatch::One(record) => vec![*record],
        };

        if let Some(index) = records.iter().position(|r| !has_job_id(r)) {
            return Err(AppError::InvalidInput(format!(
                "job record at index {} has no id",
                index
            )));
        }
        Ok(records)
    }
}

fn has_job_id(record: &RawJobRecord) -> bool {
    record
        .id
        .as_deref()
        .is_some_and(|id| !id.trim().is_empty())
}

/// Publish every record; returns the most sessions any record reached.
fn publish_all(feed: &JobFeed, records: Vec<RawJobRecord>) -> usize {
    records
        .into_iter()
        .map(|record| feed.publish(record))
        .max()
        .unwrap_or(0)
}

/// Webhook response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IngestResponse {
    /// Records published.
    pub accepted: usize,
    /// Sessions listening when the records were published.
    pub receivers: usize,
}

/// Accept pushed job records.
#[utoipa::path(
    post,
    path = "/api/v1/job-events",
    tag = "Job events",
    request_body = JobEventBatch,
    responses(
        (status = 202, description = "Records published", body = IngestResponse),
        (status = 400, description = "Malformed body or record without id", body = crate::error::ErrorResponse),
        (status = 401, description = "Missing or invalid ingest key", body = crate::error::ErrorResponse)
    ),
    security(("ingest_key" = []))
)]
#[post("/job-events")]
pub async fn ingest_job_events(
    _auth: IngestAuth,
    feed: web::Data<JobFeed>,
    body: web::Bytes,
) -> AppResult<HttpResponse> {
    let batch: JobEventBatch = serde_json::from_slice(&body)?;
    let records = batch.into_records()?;
    let accepted = records.len();
    let receivers = publish_all(&feed, records);

    debug!(accepted, receivers, "Job events published");
    Ok(HttpResponse::Accepted().json(IngestResponse {
        accepted,
        receivers,
    }))
}

/// Upgrade the jobs service connection to a push stream.
///
/// Authentication happens in the extractor, so bad keys get a 401 instead of a socket.
pub async fn job_event_stream(
    _auth: IngestAuth,
    req: HttpRequest,
    stream: web::Payload,
    feed: web::Data<JobFeed>,
) -> Result<HttpResponse, actix_web::Error> {
    let peer = req
        .connection_info()
        .realip_remote_addr()
        .map(String::from)
        .unwrap_or_else(|| "unknown".to_string());

    let (response, session, msg_stream) = actix_ws::handle(&req, stream)?;
    info!(peer = %peer, "Push stream connected");

    actix_web::rt::spawn(handle_push_stream(
        session,
        msg_stream,
        feed.get_ref().clone(),
        peer,
    ));

    Ok(response)
}

async fn handle_push_stream(
    mut session: actix_ws::Session,
    mut msg_stream: actix_ws::MessageStream,
    feed: JobFeed,
    peer: String,
) {
    // Held for the life of the stream; dropping it tells sessions push is gone.
    let _connection = feed.attach_push();

    let mut last_pong = Instant::now();
    let mut ping_interval = tokio::time::interval(PING_INTERVAL);

    loop {
        tokio::select! {
            msg = msg_stream.next() => {
                let payload = match msg {
                    Some(Ok(Message::Text(text))) => text.into_bytes(),
                    Some(Ok(Message::Binary(bytes))) => bytes,
                    Some(Ok(Message::Ping(bytes))) => {
                        if session.pong(&bytes).await.is_err() {
                            break;
                        }
                        continue;
                    }
                    Some(Ok(Message::Pong(_))) => {
                        last_pong = Instant::now();
                        continue;
                    }
                    Some(Ok(Message::Close(reason))) => {
                        info!(peer = %peer, reason = ?reason, "Push stream closed by peer");
                        break;
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        warn!(peer = %peer, error = %e, "Push stream protocol error");
                        break;
                    }
                    None => break,
                };

                let records = serde_json::from_slice::<JobEventBatch>(&payload)
                    .map_err(AppError::from)
                    .and_then(JobEventBatch::into_records);
                match records {
                    Ok(records) => {
                        let count = records.len();
                        let receivers = publish_all(&feed, records);
                        debug!(peer = %peer, count, receivers, "Pushed job records published");
                    }
                    Err(e) => {
                        warn!(peer = %peer, error = %e, "Rejected pushed job records");
                        let reply = serde_json::json!({ "error": e.to_string() }).to_string();
                        if session.text(reply).await.is_err() {
                            break;
                        }
                    }
                }
            }

            _ = ping_interval.tick() => {
                if last_pong.elapsed() > PING_INTERVAL + PONG_TIMEOUT {
                    warn!(peer = %peer, "Push stream pong timeout");
                    break;
                }
                if session.ping(b"").await.is_err() {
                    break;
                }
            }
        }
    }

    let _ = session.close(None).await;
    info!(peer = %peer, "Push stream disconnected");
}

/// Configure push ingress routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(ingest_job_events).service(
        web::resource("/job-events/stream").route(web::get().to(job_event_stream)),
    );
}
