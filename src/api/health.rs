//! Health check endpoints.

use actix_web::{HttpResponse, get, web};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::config::Config;
use crate::services::JobFeed;

/// Health check response.
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    status: &'static str,
    timestamp: String,
}

/// Readiness check response.
#[derive(Serialize, ToSchema)]
pub struct ReadyResponse {
    status: &'static str,
    jobs_api: &'static str,
    /// `connected` while the jobs service has a push stream attached, else `polling`.
    push: &'static str,
}

/// Server information response.
#[derive(Serialize, ToSchema)]
pub struct ServerInfoResponse {
    name: &'static str,
    version: &'static str,
    environment: String,
    poll_interval_secs: u64,
    push_streams: usize,
}

/// Health check endpoint.
///
/// Returns 200 if the service is running.
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
#[get("/health")]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Readiness check endpoint.
///
/// Returns 200 once a jobs API is configured. Push being down does not make the
/// service unready; sessions fall back to polling.
#[utoipa::path(
    get,
    path = "/api/v1/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Service is ready", body = ReadyResponse),
        (status = 503, description = "Service unavailable")
    )
)]
#[get("/ready")]
pub async fn ready(config: web::Data<Config>, feed: web::Data<JobFeed>) -> HttpResponse {
    if config.jobs_api_url.trim().is_empty() {
        return HttpResponse::ServiceUnavailable().json(serde_json::json!({
            "error": "NOT_READY",
            "message": "Jobs API URL is not configured"
        }));
    }

    HttpResponse::Ok().json(ReadyResponse {
        status: "ready",
        jobs_api: "configured",
        push: if feed.push_connected() {
            "connected"
        } else {
            "polling"
        },
    })
}

/// Server information endpoint.
#[utoipa::path(
    get,
    path = "/api/v1/info",
    tag = "Health",
    responses(
        (status = 200, description = "Server information", body = ServerInfoResponse)
    )
)]
#[get("/info")]
pub async fn info(config: web::Data<Config>, feed: web::Data<JobFeed>) -> HttpResponse {
    HttpResponse::Ok().json(ServerInfoResponse {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        environment: config.environment.to_string(),
        poll_interval_secs: config.poll_interval.as_secs(),
        push_streams: feed.push_streams(),
    })
}

/// Configure health routes.
pub fn configure_health_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health).service(ready).service(info);
}
