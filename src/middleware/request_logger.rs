//! Request logging middleware.
//!
//! Every request gets a short id so the start and finish lines can be paired in
//! the logs. WebSocket upgrades are logged when the handshake completes; the
//! session itself logs its own lifecycle.

use actix_web::Error;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready};
use actix_web::http::header;
use futures_util::future::LocalBoxFuture;
use std::future::{Ready, ready};
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::INGEST_KEY_HEADER;

/// Request logger middleware factory.
pub struct RequestLogger;

impl<S, B> Transform<S, ServiceRequest> for RequestLogger
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestLoggerMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestLoggerMiddleware { service }))
    }
}

pub struct RequestLoggerMiddleware<S> {
    service: S,
}

/// Fields captured before the request is handed to the inner service.
struct RequestSummary {
    request_id: String,
    method: String,
    path: String,
    started: Instant,
}

impl RequestSummary {
    fn capture(req: &ServiceRequest) -> Self {
        let mut request_id = Uuid::new_v4().simple().to_string();
        request_id.truncate(8);
        Self {
            request_id,
            method: req.method().to_string(),
            path: req.path().to_string(),
            started: Instant::now(),
        }
    }
}

fn is_websocket_upgrade(req: &ServiceRequest) -> bool {
    req.headers()
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("websocket"))
}

impl<S, B> Service<ServiceRequest> for RequestLoggerMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let summary = RequestSummary::capture(&req);
        let remote_addr = req
            .connection_info()
            .realip_remote_addr()
            .unwrap_or("unknown")
            .to_string();

        info!(
            target: "api",
            request_id = %summary.request_id,
            method = %summary.method,
            path = %summary.path,
            query = %req.query_string(),
            remote_addr = %remote_addr,
            // Only presence is logged, never the key.
            ingest_key = req.headers().contains_key(INGEST_KEY_HEADER),
            websocket = is_websocket_upgrade(&req),
            "→ Request started"
        );

        let fut = self.service.call(req);

        Box::pin(async move {
            let res = fut.await?;
            let status = res.status();
            let duration_ms = summary.started.elapsed().as_millis();

            if status.is_client_error() || status.is_server_error() {
                warn!(
                    target: "api",
                    request_id = %summary.request_id,
                    method = %summary.method,
                    path = %summary.path,
                    status = status.as_u16(),
                    duration_ms = %duration_ms,
                    "← Request failed"
                );
            } else {
                info!(
                    target: "api",
                    request_id = %summary.request_id,
                    method = %summary.method,
                    path = %summary.path,
                    status = status.as_u16(),
                    duration_ms = %duration_ms,
                    "← Request completed"
                );
            }

            Ok(res)
        })
    }
}
