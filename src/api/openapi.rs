//! OpenAPI documentation configuration.

use utoipa::OpenApi;

use crate::config::INGEST_KEY_HEADER;
use crate::{api, error, models};

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Funding Job Notifications",
        version = "0.1.0",
        description = "Push ingress for funding job records and WebSocket job notifications with a polling fallback"
    ),
    servers(
        (url = "/", description = "Local server")
    ),
    paths(
        // Health endpoints
        api::health::health,
        api::health::ready,
        api::health::info,
        // Push ingress
        api::job_events::ingest_job_events,
    ),
    components(
        schemas(
            // Common
            error::ErrorResponse,
            // Health
            api::health::HealthResponse,
            api::health::ReadyResponse,
            api::health::ServerInfoResponse,
            // Job events
            api::job_events::JobEventBatch,
            api::job_events::IngestResponse,
            models::RawJobRecord,
            models::JobTrigger,
            models::JobOutcome,
            models::JobType,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Job events", description = "Job records pushed by the jobs service")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Add ingest key security scheme.
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "ingest_key",
                utoipa::openapi::security::SecurityScheme::ApiKey(
                    utoipa::openapi::security::ApiKey::Header(
                        utoipa::openapi::security::ApiKeyValue::new(INGEST_KEY_HEADER),
                    ),
                ),
            );
        }
    }
}
