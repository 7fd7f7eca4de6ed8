//! API endpoint modules.

pub mod health;
pub mod job_events;
pub mod openapi;
pub mod websocket;

pub use health::configure_health_routes;
pub use job_events::configure_routes as configure_job_event_routes;
pub use openapi::ApiDoc;
pub use websocket::configure_routes as configure_websocket_routes;
