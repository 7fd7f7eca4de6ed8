//! Funding job notifications server - main entry point.
//!
//! Starts the Actix-web server with configured routes and middleware.

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, http::header, web};
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use funding_jobs_lib::api;
use funding_jobs_lib::auth::IngestKey;
use funding_jobs_lib::config::{Config, INGEST_KEY_HEADER};
use funding_jobs_lib::middleware::RequestLogger;
use funding_jobs_lib::services::{JobFeed, JobStatusSource, JobsApiClient};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Check for --health-check flag (used by Docker HEALTHCHECK)
    if std::env::args().any(|arg| arg == "--health-check") {
        dotenvy::dotenv().ok();
        std::process::exit(if Config::from_env().is_ok() { 0 } else { 1 });
    }

    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            error!("");
            error!("Please check your environment variables:");
            error!("  - RUST_ENV must be set to 'development' or 'production'");
            error!("  - In production, FJN_JOBS_API_URL and FJN_INGEST_KEY must be set");
            error!("  - In production, values must not match development defaults");
            std::process::exit(1);
        }
    };

    info!("========================================");
    info!("  Funding Job Notifications");
    info!("  Environment: {}", config.environment);
    info!("========================================");

    if config.is_development() {
        warn!("Running in DEVELOPMENT mode - do not use in production!");
        info!("Using development defaults for FJN_JOBS_API_URL and FJN_INGEST_KEY");
    }

    let client = JobsApiClient::new(
        &config.jobs_api_url,
        config.jobs_api_key.clone(),
        config.api_timeout,
    )
    .map_err(std::io::Error::other)?;
    let source: Arc<dyn JobStatusSource> = Arc::new(client);

    let feed = JobFeed::with_capacity(config.feed_capacity);
    info!(
        "Poll fallback every {}s, push feed capacity {}",
        config.poll_interval.as_secs(),
        config.feed_capacity
    );

    let ingest_key = IngestKey::new(config.ingest_key.clone());
    if !ingest_key.is_configured() {
        warn!("No ingest key configured, push ingress will reject every request");
    }

    let bind_address = config.bind_address();
    let is_development = config.is_development();

    let worker_count = if is_development {
        info!(
            "Starting server at http://{} (4 workers - development mode)",
            bind_address
        );
        4
    } else {
        let cpus = num_cpus::get();
        info!(
            "Starting server at http://{} ({} workers)",
            bind_address, cpus
        );
        cpus
    };

    let config = web::Data::new(config);
    let source = web::Data::from(source);

    let server = HttpServer::new(move || {
        let ingest_header = header::HeaderName::from_static("x-ingest-key");
        let cors = if is_development {
            Cors::default()
                .allowed_origin("http://localhost:3000")
                .allowed_origin("http://127.0.0.1:3000")
                .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE, ingest_header])
                .max_age(3600)
        } else {
            // Same-origin only in production
            Cors::default()
                .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE, ingest_header])
                .max_age(3600)
        };

        let mut app = App::new()
            .wrap(cors)
            .wrap(RequestLogger)
            .app_data(config.clone())
            .app_data(source.clone())
            .app_data(web::Data::new(feed.clone()))
            .app_data(web::Data::new(ingest_key.clone()))
            .service(
                web::scope("/api/v1")
                    .configure(api::configure_health_routes)
                    .configure(api::configure_job_event_routes)
                    .configure(api::configure_websocket_routes),
            );

        if is_development {
            app = app.service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", api::ApiDoc::openapi()),
            );
        }

        app
    });

    info!("Push ingress expects the {} header", INGEST_KEY_HEADER);

    server
        .workers(worker_count)
        .bind(&bind_address)?
        .run()
        .await
}
