//! Mock jobs API for E2E tests.
//!
//! Starts an in-process HTTP server that answers the jobs API routes from
//! in-memory state and records every request it sees.

use actix_web::{App, HttpRequest, HttpResponse, HttpServer, get, web};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::net::TcpListener;
use std::sync::{Arc, Mutex};

/// Request seen by the mock.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub path: String,
    pub api_key: Option<String>,
}

/// Shared state for the mock jobs API.
#[derive(Default)]
pub struct MockJobsState {
    pub jobs: HashMap<String, Value>,
    /// Specification id to job type to latest record (or null).
    pub latest: HashMap<String, Map<String, Value>>,
    pub latest_success: HashMap<(String, String), Value>,
    /// When set, every route answers with this status.
    pub fail_with: Option<u16>,
    /// When set, every route answers 200 with this raw body.
    pub raw_body: Option<String>,
    pub requests: Vec<SeenRequest>,
}

type SharedState = web::Data<Arc<Mutex<MockJobsState>>>;

/// Record the request and return an override response if one is configured.
fn intercept(state: &SharedState, req: &HttpRequest) -> Option<HttpResponse> {
    let mut state = state.lock().unwrap();
    state.requests.push(SeenRequest {
        path: req.path().to_string(),
        api_key: req
            .headers()
            .get("Ocp-Apim-Subscription-Key")
            .and_then(|v| v.to_str().ok())
            .map(String::from),
    });

    if let Some(status) = state.fail_with {
        let status = actix_web::http::StatusCode::from_u16(status).unwrap();
        return Some(HttpResponse::build(status).body("mock failure"));
    }
    state
        .raw_body
        .clone()
        .map(|body| HttpResponse::Ok().content_type("application/json").body(body))
}

fn json_or_not_found(value: Option<Value>) -> HttpResponse {
    match value {
        Some(value) => HttpResponse::Ok().json(value),
        None => HttpResponse::NotFound().finish(),
    }
}

#[get("/api/jobs/latest/{spec}")]
async fn latest_any(state: SharedState, req: HttpRequest, path: web::Path<String>) -> HttpResponse {
    if let Some(response) = intercept(&state, &req) {
        return response;
    }
    let state = state.lock().unwrap();
    json_or_not_found(state.latest.get(path.as_str()).cloned().map(Value::Object))
}

#[get("/api/jobs/latest/{spec}/{types}")]
async fn latest_of_types(
    state: SharedState,
    req: HttpRequest,
    path: web::Path<(String, String)>,
) -> HttpResponse {
    if let Some(response) = intercept(&state, &req) {
        return response;
    }
    let (spec, types) = path.into_inner();
    let state = state.lock().unwrap();
    let Some(latest) = state.latest.get(&spec) else {
        return HttpResponse::NotFound().finish();
    };

    let selected: Map<String, Value> = types
        .split(',')
        .map(|job_type| {
            let record = latest.get(job_type).cloned().unwrap_or(Value::Null);
            (job_type.to_string(), record)
        })
        .collect();
    HttpResponse::Ok().json(Value::Object(selected))
}

#[get("/api/jobs/latest-success/{spec}/{job_type}")]
async fn latest_success(
    state: SharedState,
    req: HttpRequest,
    path: web::Path<(String, String)>,
) -> HttpResponse {
    if let Some(response) = intercept(&state, &req) {
        return response;
    }
    let state = state.lock().unwrap();
    json_or_not_found(state.latest_success.get(&path.into_inner()).cloned())
}

#[get("/api/jobs/{job_id}")]
async fn job_by_id(state: SharedState, req: HttpRequest, path: web::Path<String>) -> HttpResponse {
    if let Some(response) = intercept(&state, &req) {
        return response;
    }
    let state = state.lock().unwrap();
    json_or_not_found(state.jobs.get(path.as_str()).cloned())
}

/// Mock jobs API server.
pub struct MockJobsApi {
    pub base_url: String,
    pub state: Arc<Mutex<MockJobsState>>,
}

impl MockJobsApi {
    /// Start the mock on an ephemeral port.
    pub async fn start() -> Self {
        let state = Arc::new(Mutex::new(MockJobsState::default()));

        let listener = TcpListener::bind("127.0.0.1:0").expect("failed to bind");
        let port = listener.local_addr().unwrap().port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let state_data = state.clone();
        let server = HttpServer::new(move || {
            App::new()
                .app_data(web::Data::new(state_data.clone()))
                .service(latest_any)
                .service(latest_of_types)
                .service(latest_success)
                .service(job_by_id)
        })
        .workers(1)
        .listen(listener)
        .expect("failed to listen")
        .disable_signals()
        .run();

        // Lives until the test runtime shuts down
        tokio::spawn(server);

        MockJobsApi { base_url, state }
    }

    pub fn put_job(&self, record: Value) {
        let id = record["id"].as_str().expect("record needs an id").to_string();
        self.state.lock().unwrap().jobs.insert(id, record);
    }

    pub fn put_latest(&self, spec: &str, job_type: &str, record: Value) {
        self.state
            .lock()
            .unwrap()
            .latest
            .entry(spec.to_string())
            .or_default()
            .insert(job_type.to_string(), record);
    }

    pub fn put_latest_success(&self, spec: &str, job_type: &str, record: Value) {
        self.state
            .lock()
            .unwrap()
            .latest_success
            .insert((spec.to_string(), job_type.to_string()), record);
    }

    pub fn fail_with(&self, status: u16) {
        self.state.lock().unwrap().fail_with = Some(status);
    }

    pub fn respond_with_raw(&self, body: &str) {
        self.state.lock().unwrap().raw_body = Some(body.to_string());
    }

    pub fn requests(&self) -> Vec<SeenRequest> {
        self.state.lock().unwrap().requests.clone()
    }
}
