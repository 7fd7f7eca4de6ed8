//! Actix-web extractor for push ingress authentication.
//!
//! # Security
//! - The provided key is wrapped in `SecretString` as soon as it is read
//! - Secret values are never logged or exposed in debug output
//! - Comparison is constant-time

use actix_web::dev::Payload;
use actix_web::http::StatusCode;
use actix_web::{FromRequest, HttpRequest, HttpResponse, ResponseError, web};
use secrecy::{ExposeSecret, SecretString};
use std::future::{Ready, ready};

use super::IngestKey;
use crate::config::INGEST_KEY_HEADER;
use crate::error::ErrorResponse;

/// Extract a secret header value, wrapping it in SecretString.
/// Returns None if the header is missing or invalid UTF-8.
fn extract_secret_header(req: &HttpRequest, header_name: &str) -> Option<SecretString> {
    req.headers()
        .get(header_name)
        .and_then(|v| v.to_str().ok())
        .map(|s| SecretString::from(s.to_string()))
}

/// Authentication error for extractors.
#[derive(Debug)]
pub struct AuthError {
    message: String,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl ResponseError for AuthError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::UNAUTHORIZED).json(ErrorResponse {
            error: "UNAUTHORIZED".to_string(),
            message: self.message.clone(),
        })
    }
}

/// Extractor that requires a valid ingest key.
///
/// ```ignore
/// async fn ingest(_auth: IngestAuth, body: web::Json<RawJobRecord>) -> impl Responder {
///     // only the jobs service gets here
/// }
/// ```
pub struct IngestAuth;

impl FromRequest for IngestAuth {
    type Error = AuthError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let Some(stored) = req.app_data::<web::Data<IngestKey>>() else {
            return ready(Err(AuthError {
                message: "Internal configuration error".to_string(),
            }));
        };

        let result = match extract_secret_header(req, INGEST_KEY_HEADER) {
            Some(provided) if stored.verify(provided.expose_secret()) => Ok(IngestAuth),
            Some(_) => Err(AuthError {
                message: "Invalid ingest key".to_string(),
            }),
            None => Err(AuthError {
                message: format!("Missing ingest key. Provide {} header.", INGEST_KEY_HEADER),
            }),
        };
        ready(result)
    }
}
