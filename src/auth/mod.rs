//! Authentication of push ingress from the jobs service.

mod extractor;

use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;

pub use extractor::{AuthError, IngestAuth};

/// Wrapper type for the push ingest key.
/// Uses `SecretString` to prevent accidental logging and zeroize on drop.
///
/// # Security features
/// - `Debug` prints `[REDACTED]` instead of the actual value
/// - Memory is zeroed when dropped (via `zeroize`)
/// - Explicit `.expose_secret()` required to access the value
#[derive(Clone)]
pub struct IngestKey(Option<SecretString>);

impl IngestKey {
    pub fn new(key: Option<SecretString>) -> Self {
        Self(key)
    }

    /// True when a key is configured. Without one, all push ingress is rejected.
    pub fn is_configured(&self) -> bool {
        self.0.is_some()
    }

    /// Compare the provided key with the configured key in constant time.
    ///
    /// `ConstantTimeEq` returns false for unequal lengths without an early exit.
    pub fn verify(&self, provided: &str) -> bool {
        match &self.0 {
            Some(secret) => secret
                .expose_secret()
                .as_bytes()
                .ct_eq(provided.as_bytes())
                .into(),
            None => false,
        }
    }
}

impl std::fmt::Debug for IngestKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Some(_) => write!(f, "IngestKey([REDACTED])"),
            None => write!(f, "IngestKey(None)"),
        }
    }
}
