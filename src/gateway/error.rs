//! Gateway error types

use thiserror::Error;

/// Gateway error with classification
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct GatewayError {
    pub kind: GatewayErrorKind,
    pub message: String,
}

impl GatewayError {
    pub fn new(kind: GatewayErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Unavailable, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::NotFound, message)
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Server, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Rejected, message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Decode, message)
    }

    /// Classify a non-success HTTP status
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let detail = extract_detail(body);
        match status.as_u16() {
            404 => Self::not_found(format!("Not found: {detail}")),
            400..=499 => Self::rejected(format!("Request rejected ({status}): {detail}")),
            _ => Self::server(format!("Server error ({status}): {detail}")),
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::decode(format!("Malformed response: {e}"))
        } else {
            Self::unavailable(format!("Transport failure: {e}"))
        }
    }
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayErrorKind {
    /// Connection refused, timeouts, DNS - the service could not be reached
    Unavailable,
    /// Unknown session or resource (404)
    NotFound,
    /// Server-side failure (5xx)
    Server,
    /// Request refused by the service (other 4xx)
    Rejected,
    /// Response body did not match the contract
    Decode,
}

impl GatewayErrorKind {
    pub fn is_unavailable(self) -> bool {
        matches!(self, Self::Unavailable)
    }
}

/// The service reports failures as `{"detail": "..."}`; fall back to the raw body.
fn extract_detail(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(String::from))
        .unwrap_or_else(|| body.trim().to_string())
}
