//! Typed error taxonomy for API calls.
//!
//! DESIGN
//! ======
//! Every non-2xx response is converted into an [`ApiError`] exactly once, at
//! the HTTP wrapper boundary. Validation failures carry a structured
//! [`FieldErrors`] map parsed from the response body so callers never have to
//! inspect raw JSON to find out which field was rejected.
//!
//! Errors are `Clone` because a single refresh failure is broadcast to every
//! request waiting on it.

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;

/// Key used by the backend for errors that are not tied to a single field.
pub const NON_FIELD_KEY: &str = "non_field_errors";

const MAX_RAW_BODY_CHARS: usize = 200;

// =============================================================================
// FIELD ERRORS
// =============================================================================

/// Field name -> messages, as reported by the server for a rejected request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message for `field`.
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    /// Parse a response body into field errors.
    ///
    /// Accepts the shapes the backend produces: `{"field": ["msg", ...]}`,
    /// `{"field": "msg"}`, `{"detail": "msg"}`, nested objects (flattened to
    /// `parent.child`), a bare list of messages, or a bare string. Anything
    /// that is not JSON is kept verbatim (truncated) as a non-field error.
    #[must_use]
    pub fn from_body(body: &str) -> Self {
        let mut errors = Self::new();
        let trimmed = body.trim();
        if trimmed.is_empty() {
            return errors;
        }
        match serde_json::from_str::<Value>(trimmed) {
            Ok(Value::Object(map)) => {
                for (key, value) in map {
                    let field = if key == "detail" { NON_FIELD_KEY.to_owned() } else { key };
                    errors.collect(&field, &value);
                }
            }
            Ok(value) => errors.collect(NON_FIELD_KEY, &value),
            Err(_) => errors.push(NON_FIELD_KEY, truncate(trimmed)),
        }
        errors
    }

    fn collect(&mut self, field: &str, value: &Value) {
        match value {
            Value::String(s) => self.push(field, s.clone()),
            Value::Array(items) => {
                for item in items {
                    self.collect(field, item);
                }
            }
            Value::Object(map) => {
                for (key, nested) in map {
                    self.collect(&format!("{field}.{key}"), nested);
                }
            }
            Value::Null => {}
            other => self.push(field, other.to_string()),
        }
    }

    /// Messages recorded for `field`, empty when none.
    #[must_use]
    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    /// Messages not tied to a specific field.
    #[must_use]
    pub fn non_field(&self) -> &[String] {
        self.get(NON_FIELD_KEY)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// First message in field order, used as a one-line summary.
    #[must_use]
    pub fn first_message(&self) -> Option<&str> {
        self.non_field()
            .first()
            .or_else(|| self.0.values().flatten().next())
            .map(String::as_str)
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                first = false;
                if field == NON_FIELD_KEY {
                    f.write_str(message)?;
                } else {
                    write!(f, "{field}: {message}")?;
                }
            }
        }
        Ok(())
    }
}

fn truncate(raw: &str) -> String {
    if raw.chars().count() <= MAX_RAW_BODY_CHARS {
        return raw.to_owned();
    }
    let mut out: String = raw.chars().take(MAX_RAW_BODY_CHARS).collect();
    out.push('…');
    out
}

// =============================================================================
// ERROR KIND
// =============================================================================

/// Coarse error classes used for presentation and retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Auth,
    Validation,
    Server,
    NotFound,
    RateLimit,
    Unknown,
}

impl ErrorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Auth => "auth",
            Self::Validation => "validation",
            Self::Server => "server",
            Self::NotFound => "not_found",
            Self::RateLimit => "rate_limit",
            Self::Unknown => "unknown",
        }
    }
}

// =============================================================================
// API ERROR
// =============================================================================

/// Errors produced by API calls.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    /// Connectivity failure or timeout; no response was received.
    #[error("network error: {0}")]
    Network(String),

    /// HTTP 401, or a session that could not be refreshed.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// HTTP 403.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// HTTP 400 with per-field messages.
    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    /// HTTP 404.
    #[error("not found: {0}")]
    NotFound(String),

    /// HTTP 429.
    #[error("rate limited (429 Too Many Requests)")]
    RateLimited { retry_after_secs: Option<u64> },

    /// HTTP 5xx.
    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },

    /// Any other non-success status.
    #[error("unexpected response status {status}")]
    Unexpected { status: u16, body: String },

    /// A success response whose body did not match the expected shape.
    #[error("response decode failed: {0}")]
    Decode(String),

    /// The request URL could not be assembled.
    #[error("invalid request URL: {0}")]
    InvalidUrl(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl ApiError {
    /// Convert a non-success response into a typed error.
    #[must_use]
    pub fn from_response(status: u16, retry_after_secs: Option<u64>, body: &str) -> Self {
        match status {
            400 => Self::Validation(FieldErrors::from_body(body)),
            401 => Self::Unauthorized(detail_message(body, "authentication required")),
            403 => Self::Forbidden(detail_message(body, "permission denied")),
            404 => Self::NotFound(detail_message(body, "resource not found")),
            429 => Self::RateLimited { retry_after_secs },
            500..=599 => Self::Server { status, message: detail_message(body, "internal server error") },
            _ => Self::Unexpected { status, body: truncate(body.trim()) },
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network(_) => ErrorKind::Network,
            Self::Unauthorized(_) | Self::Forbidden(_) => ErrorKind::Auth,
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::RateLimited { .. } => ErrorKind::RateLimit,
            Self::Server { .. } => ErrorKind::Server,
            Self::Unexpected { .. } | Self::Decode(_) | Self::InvalidUrl(_) | Self::HttpClientBuild(_) => {
                ErrorKind::Unknown
            }
        }
    }

    /// HTTP status this error was built from, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized(_) => Some(401),
            Self::Forbidden(_) => Some(403),
            Self::Validation(_) => Some(400),
            Self::NotFound(_) => Some(404),
            Self::RateLimited { .. } => Some(429),
            Self::Server { status, .. } | Self::Unexpected { status, .. } => Some(*status),
            Self::Network(_) | Self::Decode(_) | Self::InvalidUrl(_) | Self::HttpClientBuild(_) => None,
        }
    }

    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Network(_) => "E_NETWORK",
            Self::Unauthorized(_) => "E_UNAUTHORIZED",
            Self::Forbidden(_) => "E_FORBIDDEN",
            Self::Validation(_) => "E_VALIDATION",
            Self::NotFound(_) => "E_NOT_FOUND",
            Self::RateLimited { .. } => "E_RATE_LIMITED",
            Self::Server { .. } => "E_SERVER",
            Self::Unexpected { .. } => "E_UNEXPECTED_STATUS",
            Self::Decode(_) => "E_DECODE",
            Self::InvalidUrl(_) => "E_INVALID_URL",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }

    /// Whether repeating the same call later may succeed.
    #[must_use]
    pub fn retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::RateLimited { .. } | Self::Server { .. })
    }
}

/// Pull a human-readable message out of an error body.
fn detail_message(body: &str, fallback: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body.trim()) {
        for key in ["detail", "message", "error"] {
            if let Some(Value::String(s)) = map.get(key) {
                return s.clone();
            }
        }
    }
    FieldErrors::from_body(body)
        .first_message()
        .map_or_else(|| fallback.to_owned(), str::to_owned)
}
