//! User-facing error presentation.
//!
//! `describe` maps a typed [`ApiError`] to a title, a message and an optional
//! follow-up action. `classify_message` does the same for errors that only
//! exist as text, by looking for status codes and well-known phrases.

#[cfg(test)]
#[path = "error_display_test.rs"]
mod error_display_test;

use crate::error::{ApiError, ErrorKind};

/// Follow-up the caller can offer next to an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SuggestedAction {
    /// Start a new session.
    SignIn,
    /// Return to the public post listing.
    Home,
}

impl SuggestedAction {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::SignIn => "Sign In",
            Self::Home => "Go Home",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorDisplay {
    pub kind: ErrorKind,
    pub title: &'static str,
    pub message: String,
    pub action: Option<SuggestedAction>,
    /// Whether trying again unchanged might succeed.
    pub retryable: bool,
}

impl ErrorDisplay {
    fn new(kind: ErrorKind, title: &'static str, message: impl Into<String>) -> Self {
        let retryable = matches!(kind, ErrorKind::Network | ErrorKind::Server | ErrorKind::RateLimit);
        Self { kind, title, message: message.into(), action: None, retryable }
    }

    fn with_action(mut self, action: SuggestedAction) -> Self {
        self.action = Some(action);
        self
    }
}

const NETWORK_MESSAGE: &str = "Unable to connect to the server. Please check your internet connection and try again.";
const AUTH_MESSAGE: &str = "You need to sign in to access this content.";
const VALIDATION_MESSAGE: &str = "The information provided is invalid. Please check your input and try again.";
const SERVER_MESSAGE: &str = "Our servers are experiencing issues. Please try again in a few moments.";
const RATE_LIMIT_MESSAGE: &str = "You are making requests too quickly. Please wait a moment before trying again.";
const FORBIDDEN_MESSAGE: &str = "You don't have permission to access this content.";
const NOT_FOUND_MESSAGE: &str = "The content you're looking for doesn't exist or has been moved.";
const UNKNOWN_MESSAGE: &str = "An unexpected error occurred. Please try again.";

fn network() -> ErrorDisplay {
    ErrorDisplay::new(ErrorKind::Network, "Connection Error", NETWORK_MESSAGE)
}

fn auth_required() -> ErrorDisplay {
    ErrorDisplay::new(ErrorKind::Auth, "Authentication Required", AUTH_MESSAGE).with_action(SuggestedAction::SignIn)
}

fn forbidden() -> ErrorDisplay {
    ErrorDisplay::new(ErrorKind::Auth, "Access Denied", FORBIDDEN_MESSAGE).with_action(SuggestedAction::Home)
}

fn not_found() -> ErrorDisplay {
    ErrorDisplay::new(ErrorKind::NotFound, "Content Not Found", NOT_FOUND_MESSAGE).with_action(SuggestedAction::Home)
}

fn server() -> ErrorDisplay {
    ErrorDisplay::new(ErrorKind::Server, "Server Error", SERVER_MESSAGE)
}

fn rate_limited(retry_after_secs: Option<u64>) -> ErrorDisplay {
    let message = match retry_after_secs {
        Some(secs) => format!("{RATE_LIMIT_MESSAGE} (retry in {secs}s)"),
        None => RATE_LIMIT_MESSAGE.to_owned(),
    };
    ErrorDisplay::new(ErrorKind::RateLimit, "Too Many Requests", message)
}

/// Presentation for a typed error.
#[must_use]
pub fn describe(error: &ApiError) -> ErrorDisplay {
    match error {
        ApiError::Network(_) => network(),
        ApiError::Unauthorized(_) => auth_required(),
        ApiError::Forbidden(_) => forbidden(),
        ApiError::NotFound(_) => not_found(),
        ApiError::RateLimited { retry_after_secs } => rate_limited(*retry_after_secs),
        ApiError::Server { .. } => server(),
        ApiError::Validation(fields) => {
            let message = if fields.is_empty() { VALIDATION_MESSAGE.to_owned() } else { fields.to_string() };
            ErrorDisplay::new(ErrorKind::Validation, "Invalid Request", message)
        }
        ApiError::Unexpected { .. }
        | ApiError::Decode(_)
        | ApiError::InvalidUrl(_)
        | ApiError::HttpClientBuild(_) => ErrorDisplay::new(ErrorKind::Unknown, "Something Went Wrong", error.to_string()),
    }
}

/// Presentation for an error known only by its message. Checks run in a fixed
/// order and the first match wins.
#[must_use]
pub fn classify_message(message: &str) -> ErrorDisplay {
    let has = |needles: &[&str]| needles.iter().any(|n| message.contains(n));

    if has(&["NetworkError", "Failed to fetch", "ERR_NETWORK"]) {
        network()
    } else if has(&["401", "Unauthorized", "authentication"]) {
        auth_required()
    } else if has(&["400", "validation", "Bad Request"]) {
        ErrorDisplay::new(ErrorKind::Validation, "Invalid Request", VALIDATION_MESSAGE)
    } else if has(&["500", "502", "503", "Internal Server Error"]) {
        server()
    } else if has(&["429", "Too Many Requests"]) {
        rate_limited(None)
    } else if has(&["403", "Forbidden"]) {
        forbidden()
    } else if has(&["404", "Not Found"]) {
        not_found()
    } else {
        let message = if message.trim().is_empty() { UNKNOWN_MESSAGE } else { message };
        ErrorDisplay::new(ErrorKind::Unknown, "Something Went Wrong", message)
    }
}
