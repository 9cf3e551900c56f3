//! HTTP transport seam.
//!
//! `Transport` is the one place the HTTP library is touched. Everything above
//! it works with the plain [`HttpRequest`]/[`HttpResponse`] pair, which keeps
//! the refresh flow testable with a scripted transport.

use std::time::Duration;

use crate::config::Timeouts;
use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(m: Method) -> Self {
        match m {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Fully resolved outgoing request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    /// Parsed `Retry-After` seconds, when the server sent one.
    pub retry_after_secs: Option<u64>,
    pub body: String,
}

impl HttpResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Async transport abstraction. Enables mocking in tests.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Send one request and return whatever status the server answered with.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Network`] when no response was received.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;
}

// =============================================================================
// REQWEST
// =============================================================================

pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    /// # Errors
    ///
    /// Returns [`ApiError::HttpClientBuild`] if the client cannot be built.
    pub fn new(timeouts: Timeouts) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| ApiError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http })
    }
}

#[async_trait::async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let mut builder = self.http.request(request.method.into(), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(network_error)?;
        let status = response.status().as_u16();
        let retry_after_secs = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let body = response.text().await.map_err(network_error)?;

        Ok(HttpResponse { status, retry_after_secs, body })
    }
}

fn network_error(e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::Network(format!("request timed out: {e}"))
    } else {
        ApiError::Network(e.to_string())
    }
}
