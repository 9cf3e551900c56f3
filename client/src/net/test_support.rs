//! Scripted transport for exercising the request and refresh flow.

use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use super::refresh::REFRESH_PATH;
use super::transport::{HttpRequest, HttpResponse, Transport};
use crate::error::ApiError;

type Handler = dyn Fn(&HttpRequest) -> Result<HttpResponse, ApiError> + Send + Sync;

pub(crate) struct MockTransport {
    handler: Box<Handler>,
    requests: Mutex<Vec<HttpRequest>>,
    refresh_gate: Option<Arc<Notify>>,
}

impl MockTransport {
    pub(crate) fn new(handler: impl Fn(&HttpRequest) -> Result<HttpResponse, ApiError> + Send + Sync + 'static) -> Self {
        Self { handler: Box::new(handler), requests: Mutex::new(Vec::new()), refresh_gate: None }
    }

    /// Park refresh calls until `gate` is notified.
    pub(crate) fn holding_refresh(mut self, gate: Arc<Notify>) -> Self {
        self.refresh_gate = Some(gate);
        self
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests whose path (query stripped) ends with `suffix`.
    pub(crate) fn count(&self, suffix: &str) -> usize {
        self.requests().iter().filter(|r| path_of(r).ends_with(suffix)).count()
    }

    pub(crate) fn refresh_calls(&self) -> usize {
        self.count(REFRESH_PATH)
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(gate) = &self.refresh_gate
            && path_of(&request).ends_with(REFRESH_PATH)
        {
            gate.notified().await;
        }
        (self.handler)(&request)
    }
}

pub(crate) fn path_of(request: &HttpRequest) -> &str {
    request.url.split('?').next().unwrap_or_default()
}

pub(crate) fn bearer(request: &HttpRequest) -> Option<&str> {
    request.header("Authorization").and_then(|v| v.strip_prefix("Bearer "))
}

pub(crate) fn respond(status: u16, body: &str) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse { status, retry_after_secs: None, body: body.to_owned() })
}

pub(crate) fn respond_json(status: u16, body: &serde_json::Value) -> Result<HttpResponse, ApiError> {
    respond(status, &body.to_string())
}

/// Backend whose only valid access token is `valid`; refresh issues
/// `valid` + `R2`. Non-refresh requests answer `{"ok": true}`.
pub(crate) fn backend(valid: &'static str) -> MockTransport {
    MockTransport::new(move |req| {
        if path_of(req).ends_with(REFRESH_PATH) {
            return respond_json(200, &serde_json::json!({ "access": valid, "refresh": "R2" }));
        }
        if bearer(req) == Some(valid) {
            respond_json(200, &serde_json::json!({ "ok": true }))
        } else {
            respond(401, r#"{"detail":"Given token not valid for any token type"}"#)
        }
    })
}

pub(crate) async fn wait_until(mut cond: impl FnMut() -> bool) {
    tokio::time::timeout(std::time::Duration::from_secs(5), async {
        while !cond() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("condition not reached in time");
}
