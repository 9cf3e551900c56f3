//! Session-aware request wrapper.
//!
//! DESIGN
//! ======
//! Every request goes through [`ApiClient::send`]:
//! 1. the current access token (if any) is attached as a bearer header,
//! 2. the request is dispatched through the [`Transport`],
//! 3. a 401 on a refresh-eligible request that has not been replayed yet is
//!    handed to the [`RefreshCoordinator`], and the request is replayed once
//!    with whatever token it returns.
//!
//! A replayed request that is rejected again fails with that 401; it never
//! triggers a second refresh. Auth endpoints opt out of refresh entirely via
//! [`ApiRequest::without_refresh`].

#[cfg(test)]
#[path = "http_test.rs"]
mod http_test;

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::refresh::RefreshCoordinator;
use super::transport::{HttpRequest, HttpResponse, Method, ReqwestTransport, Transport};
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::state::token_store::TokenStore;

/// One logical API call, relative to the client's base URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path below the base URL, e.g. `/posts/`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    retried: bool,
    allow_refresh: bool,
}

impl ApiRequest {
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self { method, path: path.into(), query: Vec::new(), body: None, retried: false, allow_refresh: true }
    }

    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    #[must_use]
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::Patch, path)
    }

    #[must_use]
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    #[must_use]
    pub fn with_query(mut self, pairs: Vec<(String, String)>) -> Self {
        self.query = pairs;
        self
    }

    /// Attach a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Decode`] if `body` cannot be represented as JSON.
    pub fn with_json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body).map_err(|e| ApiError::Decode(format!("request body: {e}")))?;
        self.body = Some(value);
        Ok(self)
    }

    /// Never attempt a token refresh for this request. Used by the auth
    /// endpoints themselves.
    #[must_use]
    pub fn without_refresh(mut self) -> Self {
        self.allow_refresh = false;
        self
    }

    /// Flag the request as a replay; a 401 on it fails immediately.
    #[must_use]
    pub fn mark_retried(mut self) -> Self {
        self.retried = true;
        self
    }

    #[must_use]
    pub fn is_retried(&self) -> bool {
        self.retried
    }

    #[must_use]
    pub fn allows_refresh(&self) -> bool {
        self.allow_refresh
    }
}

pub struct ApiClient {
    base_url: String,
    transport: Arc<dyn Transport>,
    store: Arc<TokenStore>,
    refresh: RefreshCoordinator,
}

impl ApiClient {
    /// Client backed by the real HTTP transport.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::HttpClientBuild`] if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig, store: Arc<TokenStore>) -> Result<Self, ApiError> {
        let transport = Arc::new(ReqwestTransport::new(config.timeouts)?);
        Ok(Self::with_transport(config.base_url.clone(), transport, store))
    }

    #[must_use]
    pub fn with_transport(base_url: impl Into<String>, transport: Arc<dyn Transport>, store: Arc<TokenStore>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        let refresh = RefreshCoordinator::new(&base_url, store.clone(), transport.clone());
        Self { base_url, transport, store, refresh }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn store(&self) -> &Arc<TokenStore> {
        &self.store
    }

    #[must_use]
    pub fn refresh_coordinator(&self) -> &RefreshCoordinator {
        &self.refresh
    }

    /// Dispatch `request`, refreshing and replaying once on a 401.
    ///
    /// # Errors
    ///
    /// Returns the classified [`ApiError`] for any non-2xx answer (after the
    /// single replay, if one happened), a refresh failure, or a transport
    /// failure.
    pub async fn send(&self, request: ApiRequest) -> Result<HttpResponse, ApiError> {
        let token = self.store.access_token();
        let response = self.dispatch(&request, token.as_deref()).await?;
        if response.status != 401 || !request.allow_refresh {
            return into_result(response);
        }
        if request.retried {
            tracing::debug!(path = %request.path, "replayed request rejected; not refreshing again");
            return into_result(response);
        }

        let fresh = self.refresh.recover(token.as_deref()).await?;
        let replay = request.mark_retried();
        let response = self.dispatch(&replay, Some(&fresh)).await?;
        into_result(response)
    }

    /// [`send`](Self::send) and decode the JSON body.
    ///
    /// # Errors
    ///
    /// As [`send`](Self::send), plus [`ApiError::Decode`] for an unexpected body.
    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let response = self.send(request).await?;
        decode(&response.body)
    }

    /// # Errors
    ///
    /// See [`send_json`](Self::send_json).
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send_json(ApiRequest::get(path)).await
    }

    /// # Errors
    ///
    /// See [`send_json`](Self::send_json).
    pub async fn get_query<T: DeserializeOwned>(&self, path: &str, query: Vec<(String, String)>) -> Result<T, ApiError> {
        self.send_json(ApiRequest::get(path).with_query(query)).await
    }

    /// # Errors
    ///
    /// See [`send_json`](Self::send_json).
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(ApiRequest::post(path).with_json(body)?).await
    }

    /// POST without a body.
    ///
    /// # Errors
    ///
    /// See [`send_json`](Self::send_json).
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send_json(ApiRequest::post(path)).await
    }

    /// # Errors
    ///
    /// See [`send_json`](Self::send_json).
    pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(ApiRequest::patch(path).with_json(body)?).await
    }

    /// # Errors
    ///
    /// See [`send_json`](Self::send_json).
    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(ApiRequest::put(path).with_json(body)?).await
    }

    /// DELETE; the response body (usually empty) is discarded.
    ///
    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send(ApiRequest::delete(path)).await.map(|_| ())
    }

    async fn dispatch(&self, request: &ApiRequest, token: Option<&str>) -> Result<HttpResponse, ApiError> {
        let url = build_url(&self.base_url, &request.path, &request.query)?;
        let body = request.body.as_ref().map(serde_json::Value::to_string);
        let mut headers = json_headers();
        if let Some(token) = token {
            headers.push(("Authorization".to_owned(), format!("Bearer {token}")));
        }

        tracing::debug!(
            method = request.method.as_str(),
            path = %request.path,
            authenticated = token.is_some(),
            retried = request.retried,
            "dispatching request"
        );
        let response = self
            .transport
            .send(HttpRequest { method: request.method, url, headers, body })
            .await?;
        tracing::debug!(method = request.method.as_str(), path = %request.path, status = response.status, "response");
        Ok(response)
    }
}

pub(crate) fn json_headers() -> Vec<(String, String)> {
    vec![
        ("Content-Type".to_owned(), "application/json".to_owned()),
        ("Accept".to_owned(), "application/json".to_owned()),
    ]
}

/// Join `base` and `path` with exactly one slash between them.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

fn build_url(base: &str, path: &str, query: &[(String, String)]) -> Result<String, ApiError> {
    let joined = join_url(base, path);
    if query.is_empty() {
        return Ok(joined);
    }
    reqwest::Url::parse_with_params(&joined, query)
        .map(String::from)
        .map_err(|e| ApiError::InvalidUrl(format!("{joined}: {e}")))
}

fn into_result(response: HttpResponse) -> Result<HttpResponse, ApiError> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(ApiError::from_response(response.status, response.retry_after_secs, &response.body))
    }
}

pub(crate) fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::Decode(e.to_string()))
}
