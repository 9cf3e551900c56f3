//! Single-flight access token refresh.
//!
//! ARCHITECTURE
//! ============
//! Every request that hits a 401 calls [`RefreshCoordinator::recover`] with
//! the token it was sent with. Under the flight lock:
//! - if a refresh is already running, the caller waits for its outcome;
//! - if the store already holds a different access token, an earlier refresh
//!   finished after this request went out and the caller replays with it;
//! - otherwise the caller becomes the leader and performs the refresh.
//!
//! Waiters are released in arrival order with the leader's outcome. On
//! failure the session is cleared once and [`SessionEvent::Expired`] is
//! published; on success the new pair is stored and
//! [`SessionEvent::Refreshed`] is published.
//!
//! The leader records the store's generation before the network call. If a
//! logout or login touched the tokens meanwhile, the refreshed pair is
//! dropped and every caller gets `Unauthorized`.

#[cfg(test)]
#[path = "refresh_test.rs"]
mod refresh_test;

use std::sync::Arc;

use super::http::{decode, join_url, json_headers};
use super::transport::{HttpRequest, Method, Transport};
use super::types::{RefreshBody, TokenPair};
use crate::error::ApiError;
use crate::state::token_store::{SessionEvent, TokenStore};
use crate::util::single_flight::SingleFlight;

pub const REFRESH_PATH: &str = "/auth/refresh/";

const SESSION_ENDED: &str = "session ended during refresh";

pub struct RefreshCoordinator {
    flight: SingleFlight<Result<String, ApiError>>,
    store: Arc<TokenStore>,
    transport: Arc<dyn Transport>,
    refresh_url: String,
}

impl RefreshCoordinator {
    pub(crate) fn new(base_url: &str, store: Arc<TokenStore>, transport: Arc<dyn Transport>) -> Self {
        Self { flight: SingleFlight::new(), store, transport, refresh_url: join_url(base_url, REFRESH_PATH) }
    }

    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.flight.is_in_flight()
    }

    /// Callers currently parked behind the running refresh.
    #[must_use]
    pub fn waiting(&self) -> usize {
        self.flight.waiting()
    }

    /// Obtain a usable access token after `rejected` was answered with 401.
    ///
    /// # Errors
    ///
    /// Returns the refresh failure shared by every caller of the same flight.
    /// The session has been cleared by the time this returns an error.
    pub async fn recover(&self, rejected: Option<&str>) -> Result<String, ApiError> {
        let newer_token = || match self.store.access_token() {
            Some(current) if Some(current.as_str()) != rejected => Some(Ok(current)),
            _ => None,
        };
        self.flight
            .run(newer_token, || self.refresh())
            .await
            .unwrap_or_else(|| Err(ApiError::Unauthorized("token refresh was interrupted".to_owned())))
    }

    async fn refresh(&self) -> Result<String, ApiError> {
        let (generation, refresh_token) = self.store.refresh_ticket();
        let Some(refresh_token) = refresh_token else {
            tracing::info!("access token rejected and no refresh token held");
            return Err(self.expire(ApiError::Unauthorized("no refresh token available".to_owned())));
        };

        tracing::debug!("refreshing access token");
        match self.request_pair(&refresh_token).await {
            Ok(pair) => {
                let access = pair.access.clone();
                let refresh = pair.refresh.unwrap_or(refresh_token);
                if !self.store.set_tokens_if_current(generation, pair.access, refresh) {
                    // Logout or a new login happened while the call was out.
                    tracing::info!("session changed during refresh; discarding refreshed tokens");
                    return Err(ApiError::Unauthorized(SESSION_ENDED.to_owned()));
                }
                self.store.emit(SessionEvent::Refreshed);
                tracing::info!("access token refreshed");
                Ok(access)
            }
            Err(e) => Err(self.expire_if_current(generation, e)),
        }
    }

    /// Failure path for a refresh that went over the network: the session is
    /// only cleared if it is still the one the refresh started from.
    fn expire_if_current(&self, generation: u64, error: ApiError) -> ApiError {
        if self.store.generation() == generation {
            self.expire(error)
        } else {
            tracing::debug!(error = %error, "refresh failed for a session that already ended");
            error
        }
    }

    fn expire(&self, error: ApiError) -> ApiError {
        tracing::warn!(error = %error, "token refresh failed; clearing session");
        if self.store.clear() {
            self.store.emit(SessionEvent::Expired);
        }
        error
    }

    async fn request_pair(&self, refresh_token: &str) -> Result<TokenPair, ApiError> {
        let body = serde_json::to_string(&RefreshBody { refresh: refresh_token })
            .map_err(|e| ApiError::Decode(format!("request body: {e}")))?;
        let request =
            HttpRequest { method: Method::Post, url: self.refresh_url.clone(), headers: json_headers(), body: Some(body) };

        let response = self.transport.send(request).await?;
        match response.status {
            200..=299 => decode(&response.body),
            400 | 401 => Err(ApiError::Unauthorized("refresh token invalid or expired".to_owned())),
            status => Err(ApiError::from_response(status, response.retry_after_secs, &response.body)),
        }
    }
}
