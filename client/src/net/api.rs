//! Auth endpoint calls.
//!
//! These requests opt out of the 401 refresh flow: a rejected login or a
//! rejected refresh token is an answer, not an expired session.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use super::http::{ApiClient, ApiRequest};
use super::types::{AuthResponse, LoginRequest, RefreshBody, RegisterRequest, UserProfile};
use crate::error::ApiError;

pub const LOGIN_PATH: &str = "/auth/login/";
pub const REGISTER_PATH: &str = "/auth/register/";
pub const LOGOUT_PATH: &str = "/auth/logout/";
pub const CURRENT_USER_PATH: &str = "/auth/user/";

/// `POST /auth/login/`.
///
/// # Errors
///
/// Returns the classified [`ApiError`] for a rejected login or a transport failure.
pub async fn login(api: &ApiClient, credentials: &LoginRequest) -> Result<AuthResponse, ApiError> {
    let request = ApiRequest::post(LOGIN_PATH).with_json(credentials)?.without_refresh();
    api.send_json(request).await
}

/// `POST /auth/register/`.
///
/// # Errors
///
/// Returns [`ApiError::Validation`] when the server rejects the submitted fields.
pub async fn register(api: &ApiClient, details: &RegisterRequest) -> Result<AuthResponse, ApiError> {
    let request = ApiRequest::post(REGISTER_PATH).with_json(details)?.without_refresh();
    api.send_json(request).await
}

/// `POST /auth/logout/`, asking the server to revoke `refresh_token`.
///
/// # Errors
///
/// Returns the classified [`ApiError`]; callers treat this as best-effort.
pub async fn logout_remote(api: &ApiClient, refresh_token: &str) -> Result<(), ApiError> {
    let request = ApiRequest::post(LOGOUT_PATH)
        .with_json(&RefreshBody { refresh: refresh_token })?
        .without_refresh();
    api.send(request).await.map(|_| ())
}

/// `GET /auth/user/` with the current access token (refreshing on 401).
///
/// # Errors
///
/// Returns the classified [`ApiError`], including refresh failures.
pub async fn fetch_current_user(api: &ApiClient) -> Result<UserProfile, ApiError> {
    api.get(CURRENT_USER_PATH).await
}
