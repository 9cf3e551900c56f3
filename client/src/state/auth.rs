//! Auth context: the session operations front ends call.
//!
//! SYSTEM CONTEXT
//! ==============
//! `AuthContext` is the only public way to create or end a session. It wraps
//! the shared [`ApiClient`] and its [`TokenStore`]; token refresh happens
//! underneath it in the request wrapper and surfaces here only through the
//! session events and user watch.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use std::sync::Arc;

use tokio::sync::{broadcast, watch};

use super::mirror::mirror_for;
use super::token_store::{SessionEvent, TokenStore};
use crate::config::ClientConfig;
use crate::error::{ApiError, FieldErrors, NON_FIELD_KEY};
use crate::net::api;
use crate::net::http::ApiClient;
use crate::net::types::{AuthResponse, LoginRequest, RegisterRequest, UserProfile};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AuthError {
    /// Login was rejected (HTTP 400 or 401).
    #[error("login rejected: {fields}")]
    Credentials { status: u16, fields: FieldErrors },
    /// Registration fields were rejected.
    #[error("registration rejected: {0}")]
    Validation(FieldErrors),
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl AuthError {
    /// Collapse into the general API error taxonomy.
    #[must_use]
    pub fn into_api_error(self) -> ApiError {
        match self {
            Self::Credentials { status: 401, fields } => ApiError::Unauthorized(
                fields.first_message().unwrap_or("invalid credentials").to_owned(),
            ),
            Self::Credentials { fields, .. } | Self::Validation(fields) => ApiError::Validation(fields),
            Self::Api(e) => e,
        }
    }
}

/// Reactive view of the signed-in user.
#[derive(Clone)]
pub struct AuthWatch {
    rx: watch::Receiver<Option<UserProfile>>,
}

impl AuthWatch {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.rx.borrow().is_some()
    }

    #[must_use]
    pub fn user(&self) -> Option<UserProfile> {
        self.rx.borrow().clone()
    }

    /// Wait for the next login, logout or expiry. Returns `false` once the
    /// session store is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

pub struct AuthContext {
    api: Arc<ApiClient>,
}

impl AuthContext {
    /// Build a store, mirror and HTTP client from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::HttpClientBuild`] if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let store = Arc::new(TokenStore::new(mirror_for(&config.persistence)));
        let api = ApiClient::new(config, store)?;
        Ok(Self::with_client(Arc::new(api)))
    }

    #[must_use]
    pub fn with_client(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    /// The shared client, for calling the content endpoints.
    #[must_use]
    pub fn api(&self) -> &Arc<ApiClient> {
        &self.api
    }

    fn store(&self) -> &TokenStore {
        self.api.store()
    }

    /// # Errors
    ///
    /// [`AuthError::Credentials`] when the server rejects the credentials,
    /// [`AuthError::Api`] for anything else.
    pub async fn login(&self, credentials: &LoginRequest) -> Result<UserProfile, AuthError> {
        match api::login(&self.api, credentials).await {
            Ok(auth) => Ok(self.establish(auth)),
            Err(ApiError::Validation(fields)) => Err(AuthError::Credentials { status: 400, fields }),
            Err(ApiError::Unauthorized(message)) => {
                let mut fields = FieldErrors::new();
                fields.push(NON_FIELD_KEY, message);
                Err(AuthError::Credentials { status: 401, fields })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Create an account and sign in as it.
    ///
    /// # Errors
    ///
    /// [`AuthError::Validation`] when fields are rejected, [`AuthError::Api`]
    /// otherwise.
    pub async fn register(&self, details: &RegisterRequest) -> Result<UserProfile, AuthError> {
        match api::register(&self.api, details).await {
            Ok(auth) => Ok(self.establish(auth)),
            Err(ApiError::Validation(fields)) => Err(AuthError::Validation(fields)),
            Err(e) => Err(e.into()),
        }
    }

    fn establish(&self, auth: AuthResponse) -> UserProfile {
        let AuthResponse { access, refresh, user } = auth;
        self.store().set_tokens(access, refresh);
        self.store().set_user(Some(user.clone()));
        tracing::info!(username = %user.username, "signed in");
        self.store().emit(SessionEvent::LoggedIn);
        user
    }

    /// End the session. The server is asked to revoke the refresh token, but
    /// local state is cleared whatever it answers.
    pub async fn logout(&self) {
        if let Some(refresh) = self.store().refresh_token()
            && let Err(e) = api::logout_remote(&self.api, &refresh).await
        {
            tracing::warn!(error = %e, "remote logout failed; clearing local session anyway");
        }
        self.store().clear();
        tracing::info!("signed out");
        self.store().emit(SessionEvent::LoggedOut);
    }

    /// Pick up a mirrored session at startup and confirm it with the server.
    /// Any failure leaves the context signed out.
    pub async fn restore(&self) -> Option<UserProfile> {
        self.store().restore_access_token()?;
        match api::fetch_current_user(&self.api).await {
            Ok(user) => {
                tracing::debug!(username = %user.username, "restored session");
                self.store().set_user(Some(user.clone()));
                Some(user)
            }
            Err(e) => {
                tracing::info!(error = %e, "stored session is no longer valid");
                self.store().clear();
                None
            }
        }
    }

    /// Refetch the profile of the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns the fetch failure; the session has been cleared by then.
    pub async fn refresh_user(&self) -> Result<UserProfile, AuthError> {
        match api::fetch_current_user(&self.api).await {
            Ok(user) => {
                self.store().set_user(Some(user.clone()));
                Ok(user)
            }
            Err(e) => {
                if self.store().clear() {
                    self.store().emit(SessionEvent::Expired);
                }
                Err(e.into())
            }
        }
    }

    #[must_use]
    pub fn current_user(&self) -> Option<UserProfile> {
        self.store().user()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.store().user().is_some()
    }

    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.store().access_token()
    }

    #[must_use]
    pub fn subscribe(&self) -> AuthWatch {
        AuthWatch { rx: self.store().subscribe_user() }
    }

    #[must_use]
    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.store().subscribe_events()
    }
}
