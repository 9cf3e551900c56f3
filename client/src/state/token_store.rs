//! In-memory session holder: access/refresh tokens and the current user.
//!
//! ARCHITECTURE
//! ============
//! One `TokenStore` is created per running client and shared through `Arc`.
//! The token pair sits behind a `std::sync::Mutex` that is only ever held for
//! synchronous reads/writes (never across an `.await`). The current user is a
//! `watch` channel so front ends can react to login/logout without polling,
//! and lifecycle transitions are published on a `broadcast` channel.
//!
//! PERSISTENCE
//! ===========
//! Memory is authoritative. When a [`TokenMirror`] is configured, every
//! `set_tokens` also writes the access token to it and every clear removes it.
//! Mirror I/O happens after the token lock is released, so readers never wait
//! on the file system.

#[cfg(test)]
#[path = "token_store_test.rs"]
mod tests;

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{broadcast, watch};

use super::mirror::{NoMirror, TokenMirror};
use crate::net::types::UserProfile;

const EVENT_CAPACITY: usize = 16;

/// Session lifecycle transitions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn,
    Refreshed,
    LoggedOut,
    /// The session could not be refreshed and was cleared; the front end
    /// should fall back to its unauthenticated entry point.
    Expired,
}

/// Point-in-time copy of the session.
#[derive(Clone, Default, PartialEq)]
pub struct Session {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user: Option<UserProfile>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("user", &self.user)
            .finish()
    }
}

#[derive(Default)]
struct Tokens {
    access: Option<String>,
    refresh: Option<String>,
    /// Bumped on every write or clear of the pair.
    generation: u64,
}

pub struct TokenStore {
    tokens: Mutex<Tokens>,
    /// Serializes mirror writes so the file follows memory order. Never taken
    /// while `tokens` is held.
    mirror_io: Mutex<()>,
    user: watch::Sender<Option<UserProfile>>,
    events: broadcast::Sender<SessionEvent>,
    mirror: Arc<dyn TokenMirror>,
}

impl TokenStore {
    #[must_use]
    pub fn new(mirror: Arc<dyn TokenMirror>) -> Self {
        let (user, _) = watch::channel(None);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tokens: Mutex::new(Tokens::default()), mirror_io: Mutex::new(()), user, events, mirror }
    }

    /// A store with no durable mirror.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(NoMirror))
    }

    fn lock(&self) -> MutexGuard<'_, Tokens> {
        self.tokens.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.lock().access.clone()
    }

    #[must_use]
    pub fn refresh_token(&self) -> Option<String> {
        self.lock().refresh.clone()
    }

    fn lock_mirror(&self) -> MutexGuard<'_, ()> {
        self.mirror_io.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Overwrite both tokens unconditionally.
    pub fn set_tokens(&self, access: impl Into<String>, refresh: impl Into<String>) {
        let _io = self.lock_mirror();
        let access = access.into();
        {
            let mut tokens = self.lock();
            tokens.generation += 1;
            tokens.access = Some(access.clone());
            tokens.refresh = Some(refresh.into());
        }
        self.mirror_store(&access);
    }

    /// Write the pair only if nothing has touched the tokens since
    /// `generation` was read. Returns whether the write happened.
    pub(crate) fn set_tokens_if_current(&self, generation: u64, access: String, refresh: String) -> bool {
        let _io = self.lock_mirror();
        {
            let mut tokens = self.lock();
            if tokens.generation != generation {
                return false;
            }
            tokens.generation += 1;
            tokens.access = Some(access.clone());
            tokens.refresh = Some(refresh);
        }
        self.mirror_store(&access);
        true
    }

    /// Current refresh token together with the generation it belongs to.
    pub(crate) fn refresh_ticket(&self) -> (u64, Option<String>) {
        let tokens = self.lock();
        (tokens.generation, tokens.refresh.clone())
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Drop both tokens and the mirrored copy.
    pub fn clear_tokens(&self) {
        let _io = self.lock_mirror();
        {
            let mut tokens = self.lock();
            tokens.generation += 1;
            tokens.access = None;
            tokens.refresh = None;
        }
        if let Err(e) = self.mirror.clear() {
            tracing::warn!(error = %e, "failed to clear mirrored access token");
        }
    }

    fn mirror_store(&self, access: &str) {
        if let Err(e) = self.mirror.store(access) {
            tracing::warn!(error = %e, "failed to mirror access token");
        }
    }

    /// Seed the access token from the mirror when memory holds none.
    ///
    /// No refresh token is restored, so a restored session ends as soon as the
    /// access token is rejected.
    pub fn restore_access_token(&self) -> Option<String> {
        if let Some(access) = self.access_token() {
            return Some(access);
        }
        let _io = self.lock_mirror();
        let loaded = match self.mirror.load() {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable token mirror");
                None
            }
        }?;
        let mut tokens = self.lock();
        if tokens.access.is_none() {
            tokens.access = Some(loaded);
        }
        tokens.access.clone()
    }

    #[must_use]
    pub fn user(&self) -> Option<UserProfile> {
        self.user.borrow().clone()
    }

    pub fn set_user(&self, user: Option<UserProfile>) {
        self.user.send_replace(user);
    }

    /// Clear tokens and user. Returns whether anything was held before.
    pub fn clear(&self) -> bool {
        let had_tokens = {
            let tokens = self.lock();
            tokens.access.is_some() || tokens.refresh.is_some()
        };
        self.clear_tokens();
        let had_user = self.user.send_replace(None).is_some();
        had_tokens || had_user
    }

    #[must_use]
    pub fn snapshot(&self) -> Session {
        let tokens = self.lock();
        Session { access_token: tokens.access.clone(), refresh_token: tokens.refresh.clone(), user: self.user() }
    }

    #[must_use]
    pub fn subscribe_user(&self) -> watch::Receiver<Option<UserProfile>> {
        self.user.subscribe()
    }

    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        tracing::debug!(?event, "session event");
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::in_memory()
    }
}
