//! Session-aware client for the blog platform REST API.
//!
//! SYSTEM CONTEXT
//! ==============
//! The CLI (and any other front end) talks to the backend exclusively through
//! this crate. `state` owns the session, `net` owns request dispatch and the
//! token refresh flow, and `services` wraps the plain CRUD endpoints.
//!
//! DATA FLOW
//! =========
//! front end -> `AuthContext` / `services` -> `ApiClient`
//!           -> `RefreshCoordinator` (on 401) -> `TokenStore` -> `Transport`

pub mod config;
pub mod error;
pub mod net;
pub mod services;
pub mod state;
pub mod util;

pub use config::{ClientConfig, ConfigError, TokenPersistence};
pub use error::{ApiError, ErrorKind, FieldErrors};
pub use net::http::{ApiClient, ApiRequest};
pub use state::auth::{AuthContext, AuthError, AuthWatch};
pub use state::token_store::{Session, SessionEvent, TokenStore};
