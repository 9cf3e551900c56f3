//! Networking: transport seam, request wrapper, refresh flow and wire types.
//!
//! SYSTEM CONTEXT
//! ==============
//! `transport` is the only module that touches the HTTP library, `http` owns
//! bearer injection and 401 interception, `refresh` serializes token refreshes,
//! `api` wraps the auth endpoints, and `types` defines the wire schema.

pub mod api;
pub mod http;
pub mod refresh;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;
