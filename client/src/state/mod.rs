//! Session state: token storage, its optional durable mirror, and the auth
//! context front ends drive.

pub mod auth;
pub mod mirror;
pub mod token_store;
