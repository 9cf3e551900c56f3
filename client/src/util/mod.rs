//! Utility helpers shared across client modules.
//!
//! SYSTEM CONTEXT
//! ==============
//! `single_flight` backs the token refresh coordinator, `error_display` turns
//! errors into user-facing text, and `slug` derives URL slugs for taxonomy.

pub mod error_display;
pub mod single_flight;
pub mod slug;
