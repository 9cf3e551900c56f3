//! Content endpoints: posts, comments, likes and taxonomy.
//!
//! Each function is a thin typed wrapper over one [`ApiClient`] call. Bearer
//! injection and token refresh happen inside the client, so nothing here
//! deals with the session.
//!
//! [`ApiClient`]: crate::net::http::ApiClient


use crate::error::ApiError;

pub mod categories;
pub mod comments;
pub mod likes;
pub mod posts;
pub mod tags;

/// Percent-encode one path segment (RFC 3986 unreserved characters pass).
///
/// Empty, `.` and `..` are refused: URL parsing would collapse them and the
/// request would land on a different resource.
pub(crate) fn segment(raw: &str) -> Result<String, ApiError> {
    if matches!(raw, "" | "." | "..") {
        return Err(ApiError::InvalidUrl(format!("'{raw}' is not a usable path segment")));
    }
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~') {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    Ok(out)
}
