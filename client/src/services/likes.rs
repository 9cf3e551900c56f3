//! Liking and unliking posts.

#[cfg(test)]
#[path = "likes_test.rs"]
mod likes_test;

use super::segment;
use crate::error::ApiError;
use crate::net::http::ApiClient;
use crate::net::types::LikeResponse;

/// # Errors
///
/// Returns [`ApiError::InvalidUrl`] for a slug that cannot be a path segment.
pub fn like_path(slug: &str) -> Result<String, ApiError> {
    Ok(format!("/posts/{}/like/", segment(slug)?))
}

/// # Errors
///
/// See [`like_path`].
pub fn unlike_path(slug: &str) -> Result<String, ApiError> {
    Ok(format!("/posts/{}/unlike/", segment(slug)?))
}

/// # Errors
///
/// Returns [`ApiError::Validation`] if the post is already liked.
pub async fn like(api: &ApiClient, slug: &str) -> Result<LikeResponse, ApiError> {
    api.post_empty(&like_path(slug)?).await
}

/// # Errors
///
/// Returns [`ApiError::Validation`] if the post was not liked.
pub async fn unlike(api: &ApiClient, slug: &str) -> Result<LikeResponse, ApiError> {
    api.post_empty(&unlike_path(slug)?).await
}
