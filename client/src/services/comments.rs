//! Comments on posts.

#[cfg(test)]
#[path = "comments_test.rs"]
mod comments_test;

use super::segment;
use crate::error::ApiError;
use crate::net::http::ApiClient;
use crate::net::types::{Comment, Listing, NewComment};

/// # Errors
///
/// Returns [`ApiError::InvalidUrl`] for a slug that cannot be a path segment.
pub fn comments_path(slug: &str) -> Result<String, ApiError> {
    Ok(format!("/posts/{}/comments/", segment(slug)?))
}

#[must_use]
pub fn comment_path(id: i64) -> String {
    format!("/posts/comments/{id}/")
}

/// # Errors
///
/// Returns the classified [`ApiError`].
pub async fn list_comments(api: &ApiClient, slug: &str) -> Result<Vec<Comment>, ApiError> {
    let listing: Listing<Comment> = api.get(&comments_path(slug)?).await?;
    Ok(listing.into_page().results)
}

/// # Errors
///
/// Returns the classified [`ApiError`].
pub async fn add_comment(api: &ApiClient, slug: &str, content: &str) -> Result<Comment, ApiError> {
    api.post(&comments_path(slug)?, &NewComment { content: content.to_owned() }).await
}

/// # Errors
///
/// Returns [`ApiError::Forbidden`] when the comment belongs to someone else.
pub async fn delete_comment(api: &ApiClient, id: i64) -> Result<(), ApiError> {
    api.delete(&comment_path(id)).await
}
