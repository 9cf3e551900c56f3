//! Post listing, detail and authoring.

#[cfg(test)]
#[path = "posts_test.rs"]
mod posts_test;

use super::segment;
use crate::error::{ApiError, FieldErrors, NON_FIELD_KEY};
use crate::net::http::ApiClient;
use crate::net::types::{Listing, MyPostsQuery, NewPost, Page, Post, PostPatch, PostQuery};

pub const POSTS_PATH: &str = "/posts/";
pub const MY_POSTS_PATH: &str = "/posts/my-posts/";

/// # Errors
///
/// Returns [`ApiError::InvalidUrl`] for a slug that cannot be a path segment.
pub fn post_path(slug: &str) -> Result<String, ApiError> {
    Ok(format!("/posts/{}/", segment(slug)?))
}

/// Published posts matching `query`.
///
/// # Errors
///
/// Returns the classified [`ApiError`].
pub async fn list_posts(api: &ApiClient, query: &PostQuery) -> Result<Page<Post>, ApiError> {
    let listing: Listing<Post> = api.get_query(POSTS_PATH, query.to_pairs()).await?;
    Ok(listing.into_page())
}

/// Posts authored by the signed-in user, drafts included unless `query`
/// filters by status.
///
/// # Errors
///
/// Returns the classified [`ApiError`].
pub async fn my_posts(api: &ApiClient, query: &MyPostsQuery) -> Result<Page<Post>, ApiError> {
    let listing: Listing<Post> = api.get_query(MY_POSTS_PATH, query.to_pairs()).await?;
    Ok(listing.into_page())
}

/// # Errors
///
/// Returns [`ApiError::NotFound`] for an unknown slug.
pub async fn get_post(api: &ApiClient, slug: &str) -> Result<Post, ApiError> {
    api.get(&post_path(slug)?).await
}

/// # Errors
///
/// Returns [`ApiError::Validation`] when the server rejects the fields.
pub async fn create_post(api: &ApiClient, post: &NewPost) -> Result<Post, ApiError> {
    tracing::debug!(title = %post.title, "creating post");
    api.post(POSTS_PATH, post).await
}

/// # Errors
///
/// Returns the classified [`ApiError`]; an empty patch is rejected locally.
pub async fn update_post(api: &ApiClient, slug: &str, patch: &PostPatch) -> Result<Post, ApiError> {
    if patch.is_empty() {
        let mut fields = FieldErrors::new();
        fields.push(NON_FIELD_KEY, "nothing to update");
        return Err(ApiError::Validation(fields));
    }
    api.patch(&post_path(slug)?, patch).await
}

/// Publish or unpublish a post.
///
/// # Errors
///
/// Returns the classified [`ApiError`].
pub async fn set_published(api: &ApiClient, slug: &str, published: bool) -> Result<Post, ApiError> {
    let patch = PostPatch { is_published: Some(published), ..PostPatch::default() };
    api.patch(&post_path(slug)?, &patch).await
}

/// # Errors
///
/// Returns the classified [`ApiError`].
pub async fn delete_post(api: &ApiClient, slug: &str) -> Result<(), ApiError> {
    api.delete(&post_path(slug)?).await
}
