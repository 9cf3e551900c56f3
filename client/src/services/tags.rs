//! Post tags.

#[cfg(test)]
#[path = "tags_test.rs"]
mod tags_test;

use crate::error::ApiError;
use crate::net::http::ApiClient;
use crate::net::types::{Listing, NewTag, Tag};

pub const TAGS_PATH: &str = "/tags/";

/// # Errors
///
/// Returns the classified [`ApiError`].
pub async fn list_tags(api: &ApiClient) -> Result<Vec<Tag>, ApiError> {
    let listing: Listing<Tag> = api.get(TAGS_PATH).await?;
    Ok(listing.into_page().results)
}

/// # Errors
///
/// Returns [`ApiError::Validation`] for a duplicate name or slug.
pub async fn create_tag(api: &ApiClient, tag: &NewTag) -> Result<Tag, ApiError> {
    api.post(TAGS_PATH, tag).await
}
