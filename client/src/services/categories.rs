//! Post categories.

use crate::error::ApiError;
use crate::net::http::ApiClient;
use crate::net::types::{Category, Listing, NewCategory};

pub const CATEGORIES_PATH: &str = "/categories/";

/// # Errors
///
/// Returns the classified [`ApiError`].
pub async fn list_categories(api: &ApiClient) -> Result<Vec<Category>, ApiError> {
    let listing: Listing<Category> = api.get(CATEGORIES_PATH).await?;
    Ok(listing.into_page().results)
}

/// # Errors
///
/// Returns [`ApiError::Validation`] for a duplicate name or slug.
pub async fn create_category(api: &ApiClient, category: &NewCategory) -> Result<Category, ApiError> {
    api.post(CATEGORIES_PATH, category).await
}
