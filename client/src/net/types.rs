//! Wire DTOs for the blog REST API.
//!
//! DESIGN
//! ======
//! Response types are lenient (`#[serde(default)]` on fields the backend
//! omits from some endpoints, e.g. login returns a user without `created_at`).
//! Request types skip unset optional fields so a PATCH only touches what the
//! caller set.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use serde::{Deserialize, Serialize};

// =============================================================================
// USERS & AUTH
// =============================================================================

/// Snapshot of the authenticated user. Replaced wholesale on each fetch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    /// Whether the user may author posts.
    #[serde(default)]
    pub is_author: bool,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl UserProfile {
    /// "First Last" when either is set, otherwise the username.
    #[must_use]
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() { self.username.clone() } else { full.to_owned() }
    }
}

/// Body of successful login and register responses.
#[derive(Clone, Debug, Deserialize)]
pub struct AuthResponse {
    pub access: String,
    pub refresh: String,
    pub user: UserProfile,
}

/// Body of a successful refresh. `refresh` is absent when the server does not
/// rotate refresh tokens.
#[derive(Clone, Debug, Deserialize)]
pub struct TokenPair {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}

/// Login credentials. The backend accepts either an email or a username.
#[derive(Clone, Debug, Serialize)]
pub struct LoginRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub password: String,
}

impl LoginRequest {
    #[must_use]
    pub fn with_email(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self { email: Some(email.into()), username: None, password: password.into() }
    }

    #[must_use]
    pub fn with_username(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self { email: None, username: Some(username.into()), password: password.into() }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub(crate) struct RefreshBody<'a> {
    pub refresh: &'a str,
}

// =============================================================================
// TAXONOMY
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct NewCategory {
    pub name: String,
    pub slug: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct NewTag {
    pub name: String,
    pub slug: String,
}

// =============================================================================
// POSTS
// =============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

impl PostStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Archived => "archived",
        }
    }
}

impl std::str::FromStr for PostStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "published" => Ok(Self::Published),
            "archived" => Ok(Self::Archived),
            other => Err(format!("unknown post status '{other}' (expected draft, published or archived)")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub content: String,
    /// Author username.
    pub author: String,
    #[serde(default)]
    pub category: Option<i64>,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub status: PostStatus,
    #[serde(default)]
    pub likes_count: u64,
    #[serde(default)]
    pub comments_count: u64,
    /// Present on the detail endpoint only, newest first.
    #[serde(default)]
    pub comments: Vec<Comment>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags_input: Vec<i64>,
    pub is_published: bool,
}

/// Partial update; unset fields are left untouched by the server.
#[derive(Clone, Debug, Default, Serialize)]
pub struct PostPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags_input: Option<Vec<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_published: Option<bool>,
}

impl PostPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.category.is_none()
            && self.tags_input.is_none()
            && self.is_published.is_none()
    }
}

/// Filters for post listings.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PostQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub search: Option<String>,
    /// Category slug.
    pub category: Option<String>,
    /// Tag slug.
    pub tag: Option<String>,
    pub status: Option<PostStatus>,
    pub author: Option<String>,
}

/// Filters for the signed-in author's own posts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MyPostsQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub status: Option<PostStatus>,
}

impl MyPostsQuery {
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        PostQuery { page: self.page, page_size: self.page_size, status: self.status, ..PostQuery::default() }
            .to_pairs()
    }
}

impl PostQuery {
    /// Query-string pairs in the backend's filter vocabulary.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(page) = self.page {
            pairs.push(("page".to_owned(), page.to_string()));
        }
        if let Some(size) = self.page_size {
            pairs.push(("page_size".to_owned(), size.to_string()));
        }
        let text_filters = [
            ("search", &self.search),
            ("category__slug", &self.category),
            ("tag__slug", &self.tag),
            ("author", &self.author),
        ];
        for (key, value) in text_filters {
            if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                pairs.push((key.to_owned(), value.to_owned()));
            }
        }
        if let Some(status) = self.status {
            pairs.push(("status".to_owned(), status.as_str().to_owned()));
        }
        pairs
    }
}

// =============================================================================
// COMMENTS & LIKES
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    /// Author username.
    pub user: String,
    pub content: String,
    pub created_at: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct NewComment {
    pub content: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeResponse {
    pub message: String,
}

// =============================================================================
// PAGINATION
// =============================================================================

/// One page of a listing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

/// Listing endpoints answer with a page object when pagination is enabled
/// server-side and a bare array otherwise.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum Listing<T> {
    Paged(Page<T>),
    Plain(Vec<T>),
}

impl<T> Listing<T> {
    pub(crate) fn into_page(self) -> Page<T> {
        match self {
            Self::Paged(page) => page,
            Self::Plain(results) => Page { count: results.len() as u64, next: None, previous: None, results },
        }
    }
}
