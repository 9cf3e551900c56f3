//! URL slug derivation for categories and tags.

#[cfg(test)]
#[path = "slug_test.rs"]
mod slug_test;

/// Lowercase ASCII slug: alphanumerics kept, every other run of characters
/// collapsed to a single `-`, no leading or trailing `-`.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}
