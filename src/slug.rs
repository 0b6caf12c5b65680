//! Slug normalization
//!
//! A slug is the merge key for plugin candidates and the lookup key
//! against the registry: lowercase ASCII alphanumerics separated by
//! single hyphens.

/// Normalize a plugin/theme identifier into a slug.
///
/// Lowercases, collapses every run of non-alphanumeric characters into a
/// single hyphen and trims hyphens from both ends. The result matches
/// `^[a-z0-9]+(-[a-z0-9]+)*$` or is empty.
pub fn normalize(raw: &str) -> String {
    let mut slug = String::with_capacity(raw.len());
    let mut pending_hyphen = false;

    for c in raw.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    slug
}
