//! URL utilities for consistent endpoint construction
//!
//! The Repolens API base URL comes from user configuration, so it may or
//! may not carry a trailing slash. These helpers normalize it before any
//! endpoint path is appended.

/// Normalize a base URL by removing trailing slashes.
///
/// # Examples
///
/// ```
/// use repolens::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("http://localhost:8000/api/v1"), "http://localhost:8000/api/v1");
/// assert_eq!(normalize_base_url("http://localhost:8000/api/v1/"), "http://localhost:8000/api/v1");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Construct a complete endpoint URL from a base URL and a path.
///
/// Absolute URLs are passed through untouched so callers can mix
/// pre-resolved URLs with relative endpoint paths.
///
/// # Examples
///
/// ```
/// use repolens::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("http://localhost:8000/api/v1/", "/users/login"),
///     "http://localhost:8000/api/v1/users/login"
/// );
/// assert_eq!(
///     construct_api_url("http://localhost:8000/api/v1", "https://other.example/x"),
///     "https://other.example/x"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        return endpoint.to_string();
    }
    let normalized_base = normalize_base_url(base_url);
    let endpoint = endpoint.trim_start_matches('/');
    format!("{}/{}", normalized_base, endpoint)
}
