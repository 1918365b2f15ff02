//! URL utilities for consistent endpoint construction
//!
//! The backend origin is configurable, so base URLs arrive with or without
//! trailing slashes. These helpers normalize them before paths are appended.

/// Normalize a base URL by removing trailing slashes.
///
/// # Examples
///
/// ```
/// use chathub::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("http://localhost:8000"), "http://localhost:8000");
/// assert_eq!(normalize_base_url("http://localhost:8000/"), "http://localhost:8000");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Join a base URL and an endpoint path without producing double slashes.
///
/// # Examples
///
/// ```
/// use chathub::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("http://localhost:8000/", "/v1/models"),
///     "http://localhost:8000/v1/models"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let normalized_base = normalize_base_url(base_url);
    let endpoint = endpoint.trim_start_matches('/');
    format!("{}/{}", normalized_base, endpoint)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(
            normalize_base_url("https://api.example.com/v1"),
            "https://api.example.com/v1"
        );
        assert_eq!(
            normalize_base_url("https://api.example.com/v1///"),
            "https://api.example.com/v1"
        );
        assert_eq!(normalize_base_url(""), "");
        assert_eq!(normalize_base_url("///"), "");
    }

    #[test]
    fn test_construct_api_url() {
        assert_eq!(
            construct_api_url("http://localhost:8000", "v1/conversations"),
            "http://localhost:8000/v1/conversations"
        );
        assert_eq!(
            construct_api_url("http://localhost:8000/", "/v1/conversations"),
            "http://localhost:8000/v1/conversations"
        );
        assert_eq!(
            construct_api_url("https://api.example.com///", "models"),
            "https://api.example.com/models"
        );
    }
}
