//! Client configuration values along with the normalization rules for
//! the persisted settings (base URL and user identifier)

use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Base URL used when nothing has been configured
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
/// User identifier used when nothing valid has been stored
pub const DEFAULT_USER_ID: u64 = 1;

/// Storage key for the backend base URL
pub const BASE_URL_KEY: &str = "api_base_url";
/// Storage key for the user identifier
pub const USER_ID_KEY: &str = "user_id";

/// Client user agent created from the name and version
pub const USER_AGENT: &str = concat!("BackendClient/v", env!("CARGO_PKG_VERSION"));

/// Request configuration shared by every call made through a context
#[derive(Debug, Clone)]
pub struct RequestConfig {
    /// Timeout applied to GET, POST and upload requests
    pub timeout: Duration,
    /// How long error notices stay on screen
    pub notice_duration: Duration,
    /// How long error notices from the retrying upload stay on screen
    pub fetch_notice_duration: Duration,
    /// Base URL to fall back to
    pub default_base_url: String,
    /// User agent sent with requests
    pub user_agent: String,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(30_000),
            notice_duration: Duration::from_millis(2500),
            fetch_notice_duration: Duration::from_millis(3000),
            default_base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: USER_AGENT.to_string(),
        }
    }
}

/// Base URL that could not be parsed as an absolute URL
#[derive(Debug, Error)]
#[error("Invalid base URL {value}: {source}")]
pub struct InvalidBaseUrl {
    pub value: String,
    #[source]
    pub source: url::ParseError,
}

/// Checks for a case-insensitive `http://` or `https://` prefix
pub fn has_http_scheme(value: &str) -> bool {
    let lower = value
        .get(..8)
        .unwrap_or(value)
        .to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Normalizes a base URL, filling in a missing scheme and removing any
/// trailing slashes. Empty values become [DEFAULT_BASE_URL]
///
/// ## Arguments
/// * `url` - The user provided base URL
pub fn normalize_base_url(url: &str) -> String {
    normalize_base_url_or(url, DEFAULT_BASE_URL)
}

/// Same as [normalize_base_url] but empty values become the normalized
/// form of `default`
///
/// ## Arguments
/// * `url`     - The user provided base URL
/// * `default` - Base URL used when `url` is empty
pub fn normalize_base_url_or(url: &str, default: &str) -> String {
    let url = url.trim();
    if url.is_empty() {
        let default = default.trim();
        if default.is_empty() {
            return DEFAULT_BASE_URL.to_string();
        }
        return normalize_base_url_or(default, DEFAULT_BASE_URL);
    }

    let mut value = String::with_capacity(url.len() + 7);

    // Allow hosts like 127.0.0.1:8000 without a scheme
    if !has_http_scheme(url) {
        value.push_str("http://");
    }

    value.push_str(url);

    let trimmed = value.trim_end_matches('/').len();
    value.truncate(trimmed);
    value
}

/// Normalizes the provided base URL and ensures the result is a valid
/// absolute URL
///
/// ## Arguments
/// * `url`     - The user provided base URL
/// * `default` - Base URL used when `url` is empty
pub fn validate_base_url(url: &str, default: &str) -> Result<String, InvalidBaseUrl> {
    let value = normalize_base_url_or(url, default);
    match Url::parse(&value) {
        Ok(_) => Ok(value),
        Err(source) => Err(InvalidBaseUrl { value, source }),
    }
}

/// Converts a raw numeric user identifier into a safe one, anything that
/// isn't finite and positive is replaced by [DEFAULT_USER_ID]
pub fn sanitize_user_id(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        let floored = value.floor();
        // Values between 0 and 1 floor to zero which is not a valid id
        if floored >= 1.0 {
            return floored as u64;
        }
    }
    DEFAULT_USER_ID
}

/// Parses a stored user identifier, returns [None] when the stored value
/// isn't a usable identifier
pub fn parse_user_id(raw: &str) -> Option<u64> {
    let value: f64 = raw.trim().parse().ok()?;
    if value.is_finite() && value >= 1.0 {
        Some(value.floor() as u64)
    } else {
        None
    }
}
