//! Shared context state that the app should create once and pass to
//! the various request functions

use crate::{
    config::{
        has_http_scheme, normalize_base_url_or, parse_user_id, sanitize_user_id,
        validate_base_url, InvalidBaseUrl, RequestConfig, BASE_URL_KEY, DEFAULT_USER_ID,
        USER_ID_KEY,
    },
    notify::{LogNotifier, Notifier},
    store::{KeyValueStore, MemoryStore, StoreError},
};
use log::{debug, warn};
use reqwest::Client;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while changing the base URL
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The provided value isn't a valid base URL
    #[error(transparent)]
    InvalidBaseUrl(#[from] InvalidBaseUrl),
    /// The value couldn't be persisted
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Shared context
pub struct ClientContext {
    /// HTTP client for the client to make requests with
    pub http_client: Client,
    /// Local storage for the persisted settings
    pub store: Arc<dyn KeyValueStore>,
    /// Presentation layer for notices and the loading indicator
    pub notifier: Arc<dyn Notifier>,
    /// Request configuration
    pub config: RequestConfig,
}

impl ClientContext {
    pub fn new(
        http_client: Client,
        store: Arc<dyn KeyValueStore>,
        notifier: Arc<dyn Notifier>,
        config: RequestConfig,
    ) -> Self {
        Self {
            http_client,
            store,
            notifier,
            config,
        }
    }

    /// Creates a context backed by an in-memory store that reports to
    /// the log, using the default configuration
    pub fn in_memory() -> Result<Self, reqwest::Error> {
        let config = RequestConfig::default();
        let http_client = crate::api::create_http_client(&config)?;
        Ok(Self::new(
            http_client,
            Arc::new(MemoryStore::new()),
            Arc::new(LogNotifier),
            config,
        ))
    }

    /// Obtains the current base URL, falls back to the configured default
    /// when the stored value is missing or invalid
    pub fn base_url(&self) -> String {
        let default = self.config.default_base_url.as_str();
        let saved = self.store.get(BASE_URL_KEY).unwrap_or_default();

        match validate_base_url(&saved, default) {
            Ok(value) => value,
            Err(err) => {
                debug!("Ignoring stored base URL: {}", err);
                normalize_base_url_or(default, default)
            }
        }
    }

    /// Normalizes and persists a new base URL returning the stored value,
    /// empty values store the configured default
    ///
    /// ## Arguments
    /// * `url` - The new base URL
    pub fn set_base_url(&self, url: &str) -> Result<String, SettingsError> {
        let value = validate_base_url(url, &self.config.default_base_url)?;
        self.store.set(BASE_URL_KEY, &value)?;
        Ok(value)
    }

    /// Creates the absolute request URL for the provided path. Paths that
    /// already include a http(s) scheme are returned unchanged
    ///
    /// ## Arguments
    /// * `path` - Relative path or absolute URL
    pub fn build_url(&self, path: &str) -> String {
        if path.is_empty() {
            return self.base_url();
        }

        if has_http_scheme(path) {
            return path.to_string();
        }

        let mut url = self.base_url();
        url.push('/');
        url.push_str(path.trim_start_matches('/'));
        url
    }

    /// Obtains the current user identifier, the default identifier is
    /// persisted and returned when nothing valid is stored. Failing to
    /// persist the default is logged and the default is still returned
    pub fn user_id(&self) -> u64 {
        let stored = self.store.get(USER_ID_KEY);
        if let Some(value) = stored.as_deref().and_then(parse_user_id) {
            return value;
        }

        if let Err(err) = self.store.set(USER_ID_KEY, &DEFAULT_USER_ID.to_string()) {
            warn!("Failed to store default user id: {}", err);
        }
        DEFAULT_USER_ID
    }

    /// Persists a new user identifier returning the value that was stored
    ///
    /// ## Arguments
    /// * `user_id` - The new identifier, invalid values store the default
    pub fn set_user_id(&self, user_id: f64) -> Result<u64, StoreError> {
        let value = sanitize_user_id(user_id);
        self.store.set(USER_ID_KEY, &value.to_string())?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::DEFAULT_BASE_URL, store::FileStore};

    fn context() -> ClientContext {
        ClientContext::in_memory().unwrap()
    }

    #[test]
    fn test_base_url_defaults() {
        let ctx = context();
        assert_eq!(ctx.base_url(), DEFAULT_BASE_URL);
    }

    #[test]
    fn test_set_base_url_normalizes_and_persists() {
        let ctx = context();
        let value = ctx.set_base_url("192.168.1.20:8000//").unwrap();
        assert_eq!(value, "http://192.168.1.20:8000");
        assert_eq!(ctx.base_url(), "http://192.168.1.20:8000");
        assert_eq!(
            ctx.store.get(BASE_URL_KEY).as_deref(),
            Some("http://192.168.1.20:8000")
        );
    }

    #[test]
    fn test_invalid_stored_base_url_falls_back() {
        let ctx = context();
        ctx.store.set(BASE_URL_KEY, "http://bad host").unwrap();
        assert_eq!(ctx.base_url(), DEFAULT_BASE_URL);
    }

    #[test]
    fn test_build_url() {
        let ctx = context();
        ctx.set_base_url("http://10.0.0.1:8000/").unwrap();

        assert_eq!(ctx.build_url(""), "http://10.0.0.1:8000");
        assert_eq!(ctx.build_url("/courses"), "http://10.0.0.1:8000/courses");
        assert_eq!(ctx.build_url("courses"), "http://10.0.0.1:8000/courses");
        assert_eq!(ctx.build_url("//courses"), "http://10.0.0.1:8000/courses");
        assert_eq!(ctx.build_url("http://other/x"), "http://other/x");
        assert_eq!(ctx.build_url("HTTPS://other/x"), "HTTPS://other/x");
    }

    #[test]
    fn test_user_id_defaults_and_persists() {
        let ctx = context();
        assert_eq!(ctx.store.get(USER_ID_KEY), None);
        assert_eq!(ctx.user_id(), DEFAULT_USER_ID);
        assert_eq!(ctx.store.get(USER_ID_KEY).as_deref(), Some("1"));
    }

    #[test]
    fn test_user_id_invalid_stored_value_is_replaced() {
        let ctx = context();
        ctx.store.set(USER_ID_KEY, "-3").unwrap();
        assert_eq!(ctx.user_id(), DEFAULT_USER_ID);
        assert_eq!(ctx.store.get(USER_ID_KEY).as_deref(), Some("1"));
    }

    #[test]
    fn test_set_user_id() {
        let ctx = context();
        assert_eq!(ctx.set_user_id(0.0).unwrap(), DEFAULT_USER_ID);
        assert_eq!(ctx.user_id(), DEFAULT_USER_ID);
        assert_eq!(ctx.set_user_id(-5.0).unwrap(), DEFAULT_USER_ID);
        assert_eq!(ctx.user_id(), DEFAULT_USER_ID);
        assert_eq!(ctx.set_user_id(3.9).unwrap(), 3);
        assert_eq!(ctx.user_id(), 3);
        assert_eq!(ctx.store.get(USER_ID_KEY).as_deref(), Some("3"));
    }

    /// Context persisting to a file store at the provided path
    fn file_context(path: &std::path::Path, config: RequestConfig) -> ClientContext {
        let http_client = crate::api::create_http_client(&config).unwrap();
        ClientContext::new(
            http_client,
            Arc::new(FileStore::open(path).unwrap()),
            Arc::new(LogNotifier),
            config,
        )
    }

    #[test]
    fn test_setters_report_write_failures() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let ctx = file_context(&path, RequestConfig::default());

        ctx.set_base_url("10.0.0.8:8000").unwrap();
        ctx.set_user_id(5.0).unwrap();

        // A directory in place of the file makes every write fail
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        let err = ctx.set_base_url("10.0.0.9:8000").unwrap_err();
        assert!(matches!(err, SettingsError::Store(StoreError::Write(_))));
        assert_eq!(ctx.base_url(), "http://10.0.0.8:8000");

        assert!(matches!(ctx.set_user_id(6.0), Err(StoreError::Write(_))));
        assert_eq!(ctx.user_id(), 5);
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let ctx = context();
        let err = ctx.set_base_url("bad host:port").unwrap_err();
        assert!(matches!(err, SettingsError::InvalidBaseUrl(_)));
        assert_eq!(ctx.base_url(), DEFAULT_BASE_URL);
    }

    #[test]
    fn test_clearing_base_url_uses_configured_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = RequestConfig {
            default_base_url: "192.168.0.5:8000/".to_string(),
            ..Default::default()
        };
        let ctx = file_context(&dir.path().join("settings.json"), config);

        assert_eq!(ctx.base_url(), "http://192.168.0.5:8000");
        ctx.set_base_url("10.0.0.1:8000").unwrap();
        assert_eq!(ctx.set_base_url("").unwrap(), "http://192.168.0.5:8000");
        assert_eq!(ctx.base_url(), "http://192.168.0.5:8000");
    }
}
