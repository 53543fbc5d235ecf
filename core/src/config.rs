//! Client configuration: base URL, default fetch options, failure policy.

use crate::error::ApiError;
use crate::http::FetchOptions;
use crate::normalize::FailureMeta;

/// Environment variable read by `ClientConfig::from_env`.
pub const BASE_URL_ENV: &str = "SIMPLE_PROTOCOL_BASE_URL";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    base_url: String,
    options: FetchOptions,
    failure_meta: FailureMeta,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            options: FetchOptions::default(),
            failure_meta: FailureMeta::default(),
        }
    }

    pub fn from_env() -> Result<Self, ApiError> {
        let base_url = std::env::var(BASE_URL_ENV)
            .map_err(|_| ApiError::Config(format!("{BASE_URL_ENV} is not set")))?;
        let config = Self::new(&base_url);
        config.validate()?;
        Ok(config)
    }

    /// Options merged over every request's method defaults.
    pub fn with_options(mut self, options: FetchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_failure_meta(mut self, failure_meta: FailureMeta) -> Self {
        self.failure_meta = failure_meta;
        self
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        if self.base_url.is_empty() {
            return Err(ApiError::Config("base url is empty".to_string()));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ApiError::Config(format!(
                "base url must start with http:// or https://, got {}",
                self.base_url
            )));
        }
        Ok(())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    pub fn failure_meta(&self) -> FailureMeta {
        self.failure_meta
    }

    /// Join `path` onto the base URL. An empty path addresses the base URL
    /// itself.
    pub fn url(&self, path: &str) -> String {
        if path.is_empty() {
            return self.base_url.clone();
        }
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}
