use std::fmt;
use std::time::Duration;

use crate::errors::ConsumerError;

pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const MODEL_ENV: &str = "OPENAI_MODEL";
pub const BASE_URL_ENV: &str = "OPENAI_BASE_URL";

pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Explicit configuration for streaming sessions: credential, model and
/// endpoint. Built once and passed to `StreamClient`.
#[derive(Clone)]
pub struct SessionConfig {
    /// API key used for bearer auth.
    pub api_key: String,
    /// Model identifier (for example `gpt-4o`).
    pub model: String,
    /// Base URL of the Responses-compatible endpoint.
    pub base_url: String,
    /// HTTP request timeout. Session timeouts are set per run.
    pub request_timeout: Duration,
}

impl SessionConfig {
    /// Creates a config with the default endpoint.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(120),
        }
    }

    /// Builds a config from `OPENAI_API_KEY`, `OPENAI_MODEL` and
    /// `OPENAI_BASE_URL`.
    pub fn from_env() -> Result<Self, ConsumerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConsumerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let present = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let api_key = present(API_KEY_ENV).ok_or_else(|| {
            ConsumerError::Configuration(format!("{API_KEY_ENV} environment variable not set"))
        })?;
        let model = present(MODEL_ENV).unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let mut config = Self::new(api_key, model);
        if let Some(base_url) = present(BASE_URL_ENV) {
            config = config.base_url(base_url);
        }
        Ok(config)
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Overrides the API base URL (for proxies or test servers).
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Checks the config before any session may start.
    pub fn validate(&self) -> Result<(), ConsumerError> {
        if self.api_key.trim().is_empty() {
            return Err(ConsumerError::Configuration(format!(
                "{API_KEY_ENV} must not be empty"
            )));
        }
        if self.model.trim().is_empty() {
            return Err(ConsumerError::Configuration("model must not be empty".into()));
        }
        if self.base_url.trim().is_empty() {
            return Err(ConsumerError::Configuration(
                "base url must not be empty".into(),
            ));
        }
        Ok(())
    }

    pub(crate) fn responses_url(&self) -> String {
        format!("{}/v1/responses", self.base_url.trim_end_matches('/'))
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}
