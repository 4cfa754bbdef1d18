//! Number-fact client
//!
//! The counter asks a remote service for a trivia fact about its current
//! value. The client is injected through [`NumberFactKey`], so tests and
//! previews never touch the network.

use composable_core::{BoxFuture, DependencyKey};
use std::sync::Arc;
use std::time::Duration;

/// Environment variable overriding the service base URL
pub const BASE_URL_ENV: &str = "NUMBER_FACT_BASE_URL";

/// Default service base URL
pub const DEFAULT_BASE_URL: &str = "http://numbersapi.com";

/// Failure fetching a fact
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NetworkError {
    /// The request could not be sent or its body not read
    #[error("request failed: {0}")]
    Request(String),

    /// The service answered with a non-success status
    #[error("service responded with status {0}")]
    Status(u16),
}

/// Fetches facts about numbers
pub trait NumberFactClient: Send + Sync {
    /// Fetch a fact about `number`
    fn fetch(&self, number: i64) -> BoxFuture<Result<String, NetworkError>>;
}

/// Configuration for [`LiveNumberFactClient`]
#[derive(Debug, Clone)]
pub struct NumberFactConfig {
    /// Service base URL; the number is appended as the last path segment
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl NumberFactConfig {
    /// Defaults, with the base URL taken from `NUMBER_FACT_BASE_URL` if set
    #[must_use]
    pub fn from_env() -> Self {
        match std::env::var(BASE_URL_ENV) {
            Ok(base_url) if !base_url.trim().is_empty() => Self::default().with_base_url(base_url),
            _ => Self::default(),
        }
    }

    /// Set the base URL
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the request timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// URL of the fact about `number`
    #[must_use]
    pub fn url_for(&self, number: i64) -> String {
        format!("{}/{number}", self.base_url.trim_end_matches('/'))
    }
}

impl Default for NumberFactConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Client calling the number-fact HTTP service
#[derive(Debug, Clone)]
pub struct LiveNumberFactClient {
    http: reqwest::Client,
    config: NumberFactConfig,
}

impl LiveNumberFactClient {
    /// Create a client for `config`
    #[must_use]
    pub fn new(config: NumberFactConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }
}

impl NumberFactClient for LiveNumberFactClient {
    fn fetch(&self, number: i64) -> BoxFuture<Result<String, NetworkError>> {
        let request = self
            .http
            .get(self.config.url_for(number))
            .timeout(self.config.timeout);

        Box::pin(async move {
            let response = request
                .send()
                .await
                .map_err(|e| NetworkError::Request(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(NetworkError::Status(status.as_u16()));
            }

            response
                .text()
                .await
                .map_err(|e| NetworkError::Request(e.to_string()))
        })
    }
}

/// Deterministic client: every number is a good number
#[derive(Debug, Clone, Copy, Default)]
pub struct TestNumberFactClient;

impl NumberFactClient for TestNumberFactClient {
    fn fetch(&self, number: i64) -> BoxFuture<Result<String, NetworkError>> {
        Box::pin(async move { Ok(format!("{number} is a good number.")) })
    }
}

/// Dependency key for the number-fact client
pub struct NumberFactKey;

impl DependencyKey for NumberFactKey {
    type Value = Arc<dyn NumberFactClient>;

    fn live_value() -> Self::Value {
        Arc::new(LiveNumberFactClient::new(NumberFactConfig::from_env()))
    }

    fn test_value() -> Self::Value {
        Arc::new(TestNumberFactClient)
    }
}
