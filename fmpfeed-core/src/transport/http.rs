//! Blocking HTTP transport for the live service.
//!
//! Joins the base URL and endpoint path, appends the `apikey` credential and
//! consults the circuit breaker before every request. No retries: a refused
//! or failed request surfaces as [`FetchError::Transport`] immediately.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;

use super::circuit_breaker::CircuitBreaker;
use super::{HttpTransport, Query, ResponseHandle};
use crate::config::ClientConfig;
use crate::error::FetchError;

pub struct HttpClientTransport {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
    circuit_breaker: Arc<CircuitBreaker>,
}

impl HttpClientTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, FetchError> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| FetchError::Config("no API key configured (set FMP_API_KEY)".into()))?
            .to_string();

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| FetchError::Config(format!("failed to build HTTP client: {e}")))?;

        let circuit_breaker = Arc::new(CircuitBreaker::new(
            Duration::from_secs(config.breaker_cooldown_secs),
            config.breaker_failure_threshold,
        ));

        Ok(Self {
            client,
            base_url: normalize_base(&config.base_url),
            api_key,
            circuit_breaker,
        })
    }

    /// Share a breaker with other transports talking to the same service.
    pub fn with_circuit_breaker(mut self, circuit_breaker: Arc<CircuitBreaker>) -> Self {
        self.circuit_breaker = circuit_breaker;
        self
    }

    pub fn circuit_breaker(&self) -> &Arc<CircuitBreaker> {
        &self.circuit_breaker
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }
}

fn normalize_base(base: &str) -> String {
    let trimmed = base.trim_end_matches('/');
    format!("{trimmed}/")
}

impl HttpTransport for HttpClientTransport {
    fn issue_get(&self, path: &str, query: &Query) -> Result<ResponseHandle, FetchError> {
        if !self.circuit_breaker.is_allowed() {
            return Err(FetchError::transport(
                path,
                format!(
                    "circuit breaker open, requests refused for another {}s",
                    self.circuit_breaker.remaining_cooldown().as_secs()
                ),
            ));
        }

        let mut params: Vec<(&str, &str)> = query
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        params.push(("apikey", self.api_key.as_str()));

        let response = self
            .client
            .get(self.url(path))
            .query(&params)
            .send()
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    self.circuit_breaker.record_failure();
                }
                // the URL carries the credential
                FetchError::transport(path, e.without_url().to_string())
            })?;

        let status = response.status();
        match status {
            StatusCode::FORBIDDEN => self.circuit_breaker.trip(),
            StatusCode::TOO_MANY_REQUESTS => self.circuit_breaker.record_failure(),
            s if s.is_success() => self.circuit_breaker.record_success(),
            _ => {}
        }
        tracing::debug!(path, status = status.as_u16(), "request issued");

        Ok(ResponseHandle::new(status.as_u16(), response))
    }
}

impl fmt::Debug for HttpClientTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClientTransport")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("circuit_breaker", &self.circuit_breaker.state())
            .finish()
    }
}
