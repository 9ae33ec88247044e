#![forbid(unsafe_code)]

//! Outbound notification of persisted leads to an external automation webhook.

use std::time::{Duration, Instant};

use leadvault_core::Lead;

pub const DEFAULT_RELAY_TIMEOUT_MS: u64 = 5_000;

pub trait RelayTarget: Send + Sync {
    fn name(&self) -> &'static str;

    /// Transmits `lead` once. Callers never retry.
    ///
    /// # Errors
    /// Returns [`RelayError`] when the target is unreachable, times out or
    /// answers with a non-2xx status.
    fn deliver(&self, lead: &Lead) -> Result<RelayReceipt, RelayError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayReceipt {
    pub status_code: u16,
    pub latency_ms: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("relay configuration error: {0}")]
    Configuration(String),
    #[error("failed to encode lead for relay: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("relay target answered with http status {0}")]
    Status(u16),
    #[error("relay transport failure: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    pub url: String,
    pub timeout_ms: u64,
}

impl RelayConfig {
    /// # Errors
    /// Returns [`RelayError::Configuration`] when the URL is not `http(s)` or
    /// the timeout is zero.
    pub fn new(url: impl Into<String>, timeout_ms: u64) -> Result<Self, RelayError> {
        let url: String = url.into();
        let url = url.trim().to_string();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(RelayError::Configuration(format!(
                "relay url must start with http:// or https://, got '{url}'"
            )));
        }
        if timeout_ms == 0 {
            return Err(RelayError::Configuration(
                "relay timeout_ms MUST be >= 1".to_string(),
            ));
        }
        Ok(Self { url, timeout_ms })
    }
}

/// POSTs each lead as JSON to a configured webhook URL.
#[derive(Debug)]
pub struct WebhookRelay {
    config: RelayConfig,
    agent: ureq::Agent,
}

impl WebhookRelay {
    #[must_use]
    pub fn new(config: RelayConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build();
        Self { config, agent }
    }
}

impl RelayTarget for WebhookRelay {
    fn name(&self) -> &'static str {
        "webhook"
    }

    fn deliver(&self, lead: &Lead) -> Result<RelayReceipt, RelayError> {
        let body = serde_json::to_vec(lead).map_err(RelayError::Encode)?;
        let started = Instant::now();

        let response = self
            .agent
            .post(&self.config.url)
            .set("content-type", "application/json")
            .send_bytes(&body);

        let status_code = match response {
            Ok(response) => response.status(),
            Err(ureq::Error::Status(code, _)) => code,
            Err(ureq::Error::Transport(err)) => {
                return Err(RelayError::Transport(err.to_string()));
            }
        };

        if !(200..300).contains(&status_code) {
            return Err(RelayError::Status(status_code));
        }

        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        Ok(RelayReceipt { status_code, latency_ms })
    }
}
