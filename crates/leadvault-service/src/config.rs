use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use clap::Parser;
use leadvault_relay::{RelayConfig, RelayError, DEFAULT_RELAY_TIMEOUT_MS};

use crate::dispatch::DEFAULT_RELAY_QUEUE_CAPACITY;

pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone, Parser)]
#[command(name = "leadvault-service")]
#[command(about = "Lead intake HTTP service with flat-file persistence and webhook relay")]
pub struct Args {
    /// Listen address; falls back to `0.0.0.0:<port>`.
    #[arg(long, env = "LEADVAULT_BIND")]
    pub bind: Option<SocketAddr>,
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,
    #[arg(long, env = "LEADVAULT_DATA_FILE", default_value = "./data/leads.json")]
    pub data_file: PathBuf,
    /// Webhook notified of every persisted lead; relay is disabled when unset.
    #[arg(long, env = "LEADVAULT_RELAY_URL")]
    pub relay_url: Option<String>,
    /// Older name for the relay webhook, read only when `--relay-url` is unset.
    #[arg(long, env = "ZAPIER_WEBHOOK_URL", hide = true)]
    pub zapier_webhook_url: Option<String>,
    #[arg(long, env = "LEADVAULT_RELAY_TIMEOUT_MS", default_value_t = DEFAULT_RELAY_TIMEOUT_MS)]
    pub relay_timeout_ms: u64,
    #[arg(long, env = "LEADVAULT_RELAY_QUEUE_CAPACITY", default_value_t = DEFAULT_RELAY_QUEUE_CAPACITY)]
    pub relay_queue_capacity: usize,
}

impl Args {
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind
            .unwrap_or_else(|| SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port)))
    }

    /// # Errors
    /// Returns [`RelayError::Configuration`] when a relay URL is set but invalid.
    pub fn relay_config(&self) -> Result<Option<RelayConfig>, RelayError> {
        let url = self.relay_url.as_deref().or(self.zapier_webhook_url.as_deref());
        match url.map(str::trim) {
            None | Some("") => Ok(None),
            Some(url) => RelayConfig::new(url, self.relay_timeout_ms).map(Some),
        }
    }
}
