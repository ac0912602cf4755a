//! TOML configuration of the staging service.

use crate::SlotClock;
use jsonrpsee::{
    core::ClientError,
    http_client::{HttpClient, HttpClientBuilder},
};
use serde::{Deserialize, Serialize};
use std::{
    net::{Ipv4Addr, SocketAddr},
    path::Path,
    time::Duration,
};
use thiserror::Error;
use vestibule_confirm::AuthorityClient;
use vestibule_storage::StagingConfig;

/// Errors raised while loading a [`VestibuleConfig`] or building what it
/// describes.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// The configuration is not valid TOML for [`VestibuleConfig`].
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    /// The configuration could not be rendered as TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    /// The authority client could not be built.
    #[error("invalid authority endpoint: {0}")]
    Client(#[from] ClientError),
}

/// Top level configuration of the staging service.
///
/// Every section and field is optional in TOML and falls back to its
/// default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct VestibuleConfig {
    /// The header container.
    pub staging: StagingConfig,
    /// The confirmation forwarder.
    pub forwarder: ForwarderConfig,
    /// The RPC surfaces.
    pub rpc: RpcConfig,
}

impl VestibuleConfig {
    /// Parses a configuration from TOML.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Reads and parses the TOML file at `path`.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    /// Renders the configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Configuration of the [`ForwarderActor`](crate::ForwarderActor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ForwarderConfig {
    /// Maximum number of blocks per confirmation request. A full queue is
    /// flushed without waiting for the interval.
    pub max_batch: usize,
    /// Interval between flushes of a partially filled queue.
    pub flush_interval_ms: u64,
    /// Deadline of a single confirmation request.
    pub request_timeout_ms: u64,
    /// Unix timestamp of the authority's slot zero.
    pub genesis_time: u64,
    /// Length of an authority slot, in seconds.
    pub slot_duration: u64,
}

impl ForwarderConfig {
    /// Returns the flush interval.
    pub const fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    /// Returns the request deadline.
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Returns the authority's slot schedule.
    pub const fn slot_clock(&self) -> SlotClock {
        SlotClock::new(self.genesis_time, self.slot_duration)
    }
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            max_batch: 64,
            flush_interval_ms: 1_000,
            request_timeout_ms: 5_000,
            genesis_time: 0,
            slot_duration: 6,
        }
    }
}

/// Configuration of the JSON-RPC endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RpcConfig {
    /// Address the pending header API listens on.
    pub socket: SocketAddr,
    /// HTTP endpoint of the confirmation authority.
    pub authority_url: String,
}

impl RpcConfig {
    /// Builds an HTTP [`AuthorityClient`] for [`Self::authority_url`].
    pub fn authority_client(
        &self,
        request_timeout: Duration,
    ) -> Result<AuthorityClient<HttpClient>, ConfigError> {
        let client = HttpClientBuilder::default()
            .request_timeout(request_timeout)
            .build(&self.authority_url)?;
        Ok(AuthorityClient::new(client))
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            socket: SocketAddr::from((Ipv4Addr::LOCALHOST, 9546)),
            authority_url: "http://127.0.0.1:7877".to_string(),
        }
    }
}
