//! Relay configuration, loaded from TOML.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::options::TransportOptions;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid listen address {0}")]
    InvalidAddr(String),
}

/// Relay configuration.
///
/// ```toml
/// bind = "127.0.0.1"
/// port = 3000
/// upstream_url = "http://localhost:8000"
///
/// [extra_headers]
/// x-relay = "portfolio"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Address to bind to
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Base URL of the inference service; `/api/chat` is appended
    #[serde(default = "default_upstream_url")]
    pub upstream_url: String,

    /// Upstream request timeout in seconds. Unset means no timeout.
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Outbound HTTP proxy for upstream requests
    #[serde(default)]
    pub proxy: Option<String>,

    /// Headers added to every upstream request
    #[serde(default)]
    pub extra_headers: Option<HashMap<String, String>>,
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_upstream_url() -> String {
    "http://localhost:8000".to_string()
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            upstream_url: default_upstream_url(),
            timeout_secs: None,
            proxy: None,
            extra_headers: None,
        }
    }
}

impl ProxyConfig {
    /// Load config from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Socket address to listen on
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.bind, self.port);
        addr.parse().map_err(|_| ConfigError::InvalidAddr(addr))
    }

    /// Transport options for the upstream client
    pub fn transport_options(&self) -> TransportOptions {
        TransportOptions {
            timeout: self.timeout_secs.map(Duration::from_secs),
            proxy: self.proxy.clone(),
            extra_headers: self.extra_headers.clone(),
        }
    }
}
