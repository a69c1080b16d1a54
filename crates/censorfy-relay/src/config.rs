//! Relay configuration.
//!
//! Loaded from environment variables with sensible defaults.

use std::net::SocketAddr;
use std::time::Duration;

/// Relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Address to bind the HTTP listener to.
    pub bind_addr: SocketAddr,
    /// Base URL of the upstream censorship checker.
    pub upstream_url: String,
    /// Timeout for each upstream call.
    pub upstream_timeout: Duration,
    /// Log level filter (e.g., `info`, `debug`, `warn`).
    pub log_level: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            upstream_url: "http://localhost:8000".to_owned(),
            upstream_timeout: Duration::from_secs(30),
            log_level: "info".to_owned(),
        }
    }
}

impl RelayConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `PORT` — port to bind on, binds to `0.0.0.0`
    /// - `CENSORFY_RELAY_BIND_ADDR` — full bind address (overrides `PORT`, default: `127.0.0.1:3000`)
    /// - `CENSORFY_UPSTREAM_URL` — upstream checker base URL (default: `http://localhost:8000`)
    /// - `CENSORFY_UPSTREAM_TIMEOUT_SECS` — upstream timeout in seconds (default: `30`)
    /// - `CENSORFY_LOG_LEVEL` — log filter (default: `info`)
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        // Priority: CENSORFY_RELAY_BIND_ADDR > PORT > default 127.0.0.1:3000
        let bind_addr = if let Some(addr) = var("CENSORFY_RELAY_BIND_ADDR") {
            addr.parse().unwrap_or(defaults.bind_addr)
        } else if let Some(port) = var("PORT") {
            match port.parse::<u16>() {
                Ok(port) => SocketAddr::from(([0, 0, 0, 0], port)),
                Err(_) => defaults.bind_addr,
            }
        } else {
            defaults.bind_addr
        };

        let upstream_url = var("CENSORFY_UPSTREAM_URL")
            .filter(|v| !v.is_empty())
            .map_or(defaults.upstream_url, |v| v.trim_end_matches('/').to_owned());

        let upstream_timeout = var("CENSORFY_UPSTREAM_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .filter(|secs| *secs > 0)
            .map_or(defaults.upstream_timeout, Duration::from_secs);

        let log_level = var("CENSORFY_LOG_LEVEL").unwrap_or(defaults.log_level);

        Self {
            bind_addr,
            upstream_url,
            upstream_timeout,
            log_level,
        }
    }
}
