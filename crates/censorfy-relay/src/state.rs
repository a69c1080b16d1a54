//! Shared state for relay handlers.

use std::sync::Arc;

use crate::config::RelayConfig;

/// Shared state passed to all HTTP handlers.
#[derive(Debug)]
pub struct RelayState {
    /// Pooled client for upstream calls.
    pub http: reqwest::Client,
    /// Base URL of the upstream checker, without trailing slash.
    pub upstream_url: String,
}

impl RelayState {
    /// Build state from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &RelayConfig) -> Result<Arc<Self>, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(config.upstream_timeout)
            .user_agent(concat!("censorfy-relay/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Arc::new(Self {
            http,
            upstream_url: config.upstream_url.clone(),
        }))
    }

    /// Full URL of the upstream check endpoint.
    pub fn check_url(&self) -> String {
        format!("{}/api/check-censorship", self.upstream_url)
    }
}
