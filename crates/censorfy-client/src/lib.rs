//! Censorfy client for Rust.
//!
//! Manages the API keys of one authenticated principal against the Censorfy
//! auth service: list, create, delete, and exercise a key. Session-scoped
//! calls carry the principal's bearer token; exercising a key is
//! authenticated by the key alone.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use censorfy_client::{Client, KeyManager, MemoryTokenStore, Session};
//!
//! # async fn example() -> Result<(), censorfy_client::CensorfyError> {
//! let client = Client::from_env()?;
//! let token = client.login("a@b.com", "x").await?;
//!
//! let mut session = Session::with_store(Arc::new(MemoryTokenStore::new()));
//! session.authenticate(token)?;
//!
//! let keys = KeyManager::new(client, session);
//! let key = keys.create().await?;
//! let hello = keys.exercise(&key).await?;
//! println!("{}", hello.get());
//! keys.delete(&key).await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod manager;
mod session;
mod types;

pub use error::{CensorfyError, Operation};
pub use manager::{KeyCache, KeyManager};
pub use session::{BearerToken, FileTokenStore, MemoryTokenStore, Session, SessionState, TokenStore};
pub use types::{ApiKeyRecord, SignupOutcome};

use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api-service-server.vercel.app";
const DEFAULT_RELAY_URL: &str = "http://localhost:3000";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = concat!("censorfy-rust-client/", env!("CARGO_PKG_VERSION"));

/// Configuration for the Censorfy client.
///
/// Empty fields fall back to the matching environment variable, then to the
/// built-in default.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// Auth service base URL. Env: `CENSORFY_API_URL`.
    pub base_url: String,
    /// Censorship relay base URL. Env: `CENSORFY_RELAY_URL`.
    pub relay_url: String,
    /// Request timeout. Default: 10 seconds.
    pub timeout: Duration,
}

/// Censorfy HTTP client.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    relay_url: String,
    http: reqwest::Client,
}
