//! Session context and the persisted token slot.
//!
//! A [`Session`] moves through `None -> Authenticated -> Cleared`. It is passed
//! explicitly to whatever performs key operations; nothing looks the token up
//! from ambient state. An optional [`TokenStore`] mirrors the token so a later
//! process can restore the session.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::error::CensorfyError;

/// Opaque bearer credential for a principal.
///
/// Never inspected by the client. `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    /// Wrap a token string.
    ///
    /// # Errors
    ///
    /// Returns `CensorfyError::Config` if the token is empty or whitespace.
    pub fn new(token: impl Into<String>) -> Result<Self, CensorfyError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(CensorfyError::Config("bearer token must not be empty".to_owned()));
        }
        Ok(Self(token))
    }

    /// The raw token value, for building the `Authorization` header.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken([redacted])")
    }
}

/// Where a session stands in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Never authenticated.
    #[default]
    None,
    /// Holding a token from login or signup.
    Authenticated(BearerToken),
    /// Logged out. Terminal for this session.
    Cleared,
}

/// Explicit session context for one principal.
#[derive(Debug, Default)]
pub struct Session {
    state: SessionState,
    store: Option<Arc<dyn TokenStore>>,
}

impl Session {
    /// A session with no token and no persistence.
    pub fn new() -> Self {
        Self::default()
    }

    /// A session that mirrors its token into `store`.
    pub fn with_store(store: Arc<dyn TokenStore>) -> Self {
        Self {
            state: SessionState::None,
            store: Some(store),
        }
    }

    /// An already-authenticated session without persistence.
    pub fn authenticated(token: BearerToken) -> Self {
        Self {
            state: SessionState::Authenticated(token),
            store: None,
        }
    }

    /// Rebuild a session from a persisted token slot.
    ///
    /// # Errors
    ///
    /// Returns `CensorfyError::NoSession` if the slot is empty, or
    /// `CensorfyError::TokenStore` if it cannot be read.
    pub fn restore(store: Arc<dyn TokenStore>) -> Result<Self, CensorfyError> {
        let token = store.load()?.ok_or(CensorfyError::NoSession)?;
        let token = BearerToken::new(token).map_err(|_| CensorfyError::NoSession)?;
        debug!("session restored from token store");
        Ok(Self {
            state: SessionState::Authenticated(token),
            store: Some(store),
        })
    }

    /// Record a freshly issued token and persist it.
    ///
    /// # Errors
    ///
    /// Returns `CensorfyError::TokenStore` if persisting fails. The session
    /// is authenticated in memory either way.
    pub fn authenticate(&mut self, token: BearerToken) -> Result<(), CensorfyError> {
        let persisted = match &self.store {
            Some(store) => store.save(token.expose()),
            None => Ok(()),
        };
        self.state = SessionState::Authenticated(token);
        persisted
    }

    /// The current token.
    ///
    /// # Errors
    ///
    /// Returns `CensorfyError::NoSession` unless the session is authenticated.
    pub fn token(&self) -> Result<&BearerToken, CensorfyError> {
        match &self.state {
            SessionState::Authenticated(token) => Ok(token),
            SessionState::None | SessionState::Cleared => Err(CensorfyError::NoSession),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, SessionState::Authenticated(_))
    }

    /// Drop the token and wipe the persisted slot. Purely local.
    ///
    /// # Errors
    ///
    /// Returns `CensorfyError::TokenStore` if the slot cannot be removed. The
    /// in-memory token is gone regardless.
    pub fn clear(&mut self) -> Result<(), CensorfyError> {
        self.state = SessionState::Cleared;
        match &self.store {
            Some(store) => store.clear(),
            None => Ok(()),
        }
    }
}

/// A single persisted slot holding the session token.
pub trait TokenStore: Send + Sync + fmt::Debug {
    /// Read the token, `None` when the slot is empty.
    ///
    /// # Errors
    ///
    /// Returns `CensorfyError::TokenStore` on I/O failure.
    fn load(&self) -> Result<Option<String>, CensorfyError>;

    /// Replace the token.
    ///
    /// # Errors
    ///
    /// Returns `CensorfyError::TokenStore` on I/O failure.
    fn save(&self, token: &str) -> Result<(), CensorfyError>;

    /// Empty the slot. Clearing an empty slot is not an error.
    ///
    /// # Errors
    ///
    /// Returns `CensorfyError::TokenStore` on I/O failure.
    fn clear(&self) -> Result<(), CensorfyError>;
}

/// Token slot backed by a file, written with `0600` permissions on Unix.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> CensorfyError {
        CensorfyError::TokenStore {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<String>, CensorfyError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let token = std::fs::read_to_string(&self.path).map_err(|e| self.io_error(e))?;
        let token = token.trim();
        if token.is_empty() {
            return Ok(None);
        }
        Ok(Some(token.to_owned()))
    }

    fn save(&self, token: &str) -> Result<(), CensorfyError> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                std::fs::create_dir_all(dir).map_err(|e| self.io_error(e))?;
            }
        }
        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path).map_err(|e| self.io_error(e))?;

        // `mode` only applies on creation; tighten a pre-existing slot too.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))
                .map_err(|e| self.io_error(e))?;
        }

        file.write_all(token.as_bytes()).map_err(|e| self.io_error(e))
    }

    fn clear(&self) -> Result<(), CensorfyError> {
        if self.path.exists() {
            std::fs::remove_file(&self.path).map_err(|e| self.io_error(e))?;
        }
        Ok(())
    }
}

/// In-process token slot.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    slot: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<String>, CensorfyError> {
        Ok(self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, token: &str) -> Result<(), CensorfyError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.to_owned());
        Ok(())
    }

    fn clear(&self) -> Result<(), CensorfyError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}
