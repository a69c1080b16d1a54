//! Session-bound key manager with a reconciled local cache.
//!
//! The cache only ever holds the last authoritative listing. Mutations never
//! patch it by hand: after a successful create or delete the manager lists
//! again and replaces it. A failed mutation leaves it untouched.
//!
//! Every operation records the cache generation when it starts, before any
//! network call. Logout and invalidation bump the generation, so a listing
//! that resolves afterwards, including the reconcile after an in-flight
//! create or delete, is discarded instead of resurrecting stale keys.

use std::sync::Arc;

use serde_json::value::RawValue;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::CensorfyError;
use crate::session::{BearerToken, Session};
use crate::types::ApiKeyRecord;
use crate::Client;

/// Locally cached copy of a principal's key set.
#[derive(Debug, Default)]
pub struct KeyCache {
    records: Option<Vec<ApiKeyRecord>>,
    generation: u64,
}

impl KeyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generation to pass back to [`KeyCache::apply`] for a listing
    /// dispatched now.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Replace the cache with a listing dispatched at `generation`.
    ///
    /// Returns `false`, leaving the cache unchanged, if the cache has been
    /// invalidated since.
    pub fn apply(&mut self, generation: u64, records: Vec<ApiKeyRecord>) -> bool {
        if generation != self.generation {
            return false;
        }
        self.records = Some(records);
        true
    }

    /// Forget the cached keys and orphan every in-flight listing.
    pub fn invalidate(&mut self) {
        self.records = None;
        self.generation = self.generation.wrapping_add(1);
    }

    /// Cached key values, `None` when nothing authoritative is cached.
    pub fn keys(&self) -> Option<Vec<String>> {
        self.records
            .as_ref()
            .map(|records| records.iter().map(|r| r.key.clone()).collect())
    }

    pub fn records(&self) -> Option<&[ApiKeyRecord]> {
        self.records.as_deref()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.records
            .as_ref()
            .is_some_and(|records| records.iter().any(|r| r.key == key))
    }
}

/// Key lifecycle operations for one session.
///
/// Cheap to clone; clones share the session and the cache, so a view that
/// outlives a logout sees its late responses dropped.
#[derive(Debug, Clone)]
pub struct KeyManager {
    client: Client,
    session: Arc<RwLock<Session>>,
    cache: Arc<RwLock<KeyCache>>,
}

impl KeyManager {
    pub fn new(client: Client, session: Session) -> Self {
        Self {
            client,
            session: Arc::new(RwLock::new(session)),
            cache: Arc::new(RwLock::new(KeyCache::new())),
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub async fn is_authenticated(&self) -> bool {
        self.session.read().await.is_authenticated()
    }

    /// Fetch the key list and replace the cache with it.
    ///
    /// # Errors
    ///
    /// Returns `CensorfyError::NoSession` without a token, otherwise any
    /// error from [`Client::list_key_records`]. The cache is unchanged on error.
    pub async fn refresh(&self) -> Result<Vec<String>, CensorfyError> {
        let token = self.token().await?;
        let generation = self.cache.read().await.generation();
        let records = self.fetch_and_apply(&token, generation).await?;
        Ok(records.into_iter().map(|r| r.key).collect())
    }

    /// Keys from the cache, without a network call.
    pub async fn cached_keys(&self) -> Option<Vec<String>> {
        self.cache.read().await.keys()
    }

    /// Mint a key, then reconcile the cache from a fresh listing.
    ///
    /// # Errors
    ///
    /// Returns any error from [`Client::create_key`]. A failed reconcile does
    /// not fail the create; the cache is invalidated instead.
    pub async fn create(&self) -> Result<String, CensorfyError> {
        let token = self.token().await?;
        let generation = self.cache.read().await.generation();
        let key = self.client.create_key(&token).await?;
        info!("API key created");
        self.reconcile(&token, generation).await;
        Ok(key)
    }

    /// Delete a key by value, then reconcile the cache.
    ///
    /// # Errors
    ///
    /// Returns any error from [`Client::delete_key`]; the cache is untouched
    /// in that case.
    pub async fn delete(&self, key: &str) -> Result<(), CensorfyError> {
        let token = self.token().await?;
        let generation = self.cache.read().await.generation();
        self.client.delete_key(&token, key).await?;
        info!("API key deleted");
        self.reconcile(&token, generation).await;
        Ok(())
    }

    /// Call the sample endpoint with `key`. Does not need the session.
    ///
    /// # Errors
    ///
    /// Returns `CensorfyError::Exercise` on any failure.
    pub async fn exercise(&self, key: &str) -> Result<Box<RawValue>, CensorfyError> {
        self.client.exercise_key(key).await
    }

    /// Run a censorship check through the relay with this session's token.
    ///
    /// # Errors
    ///
    /// Returns `CensorfyError::NoSession` without a token, otherwise any
    /// error from [`Client::check_censorship`].
    pub async fn check_censorship(&self, payload: Value) -> Result<Value, CensorfyError> {
        let token = self.token().await?;
        self.client.check_censorship(&token, payload).await
    }

    /// Clear the session and every cached key. No remote call.
    ///
    /// # Errors
    ///
    /// Returns `CensorfyError::TokenStore` if the persisted slot cannot be
    /// removed; the in-memory state is cleared regardless.
    pub async fn logout(&self) -> Result<(), CensorfyError> {
        self.cache.write().await.invalidate();
        let result = self.session.write().await.clear();
        info!("logged out");
        result
    }

    // --- Private ---

    async fn token(&self) -> Result<BearerToken, CensorfyError> {
        self.session.read().await.token().cloned()
    }

    /// List with `token` and apply the result if the cache is still at
    /// `generation`, the generation observed when the operation started.
    async fn fetch_and_apply(
        &self,
        token: &BearerToken,
        generation: u64,
    ) -> Result<Vec<ApiKeyRecord>, CensorfyError> {
        let records = self.client.list_key_records(token).await?;

        if !self.cache.write().await.apply(generation, records.clone()) {
            debug!(generation, "discarding key listing that resolved after invalidation");
        }
        Ok(records)
    }

    async fn reconcile(&self, token: &BearerToken, generation: u64) {
        if let Err(e) = self.fetch_and_apply(token, generation).await {
            warn!(error = %e, "could not reconcile key cache; invalidating");
            let mut cache = self.cache.write().await;
            // A newer generation has already dropped what this one cached.
            if cache.generation() == generation {
                cache.invalidate();
            }
        }
    }
}
