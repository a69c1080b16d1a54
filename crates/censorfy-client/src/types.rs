//! Public and wire types for the Censorfy client.

use serde::{Deserialize, Serialize};

use crate::session::BearerToken;

/// An API key record as listed by the auth service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeyRecord {
    /// The credential value.
    pub key: String,
    /// Server-assigned identifier.
    #[serde(rename = "_id")]
    pub id: String,
}

/// Result of a successful signup.
#[derive(Debug)]
pub enum SignupOutcome {
    /// The service logged the new principal in immediately.
    Authenticated(BearerToken),
    /// The account exists but the caller must log in separately.
    Registered {
        /// Confirmation message from the service, if any.
        message: Option<String>,
    },
}

// --- Internal API request/response types ---

#[derive(Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Serialize)]
pub(crate) struct SignupRequest<'a> {
    pub name: &'a str,
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Deserialize)]
pub(crate) struct AuthResponse {
    pub token: Option<String>,
    pub message: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct CreateKeyResponse {
    #[serde(rename = "apiKey")]
    pub api_key: Option<String>,
}
