//! Error types for the Censorfy client.

use std::fmt;

/// The remote operation an error originated from.
///
/// Carries the fallback message shown when the service gives no usable
/// explanation of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `GET /auth/keys`
    ListKeys,
    /// `POST /auth/keys`
    CreateKey,
    /// `DELETE /auth/keys/{key}`
    DeleteKey,
    /// `GET /api/hello?apiKey={key}`
    ExerciseKey,
    /// `POST /auth/login`
    Login,
    /// `POST /auth/signup`
    Signup,
    /// `POST /api/api-key` on the relay
    CheckCensorship,
}

impl Operation {
    /// Short machine-readable name, used in log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ListKeys => "list_keys",
            Self::CreateKey => "create_key",
            Self::DeleteKey => "delete_key",
            Self::ExerciseKey => "exercise_key",
            Self::Login => "login",
            Self::Signup => "signup",
            Self::CheckCensorship => "check_censorship",
        }
    }

    /// Message surfaced when the service response carries none.
    pub fn fallback_message(self) -> &'static str {
        match self {
            Self::ListKeys => "An unknown error occurred while fetching API keys",
            Self::CreateKey => "An unknown error occurred while creating API key",
            Self::DeleteKey => "An unknown error occurred while deleting API key",
            Self::ExerciseKey => "An unknown error occurred while exercising API key",
            Self::Login | Self::Signup => "Invalid credentials or registration failed.",
            Self::CheckCensorship => "Censorship check failed",
        }
    }

    /// Auth endpoints report failures in `message`, key endpoints in `error`.
    pub(crate) fn prefers_message_field(self) -> bool {
        matches!(self, Self::Login | Self::Signup)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// All errors that can occur when using the Censorfy client.
#[derive(Debug, thiserror::Error)]
pub enum CensorfyError {
    /// Missing or invalid configuration (empty token, bad payload).
    #[error("censorfy config error: {0}")]
    Config(String),

    /// No authenticated session. Callers should send the user to log in.
    #[error("not logged in")]
    NoSession,

    /// The request never produced a usable answer: network failure, or a
    /// non-2xx response without a parseable message.
    #[error("{message}")]
    Transport {
        /// Operation that failed.
        operation: Operation,
        /// HTTP status, when a response arrived at all.
        status_code: Option<u16>,
        /// Fallback message for the operation.
        message: String,
        /// Underlying HTTP client error, if any.
        #[source]
        source: Option<reqwest::Error>,
    },

    /// The service rejected the credentials (401/403).
    #[error("{message}")]
    Auth {
        /// Operation that failed.
        operation: Operation,
        /// HTTP status code.
        status_code: u16,
        /// Message from the service, verbatim.
        message: String,
    },

    /// The service answered non-2xx with a structured `error`/`message` body.
    #[error("{message}")]
    Api {
        /// Operation that failed.
        operation: Operation,
        /// HTTP status code.
        status_code: u16,
        /// Message from the service, verbatim.
        message: String,
    },

    /// A 2xx response whose body does not match the expected contract.
    #[error("unexpected response structure from the API ({operation}): {detail}")]
    Shape {
        /// Operation whose contract was violated.
        operation: Operation,
        /// What was wrong with the body.
        detail: String,
    },

    /// Exercising an API key failed (invalid, revoked, or unreachable).
    #[error("API key request failed: {message}")]
    Exercise {
        /// HTTP status, when a response arrived.
        status_code: Option<u16>,
        /// Message from the service or the fallback.
        message: String,
    },

    /// The persisted token slot could not be read or written.
    #[error("token store error at {path}: {source}")]
    TokenStore {
        /// Location of the slot.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl CensorfyError {
    pub(crate) fn transport(operation: Operation, source: reqwest::Error) -> Self {
        Self::Transport {
            operation,
            status_code: source.status().map(|s| s.as_u16()),
            message: operation.fallback_message().to_owned(),
            source: Some(source),
        }
    }

    pub(crate) fn shape(operation: Operation, detail: impl Into<String>) -> Self {
        Self::Shape {
            operation,
            detail: detail.into(),
        }
    }

    /// True for the failures a caller sees as "auth or transport": the request
    /// was rejected or never got a usable answer.
    pub fn is_auth_or_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::Auth { .. } | Self::Api { .. }
        )
    }

    /// HTTP status of the failed response, if there was one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Transport { status_code, .. } | Self::Exercise { status_code, .. } => {
                *status_code
            }
            Self::Auth { status_code, .. } | Self::Api { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }

    /// The string to show a user for this error.
    pub fn user_message(&self) -> String {
        match self {
            Self::Transport { message, .. }
            | Self::Auth { message, .. }
            | Self::Api { message, .. } => message.clone(),
            Self::Shape { .. } => "Unexpected response structure from the API.".to_owned(),
            other => other.to_string(),
        }
    }

    /// Fold any failure of a key-exercise call into [`CensorfyError::Exercise`].
    pub(crate) fn into_exercise(self) -> Self {
        match self {
            Self::Exercise { .. } => self,
            Self::Shape { detail, .. } => Self::Exercise {
                status_code: None,
                message: detail,
            },
            other => Self::Exercise {
                status_code: other.status_code(),
                message: other.user_message(),
            },
        }
    }
}
