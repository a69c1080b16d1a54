//! Censorfy client implementation.

use reqwest::StatusCode;
use serde_json::value::RawValue;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{CensorfyError, Operation};
use crate::session::BearerToken;
use crate::types::{
    ApiKeyRecord, AuthResponse, CreateKeyResponse, LoginRequest, SignupOutcome, SignupRequest,
};
use crate::{Client, ClientConfig, DEFAULT_BASE_URL, DEFAULT_RELAY_URL, DEFAULT_TIMEOUT, USER_AGENT};

impl Client {
    /// Create a client configured from `CENSORFY_*` env vars and defaults.
    ///
    /// # Errors
    ///
    /// Returns `CensorfyError::Config` if the HTTP client cannot be built.
    pub fn from_env() -> Result<Self, CensorfyError> {
        Self::with_config(&ClientConfig::default())
    }

    /// Create a client against an explicit auth service URL.
    ///
    /// # Errors
    ///
    /// Returns `CensorfyError::Config` if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, CensorfyError> {
        Self::with_config(&ClientConfig {
            base_url: base_url.into(),
            ..Default::default()
        })
    }

    /// Create a client with full configuration.
    ///
    /// # Errors
    ///
    /// Returns `CensorfyError::Config` if a URL is not http(s) or the HTTP
    /// client cannot be built.
    pub fn with_config(cfg: &ClientConfig) -> Result<Self, CensorfyError> {
        let base_url = resolve_url(&cfg.base_url, "CENSORFY_API_URL", DEFAULT_BASE_URL)?;
        let relay_url = resolve_url(&cfg.relay_url, "CENSORFY_RELAY_URL", DEFAULT_RELAY_URL)?;

        let timeout = if cfg.timeout.is_zero() {
            DEFAULT_TIMEOUT
        } else {
            cfg.timeout
        };

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| CensorfyError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url,
            relay_url,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn relay_url(&self) -> &str {
        &self.relay_url
    }

    // --- Key lifecycle ---

    /// List the key records owned by the token's principal, in the
    /// service's record order.
    ///
    /// # Errors
    ///
    /// Returns `CensorfyError::Shape` if the body is not a JSON array of
    /// `{ key, _id }` records, or an auth/transport error if the call fails.
    pub async fn list_key_records(
        &self,
        token: &BearerToken,
    ) -> Result<Vec<ApiKeyRecord>, CensorfyError> {
        let op = Operation::ListKeys;
        let req = self.http.get(self.url("/auth/keys")).bearer_auth(token.expose());
        let text = self.send(op, req).await?;

        let value: Value = serde_json::from_str(&text)
            .map_err(|e| CensorfyError::shape(op, format!("body is not JSON: {e}")))?;
        if !value.is_array() {
            warn!(operation = %op, "key listing is not an array");
            return Err(CensorfyError::shape(op, "expected a JSON array of key records"));
        }
        let records: Vec<ApiKeyRecord> = serde_json::from_value(value)
            .map_err(|e| CensorfyError::shape(op, format!("malformed key record: {e}")))?;

        debug!(count = records.len(), "listed API keys");
        Ok(records)
    }

    /// List the key values owned by the token's principal.
    ///
    /// # Errors
    ///
    /// Same as [`Client::list_key_records`].
    pub async fn list_keys(&self, token: &BearerToken) -> Result<Vec<String>, CensorfyError> {
        let records = self.list_key_records(token).await?;
        Ok(records.into_iter().map(|r| r.key).collect())
    }

    /// Mint one new key for the token's principal. Takes no parameters.
    ///
    /// # Errors
    ///
    /// Returns `CensorfyError::Shape` if the response lacks `apiKey`, or an
    /// auth/transport error if the call fails.
    pub async fn create_key(&self, token: &BearerToken) -> Result<String, CensorfyError> {
        let op = Operation::CreateKey;
        let req = self
            .http
            .post(self.url("/auth/keys"))
            .bearer_auth(token.expose())
            .json(&serde_json::json!({}));
        let text = self.send(op, req).await?;

        let resp: CreateKeyResponse = serde_json::from_str(&text)
            .map_err(|e| CensorfyError::shape(op, format!("body is not a key object: {e}")))?;
        let key = resp
            .api_key
            .filter(|k| !k.is_empty())
            .ok_or_else(|| CensorfyError::shape(op, "response is missing `apiKey`"))?;

        debug!("created API key");
        Ok(key)
    }

    /// Delete one key, addressed by its value.
    ///
    /// # Errors
    ///
    /// Returns `CensorfyError::Api` if the service rejects the delete (for
    /// example an unknown key), or an auth/transport error.
    pub async fn delete_key(&self, token: &BearerToken, key: &str) -> Result<(), CensorfyError> {
        let op = Operation::DeleteKey;
        if key.is_empty() {
            return Err(CensorfyError::Config("API key must not be empty".to_owned()));
        }
        let path = format!("/auth/keys/{}", urlencoding::encode(key));
        let req = self.http.delete(self.url(&path)).bearer_auth(token.expose());
        self.send(op, req).await?;

        debug!("deleted API key");
        Ok(())
    }

    /// Call the sample endpoint with `key`. No session token is sent.
    ///
    /// The JSON payload is returned exactly as the service sent it.
    ///
    /// # Errors
    ///
    /// Every failure, including an invalid or revoked key and a non-JSON
    /// body, is `CensorfyError::Exercise`.
    pub async fn exercise_key(&self, key: &str) -> Result<Box<RawValue>, CensorfyError> {
        let op = Operation::ExerciseKey;
        let req = self.http.get(self.url("/api/hello")).query(&[("apiKey", key)]);
        let text = self
            .send(op, req)
            .await
            .map_err(CensorfyError::into_exercise)?;

        serde_json::from_str::<Box<RawValue>>(&text).map_err(|e| CensorfyError::Exercise {
            status_code: None,
            message: format!("response is not valid JSON: {e}"),
        })
    }

    // --- Authentication ---

    /// Log in and obtain a bearer token.
    ///
    /// # Errors
    ///
    /// Returns the service's `message` verbatim on rejection, the fallback
    /// message on transport failure, or `CensorfyError::Shape` if a 2xx body
    /// carries no token.
    pub async fn login(&self, username: &str, password: &str) -> Result<BearerToken, CensorfyError> {
        let op = Operation::Login;
        let req = self
            .http
            .post(self.url("/auth/login"))
            .json(&LoginRequest { username, password });
        let resp = self.send_auth(op, req).await?;

        let token = resp
            .token
            .ok_or_else(|| CensorfyError::shape(op, "response is missing `token`"))?;
        debug!("login succeeded");
        BearerToken::new(token).map_err(|_| CensorfyError::shape(op, "`token` is empty"))
    }

    /// Register a new principal.
    ///
    /// # Errors
    ///
    /// Same as [`Client::login`], except a 2xx without a token is the
    /// [`SignupOutcome::Registered`] success.
    pub async fn signup(
        &self,
        name: &str,
        username: &str,
        password: &str,
    ) -> Result<SignupOutcome, CensorfyError> {
        let op = Operation::Signup;
        let req = self.http.post(self.url("/auth/signup")).json(&SignupRequest {
            name,
            username,
            password,
        });
        let resp = self.send_auth(op, req).await?;

        match resp.token.filter(|t| !t.trim().is_empty()) {
            Some(token) => {
                debug!("signup returned a session token");
                Ok(SignupOutcome::Authenticated(BearerToken::new(token)?))
            }
            None => {
                debug!("signup succeeded without a session token");
                Ok(SignupOutcome::Registered {
                    message: resp.message,
                })
            }
        }
    }

    // --- Censorship relay ---

    /// Submit `payload` to the censorship relay on behalf of the session.
    ///
    /// The token is injected as the payload's `token` field; the relay
    /// forwards it upstream as a bearer credential.
    ///
    /// # Errors
    ///
    /// Returns `CensorfyError::Config` if `payload` is not a JSON object, or
    /// the relay's `error` message on failure.
    pub async fn check_censorship(
        &self,
        token: &BearerToken,
        payload: Value,
    ) -> Result<Value, CensorfyError> {
        let op = Operation::CheckCensorship;
        let Value::Object(mut body) = payload else {
            return Err(CensorfyError::Config(
                "censorship check payload must be a JSON object".to_owned(),
            ));
        };
        body.insert("token".to_owned(), Value::String(token.expose().to_owned()));

        let url = format!("{}/api/api-key", self.relay_url);
        let req = self.http.post(url).json(&body);
        let text = self.send(op, req).await?;

        serde_json::from_str(&text)
            .map_err(|e| CensorfyError::shape(op, format!("body is not JSON: {e}")))
    }

    // --- Private ---

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send_auth(
        &self,
        op: Operation,
        req: reqwest::RequestBuilder,
    ) -> Result<AuthResponse, CensorfyError> {
        let text = self.send(op, req).await?;
        serde_json::from_str(&text)
            .map_err(|e| CensorfyError::shape(op, format!("body is not an auth object: {e}")))
    }

    /// Send once and return the body of a 2xx response.
    async fn send(
        &self,
        op: Operation,
        req: reqwest::RequestBuilder,
    ) -> Result<String, CensorfyError> {
        let resp = req.send().await.map_err(|e| {
            warn!(operation = %op, error = %e, "request failed");
            CensorfyError::transport(op, e)
        })?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| CensorfyError::transport(op, e))?;

        if status.is_success() {
            return Ok(text);
        }

        warn!(operation = %op, status = status.as_u16(), "service returned an error");
        Err(error_from_response(op, status, &text))
    }
}

/// Map a non-2xx response to the error taxonomy.
fn error_from_response(op: Operation, status: StatusCode, body: &str) -> CensorfyError {
    let Some(message) = extract_message(op, body) else {
        return CensorfyError::Transport {
            operation: op,
            status_code: Some(status.as_u16()),
            message: op.fallback_message().to_owned(),
            source: None,
        };
    };

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return CensorfyError::Auth {
            operation: op,
            status_code: status.as_u16(),
            message,
        };
    }

    CensorfyError::Api {
        operation: op,
        status_code: status.as_u16(),
        message,
    }
}

fn extract_message(op: Operation, body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    let field = |name: &str| {
        json.get(name)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
    };
    if op.prefers_message_field() {
        field("message").or_else(|| field("error"))
    } else {
        field("error").or_else(|| field("message"))
    }
}

fn resolve_url(explicit: &str, env_var: &str, default: &str) -> Result<String, CensorfyError> {
    let from_env = std::env::var(env_var).unwrap_or_default();
    let url = first_non_empty(&[explicit, &from_env, default])
        .trim_end_matches('/')
        .to_owned();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(CensorfyError::Config(format!(
            "{url:?} is not an http(s) URL; set {env_var} or pass it in config"
        )));
    }
    Ok(url)
}

fn first_non_empty(vals: &[&str]) -> String {
    for v in vals {
        if !v.is_empty() {
            return (*v).to_owned();
        }
    }
    String::new()
}
