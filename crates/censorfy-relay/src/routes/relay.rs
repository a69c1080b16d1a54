//! Censorship check relay: `POST /api/api-key`.
//!
//! The caller's JSON object is forwarded unchanged. Its `token` field becomes
//! the upstream `Authorization: Bearer` credential.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::RelayError;
use crate::state::RelayState;

pub fn router() -> Router<Arc<RelayState>> {
    Router::new().route("/api/api-key", post(check_censorship))
}

/// Forward a censorship check upstream and relay the JSON answer.
async fn check_censorship(
    State(state): State<Arc<RelayState>>,
    body: Bytes,
) -> Result<Json<Value>, RelayError> {
    let payload = parse_payload(&body)?;
    let token = bearer_from_payload(&payload)?;

    let resp = state
        .http
        .post(state.check_url())
        .bearer_auth(token)
        .json(&payload)
        .send()
        .await?;

    let status = resp.status();
    if !status.is_success() {
        return Err(RelayError::Upstream {
            status: status.as_u16(),
        });
    }

    let text = resp.text().await?;
    let value: Value =
        serde_json::from_str(&text).map_err(|e| RelayError::UpstreamBody(e.to_string()))?;

    debug!(status = status.as_u16(), "censorship check relayed");
    Ok(Json(value))
}

fn parse_payload(body: &[u8]) -> Result<Map<String, Value>, RelayError> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(RelayError::InvalidBody("expected a JSON object".to_owned())),
        Err(e) => Err(RelayError::InvalidBody(e.to_string())),
    }
}

fn bearer_from_payload(payload: &Map<String, Value>) -> Result<String, RelayError> {
    payload
        .get("token")
        .and_then(Value::as_str)
        .filter(|t| !t.trim().is_empty())
        .map(str::to_owned)
        .ok_or(RelayError::MissingToken)
}
