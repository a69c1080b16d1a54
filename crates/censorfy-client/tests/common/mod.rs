//! In-process stand-in for the Censorfy auth service.
//!
//! Implements the observed HTTP contract with real state so lifecycle
//! properties can be checked against the service rather than the cache.

#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;

/// Body returned by `/api/hello`, deliberately not in canonical JSON form.
pub const HELLO_BODY: &str = r#"{"message": "Hello, world!",  "zeta": 1, "alpha": [1,2]}"#;

pub const SEED_USER: &str = "a@b.com";
pub const SEED_PASSWORD: &str = "x";

#[derive(Default)]
struct FakeState {
    passwords: HashMap<String, String>,
    sessions: HashMap<String, String>,
    keys: HashMap<String, Vec<(String, String)>>,
    next_id: u64,
}

impl FakeState {
    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn owner_of_key(&self, key: &str) -> Option<&str> {
        self.keys
            .iter()
            .find(|(_, keys)| keys.iter().any(|(k, _)| k == key))
            .map(|(user, _)| user.as_str())
    }
}

type Shared = Arc<Mutex<FakeState>>;

/// Handle to a running fake service.
pub struct FakeService {
    pub base_url: String,
    state: Shared,
}

impl FakeService {
    /// Number of keys the service holds for `user`.
    pub fn key_count(&self, user: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .keys
            .get(user)
            .map_or(0, Vec::len)
    }

    /// Mint a key directly in the service, bypassing the client.
    pub fn seed_key(&self, user: &str, key: &str) {
        let mut state = self.state.lock().unwrap();
        let id = format!("id{}", state.next());
        state
            .keys
            .entry(user.to_owned())
            .or_default()
            .push((key.to_owned(), id));
    }
}

pub async fn spawn() -> FakeService {
    let mut initial = FakeState::default();
    initial
        .passwords
        .insert(SEED_USER.to_owned(), SEED_PASSWORD.to_owned());
    let state: Shared = Arc::new(Mutex::new(initial));

    let app = Router::new()
        .route("/auth/login", post(login))
        .route("/auth/signup", post(signup))
        .route("/auth/keys", get(list_keys).post(create_key))
        .route("/auth/keys/{key}", delete(delete_key))
        .route("/api/hello", get(hello))
        .with_state(Arc::clone(&state));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    FakeService {
        base_url: format!("http://{addr}"),
        state,
    }
}

fn error(status: StatusCode, field: &str, msg: &str) -> Response {
    (status, Json(json!({ field: msg }))).into_response()
}

fn principal(state: &FakeState, headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?;
    state.sessions.get(token).cloned()
}

#[derive(Deserialize)]
struct Credentials {
    username: String,
    password: String,
}

#[derive(Deserialize)]
struct Registration {
    name: String,
    username: String,
    password: String,
}

async fn login(State(state): State<Shared>, Json(body): Json<Credentials>) -> Response {
    let mut state = state.lock().unwrap();
    if state.passwords.get(&body.username) != Some(&body.password) {
        return error(StatusCode::UNAUTHORIZED, "message", "Invalid username or password");
    }
    let token = format!("tok-{}", state.next());
    state.sessions.insert(token.clone(), body.username);
    Json(json!({ "token": token })).into_response()
}

async fn signup(State(state): State<Shared>, Json(body): Json<Registration>) -> Response {
    let mut state = state.lock().unwrap();
    if body.name.is_empty() {
        return error(StatusCode::BAD_REQUEST, "message", "Name is required");
    }
    if state.passwords.contains_key(&body.username) {
        return error(StatusCode::BAD_REQUEST, "message", "User already exists");
    }
    state.passwords.insert(body.username, body.password);
    (
        StatusCode::CREATED,
        Json(json!({ "message": "User registered successfully" })),
    )
        .into_response()
}

async fn list_keys(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let state = state.lock().unwrap();
    let Some(user) = principal(&state, &headers) else {
        return error(StatusCode::UNAUTHORIZED, "error", "Unauthorized");
    };
    let keys: Vec<_> = state
        .keys
        .get(&user)
        .into_iter()
        .flatten()
        .map(|(key, id)| json!({ "key": key, "_id": id }))
        .collect();
    Json(keys).into_response()
}

async fn create_key(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let mut state = state.lock().unwrap();
    let Some(user) = principal(&state, &headers) else {
        return error(StatusCode::UNAUTHORIZED, "error", "Unauthorized");
    };
    let n = state.next();
    let key = format!("key-{n:04}");
    let id = format!("id{n}");
    state
        .keys
        .entry(user)
        .or_default()
        .push((key.clone(), id));
    (StatusCode::CREATED, Json(json!({ "apiKey": key }))).into_response()
}

async fn delete_key(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(key): Path<String>,
) -> Response {
    let mut state = state.lock().unwrap();
    let Some(user) = principal(&state, &headers) else {
        return error(StatusCode::UNAUTHORIZED, "error", "Unauthorized");
    };
    let keys = state.keys.entry(user).or_default();
    let before = keys.len();
    keys.retain(|(k, _)| *k != key);
    if keys.len() == before {
        return error(StatusCode::NOT_FOUND, "error", "API key not found");
    }
    Json(json!({ "message": "API key deleted" })).into_response()
}

#[derive(Deserialize)]
struct HelloQuery {
    #[serde(rename = "apiKey")]
    api_key: Option<String>,
}

async fn hello(State(state): State<Shared>, Query(query): Query<HelloQuery>) -> Response {
    let state = state.lock().unwrap();
    let valid = query
        .api_key
        .as_deref()
        .is_some_and(|key| state.owner_of_key(key).is_some());
    if !valid {
        return error(StatusCode::UNAUTHORIZED, "error", "Invalid API key");
    }
    ([(header::CONTENT_TYPE, "application/json")], HELLO_BODY).into_response()
}
