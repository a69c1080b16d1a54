//! HTTP routes for the relay.

pub mod health;
pub mod relay;

use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::state::RelayState;

/// Concurrent in-flight relay calls allowed before requests queue.
const RELAY_CONCURRENCY: usize = 64;

/// Build the complete relay router with its state applied.
pub fn router(state: Arc<RelayState>) -> Router {
    let relay_routes = relay::router()
        .layer(tower::limit::ConcurrencyLimitLayer::new(RELAY_CONCURRENCY));

    // The dashboard calls the relay from the browser.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .merge(relay_routes)
        .merge(health::router())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
}
