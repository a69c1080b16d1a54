//! Censorfy censorship-check relay.
//!
//! A stateless Axum service: `POST /api/api-key` takes a JSON object carrying
//! a `token` field and forwards it to the upstream checker with that token
//! as a bearer credential. Every failure collapses into one fixed 500 body.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
