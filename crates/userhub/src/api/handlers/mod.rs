//! HTTP request handlers.

mod auth;
mod organizations;
mod users;

pub use auth::*;
pub use organizations::*;
pub use users::*;

use axum::Json;
use serde_json::{Value, json};

/// Health check endpoint.
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
