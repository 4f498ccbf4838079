//! HTTP API module.
//!
//! Provides the REST surface over the authentication core and the user
//! and organization services.

mod error;
mod handlers;
mod routes;
mod state;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use routes::create_router;
pub use state::AppState;
