//! Router assembly.

use axum::http::{HeaderValue, Method, header};
use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::auth::auth_middleware;

use super::handlers;
use super::state::AppState;

/// Build the full application router.
///
/// Two halves: a public router (health, login, register) and a protected
/// router carrying everything else behind the bearer-token middleware.
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer(&state);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let auth_state = state.auth.clone();

    let protected = Router::new()
        .route("/me", get(handlers::get_me))
        // Admin user management
        .route(
            "/users",
            get(handlers::list_users).post(handlers::create_user),
        )
        .route(
            "/users/{user_id}",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .route(
            "/users/{user_id}/deactivate",
            post(handlers::deactivate_user),
        )
        .route("/users/{user_id}/activate", post(handlers::activate_user))
        // Organizations; role and membership gates live in the service
        .route(
            "/organizations",
            get(handlers::list_organizations).post(handlers::create_organization),
        )
        .route(
            "/organizations/my-organization",
            get(handlers::get_my_organization),
        )
        .route(
            "/organizations/{org_id}",
            get(handlers::get_organization)
                .put(handlers::update_organization)
                .delete(handlers::delete_organization),
        )
        .route(
            "/organizations/{org_id}/users",
            get(handlers::list_organization_users),
        )
        .route(
            "/organizations/{org_id}/users/{user_id}",
            post(handlers::add_organization_user),
        )
        .layer(middleware::from_fn_with_state(auth_state, auth_middleware))
        .with_state(state.clone());

    let public = Router::new()
        .route("/health", get(handlers::health))
        .route("/auth/login", post(handlers::login))
        .route("/auth/register", post(handlers::register))
        .with_state(state);

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(cors)
        .layer(trace_layer)
}

/// CORS from the configured origin list; with nothing configured, all
/// cross-origin requests are refused.
fn build_cors_layer(state: &AppState) -> CorsLayer {
    let mut origins: Vec<HeaderValue> = Vec::new();
    for origin in state.auth.allowed_origins() {
        match origin.parse::<HeaderValue>() {
            Ok(value) => origins.push(value),
            Err(_) => tracing::warn!("CORS: ignoring unparseable origin: {}", origin),
        }
    }

    if origins.is_empty() {
        tracing::warn!("CORS: no origins configured, denying all cross-origin requests");
        return CorsLayer::new().allow_origin(AllowOrigin::exact(HeaderValue::from_static("null")));
    }

    tracing::info!("CORS: allowing {} origin(s)", origins.len());
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::ORIGIN,
        ])
        .allow_credentials(true)
}
