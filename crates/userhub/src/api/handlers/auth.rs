//! Authentication handlers.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use tracing::{info, instrument};

use crate::auth::{AuthError, CurrentUser, LoginResponse, Role};
use crate::user::{CreateUserRequest, UserInfo};

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;

/// Login request.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login endpoint.
#[instrument(skip(state, request), fields(email = %request.email))]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AuthError> {
    let user = state
        .auth_service
        .authenticate(&request.email, &request.password)
        .await?;

    let response = state.auth_service.login(user)?;
    Ok(Json(response))
}

/// Registration request.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

/// Register a new user.
///
/// Self-registration always creates a regular user; roles are assigned
/// through the admin user routes.
#[instrument(skip(state, request), fields(email = %request.email))]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = state
        .users
        .create_user(CreateUserRequest {
            email: request.email,
            password: request.password,
            first_name: request.first_name,
            last_name: request.last_name,
            role: Some(Role::User),
            organization_id: None,
        })
        .await?;

    info!(user_id = %user.id, "User registered");

    let response = state.auth_service.login(user.into())?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Get current user profile.
#[instrument(skip(state, user))]
pub async fn get_me(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<UserInfo>> {
    let db_user = state
        .users
        .get_user(user.id())
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(db_user.into()))
}
