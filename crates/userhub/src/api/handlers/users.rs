//! Admin user management handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::instrument;

use crate::auth::RequireAdmin;
use crate::user::{CreateUserRequest, UpdateUserRequest, UserInfo, UserListQuery};

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;

/// List users with optional filters (admin only).
#[instrument(skip(state, _admin))]
pub async fn list_users(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Query(query): Query<UserListQuery>,
) -> ApiResult<Json<Vec<UserInfo>>> {
    let users = state.users.list_users(query).await?;
    Ok(Json(users.into_iter().map(UserInfo::from).collect()))
}

/// Create a user (admin only). Unlike self-registration, the role and
/// organization may be assigned directly.
#[instrument(skip(state, _admin, request), fields(email = %request.email))]
pub async fn create_user(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Json(request): Json<CreateUserRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = state.users.create_user(request).await?;
    Ok((StatusCode::CREATED, Json(UserInfo::from(user))))
}

/// Get a user by ID (admin only).
#[instrument(skip(state, _admin))]
pub async fn get_user(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(user_id): Path<String>,
) -> ApiResult<Json<UserInfo>> {
    let user = state
        .users
        .get_user(&user_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("User not found: {}", user_id)))?;

    Ok(Json(user.into()))
}

/// Update a user (admin only).
#[instrument(skip(state, _admin, request))]
pub async fn update_user(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(user_id): Path<String>,
    Json(request): Json<UpdateUserRequest>,
) -> ApiResult<Json<UserInfo>> {
    let user = state.users.update_user(&user_id, request).await?;
    Ok(Json(user.into()))
}

/// Delete a user (admin only).
#[instrument(skip(state, _admin))]
pub async fn delete_user(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(user_id): Path<String>,
) -> ApiResult<StatusCode> {
    state.users.delete_user(&user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Deactivate a user (admin only).
#[instrument(skip(state, _admin))]
pub async fn deactivate_user(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(user_id): Path<String>,
) -> ApiResult<Json<UserInfo>> {
    let user = state.users.deactivate_user(&user_id).await?;
    Ok(Json(user.into()))
}

/// Activate a user (admin only).
#[instrument(skip(state, _admin))]
pub async fn activate_user(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(user_id): Path<String>,
) -> ApiResult<Json<UserInfo>> {
    let user = state.users.activate_user(&user_id).await?;
    Ok(Json(user.into()))
}
