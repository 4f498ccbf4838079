//! Organization handlers.
//!
//! Role and membership gates live in the organization service's policy
//! table; handlers only hand over the verified claims.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::instrument;

use crate::auth::CurrentUser;
use crate::organization::{CreateOrganizationRequest, Organization, UpdateOrganizationRequest};
use crate::user::UserInfo;

use crate::api::error::ApiResult;
use crate::api::state::AppState;

/// Create an organization; the creator is joined to it.
#[instrument(skip(state, user, request), fields(actor = %user.id()))]
pub async fn create_organization(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<CreateOrganizationRequest>,
) -> ApiResult<impl IntoResponse> {
    let organization = state.organizations.create(&user.claims, request).await?;
    Ok((StatusCode::CREATED, Json(organization)))
}

/// List every organization (admin only).
#[instrument(skip(state, user), fields(actor = %user.id()))]
pub async fn list_organizations(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<Vec<Organization>>> {
    let organizations = state.organizations.list_all(&user.claims).await?;
    Ok(Json(organizations))
}

/// Get the acting user's own organization, or null.
#[instrument(skip(state, user), fields(actor = %user.id()))]
pub async fn get_my_organization(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<Option<Organization>>> {
    let organization = state.organizations.find_for_user(&user.claims).await?;
    Ok(Json(organization))
}

/// Get an organization by ID.
#[instrument(skip(state, user), fields(actor = %user.id()))]
pub async fn get_organization(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(org_id): Path<String>,
) -> ApiResult<Json<Organization>> {
    let organization = state.organizations.get(&user.claims, &org_id).await?;
    Ok(Json(organization))
}

/// Update an organization.
#[instrument(skip(state, user, request), fields(actor = %user.id()))]
pub async fn update_organization(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(org_id): Path<String>,
    Json(request): Json<UpdateOrganizationRequest>,
) -> ApiResult<Json<Organization>> {
    let organization = state
        .organizations
        .update(&user.claims, &org_id, request)
        .await?;
    Ok(Json(organization))
}

/// Delete an organization (admin only).
#[instrument(skip(state, user), fields(actor = %user.id()))]
pub async fn delete_organization(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(org_id): Path<String>,
) -> ApiResult<StatusCode> {
    state.organizations.delete(&user.claims, &org_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Add a user to an organization (admin only).
#[instrument(skip(state, user), fields(actor = %user.id()))]
pub async fn add_organization_user(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((org_id, user_id)): Path<(String, String)>,
) -> ApiResult<Json<UserInfo>> {
    let added = state
        .organizations
        .add_user(&user.claims, &org_id, &user_id)
        .await?;
    Ok(Json(added))
}

/// List an organization's members.
#[instrument(skip(state, user), fields(actor = %user.id()))]
pub async fn list_organization_users(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(org_id): Path<String>,
) -> ApiResult<Json<Vec<UserInfo>>> {
    let members = state
        .organizations
        .list_users(&user.claims, &org_id)
        .await?;
    Ok(Json(members))
}
