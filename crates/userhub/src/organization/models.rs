//! Organization data models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Organization entity from database.
///
/// An organization groups users by reference: membership lives on the
/// user rows (`users.organization_id`), not here.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Organization {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    /// Opaque JSON settings blob; stored and returned verbatim.
    pub settings: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Request to create a new organization.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrganizationRequest {
    pub name: String,
    pub description: Option<String>,
    pub settings: Option<String>,
}

/// Request to update an existing organization.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct UpdateOrganizationRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
    pub settings: Option<String>,
}
