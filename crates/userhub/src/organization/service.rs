//! Organization service for business logic.
//!
//! Every method takes the acting user's verified claims and consults the
//! authorization policy before touching the store.

use anyhow::{Error, Result, anyhow, bail};
use tracing::{info, instrument};

use super::models::{CreateOrganizationRequest, Organization, UpdateOrganizationRequest};
use super::repository::OrganizationRepository;
use crate::auth::{Authorizer, Claims, OrgOperation};
use crate::user::{UserInfo, UserRepository};

/// Service for organization management operations.
#[derive(Debug, Clone)]
pub struct OrganizationService {
    orgs: OrganizationRepository,
    users: UserRepository,
    authorizer: Authorizer,
}

impl OrganizationService {
    /// Create a new organization service.
    pub fn new(orgs: OrganizationRepository, users: UserRepository, authorizer: Authorizer) -> Self {
        Self {
            orgs,
            users,
            authorizer,
        }
    }

    /// The acting user's organization as recorded in the store.
    async fn actor_organization(&self, claims: &Claims) -> Result<Option<String>> {
        let actor = self
            .users
            .get(&claims.sub)
            .await?
            .ok_or_else(|| anyhow!("User not found: {}", claims.sub))?;
        Ok(actor.organization_id)
    }

    /// Apply the role gate, and the membership gate when the operation's
    /// policy scopes it to a target organization.
    async fn check_gates(&self, claims: &Claims, op: OrgOperation, target_org: &str) -> Result<()> {
        self.authorizer.check_role(claims, op).map_err(Error::new)?;

        if self.authorizer.needs_membership(claims, op) {
            let actor_org = self.actor_organization(claims).await?;
            self.authorizer
                .check_membership(claims, op, actor_org.as_deref(), target_org)
                .map_err(Error::new)?;
        }

        Ok(())
    }

    /// Create an organization and join the creator to it.
    #[instrument(skip(self, claims, request), fields(actor = %claims.sub, name = %request.name))]
    pub async fn create(
        &self,
        claims: &Claims,
        request: CreateOrganizationRequest,
    ) -> Result<Organization> {
        self.authorizer
            .check_role(claims, OrgOperation::Create)
            .map_err(Error::new)?;

        // Fast path; the unique constraint on the name column is the
        // actual guard against a concurrent duplicate create.
        if !self.orgs.is_name_available(&request.name).await? {
            bail!("Organization '{}' already exists.", request.name);
        }

        let organization = self.orgs.create(request).await?;
        self.users
            .set_organization(&claims.sub, &organization.id)
            .await?;
        info!(org_id = %organization.id, actor = %claims.sub, "Created organization");

        Ok(organization)
    }

    /// List every organization (admin only).
    #[instrument(skip(self, claims), fields(actor = %claims.sub))]
    pub async fn list_all(&self, claims: &Claims) -> Result<Vec<Organization>> {
        self.authorizer
            .check_role(claims, OrgOperation::ListAll)
            .map_err(Error::new)?;

        self.orgs.list().await
    }

    /// Resolve the acting user's own organization.
    ///
    /// A user without an organization gets `None`, not an error.
    #[instrument(skip(self, claims), fields(actor = %claims.sub))]
    pub async fn find_for_user(&self, claims: &Claims) -> Result<Option<Organization>> {
        self.authorizer
            .check_role(claims, OrgOperation::GetMine)
            .map_err(Error::new)?;

        let Some(org_id) = self.actor_organization(claims).await? else {
            return Ok(None);
        };

        let organization = self
            .orgs
            .get(&org_id)
            .await?
            .ok_or_else(|| anyhow!("Organization not found: {}", org_id))?;

        Ok(Some(organization))
    }

    /// Get an organization by ID.
    #[instrument(skip(self, claims), fields(actor = %claims.sub))]
    pub async fn get(&self, claims: &Claims, id: &str) -> Result<Organization> {
        self.check_gates(claims, OrgOperation::Get, id).await?;

        self.orgs
            .get(id)
            .await?
            .ok_or_else(|| anyhow!("Organization not found: {}", id))
    }

    /// Update an organization.
    #[instrument(skip(self, claims, request), fields(actor = %claims.sub))]
    pub async fn update(
        &self,
        claims: &Claims,
        id: &str,
        request: UpdateOrganizationRequest,
    ) -> Result<Organization> {
        self.check_gates(claims, OrgOperation::Update, id).await?;

        // Check if a new name is available (excluding this organization)
        if let Some(name) = &request.name
            && let Some(existing) = self.orgs.get_by_name(name).await?
            && existing.id != id
        {
            bail!("Organization '{}' already exists.", name);
        }

        let organization = self.orgs.update(id, request).await?;
        info!(org_id = %organization.id, "Updated organization");

        Ok(organization)
    }

    /// Delete an organization, detaching its members first (admin only).
    ///
    /// Member rows keep existing; only their organization reference is
    /// cleared.
    #[instrument(skip(self, claims), fields(actor = %claims.sub))]
    pub async fn delete(&self, claims: &Claims, id: &str) -> Result<()> {
        self.authorizer
            .check_role(claims, OrgOperation::Delete)
            .map_err(Error::new)?;

        let organization = self
            .orgs
            .get(id)
            .await?
            .ok_or_else(|| anyhow!("Organization not found: {}", id))?;

        let detached = self.users.detach_organization(&organization.id).await?;
        self.orgs.delete(&organization.id).await?;
        info!(org_id = %organization.id, detached, "Deleted organization");

        Ok(())
    }

    /// Put a user into an organization (admin only).
    #[instrument(skip(self, claims), fields(actor = %claims.sub))]
    pub async fn add_user(
        &self,
        claims: &Claims,
        organization_id: &str,
        user_id: &str,
    ) -> Result<UserInfo> {
        self.authorizer
            .check_role(claims, OrgOperation::AddUser)
            .map_err(Error::new)?;

        let user = self
            .users
            .get(user_id)
            .await?
            .ok_or_else(|| anyhow!("User not found: {}", user_id))?;
        let organization = self
            .orgs
            .get(organization_id)
            .await?
            .ok_or_else(|| anyhow!("Organization not found: {}", organization_id))?;

        self.users.set_organization(&user.id, &organization.id).await?;
        info!(org_id = %organization.id, user_id = %user.id, "Added user to organization");

        let updated = self
            .users
            .get(&user.id)
            .await?
            .ok_or_else(|| anyhow!("User not found after update: {}", user.id))?;

        Ok(updated.into())
    }

    /// List the members of an organization.
    #[instrument(skip(self, claims), fields(actor = %claims.sub))]
    pub async fn list_users(&self, claims: &Claims, organization_id: &str) -> Result<Vec<UserInfo>> {
        self.check_gates(claims, OrgOperation::ListUsers, organization_id)
            .await?;

        let organization = self
            .orgs
            .get(organization_id)
            .await?
            .ok_or_else(|| anyhow!("Organization not found: {}", organization_id))?;

        let members = self.users.list_by_organization(&organization.id).await?;
        Ok(members.into_iter().map(UserInfo::from).collect())
    }
}
