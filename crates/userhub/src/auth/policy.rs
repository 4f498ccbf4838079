//! Per-operation authorization policy for organization management.
//!
//! Each organization operation declares its required role set and how it
//! is scoped to organization membership in one table, consulted by the
//! [`Authorizer`] before the operation runs.

use tracing::debug;

use super::claims::{Claims, Role};
use super::error::AuthError;

/// Roles with administrative privileges.
pub const ADMIN_ROLES: &[Role] = &[Role::Admin, Role::SuperAdmin];

/// Organization operations subject to authorization gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrgOperation {
    Create,
    ListAll,
    GetMine,
    Get,
    Update,
    Delete,
    AddUser,
    ListUsers,
}

/// How an operation is scoped to organization membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipRule {
    /// No membership requirement.
    None,
    /// The operation only ever touches the caller's own organization.
    SelfScoped,
    /// The caller must belong to the target organization, or be an admin.
    /// Subject to the `enforce_membership` toggle.
    MemberOrAdmin,
}

/// Authorization requirements for a single operation.
#[derive(Debug, Clone, Copy)]
pub struct OperationPolicy {
    /// Roles allowed to perform the operation; `None` admits any
    /// authenticated user.
    pub required_roles: Option<&'static [Role]>,
    /// Membership scoping for the operation.
    pub membership: MembershipRule,
}

/// Look up the policy for an operation.
pub fn policy(op: OrgOperation) -> OperationPolicy {
    match op {
        OrgOperation::Create => OperationPolicy {
            required_roles: None,
            membership: MembershipRule::None,
        },
        OrgOperation::ListAll => OperationPolicy {
            required_roles: Some(ADMIN_ROLES),
            membership: MembershipRule::None,
        },
        OrgOperation::GetMine => OperationPolicy {
            required_roles: None,
            membership: MembershipRule::SelfScoped,
        },
        OrgOperation::Get => OperationPolicy {
            required_roles: None,
            membership: MembershipRule::MemberOrAdmin,
        },
        OrgOperation::Update => OperationPolicy {
            required_roles: None,
            membership: MembershipRule::MemberOrAdmin,
        },
        OrgOperation::Delete => OperationPolicy {
            required_roles: Some(ADMIN_ROLES),
            membership: MembershipRule::None,
        },
        OrgOperation::AddUser => OperationPolicy {
            required_roles: Some(ADMIN_ROLES),
            membership: MembershipRule::None,
        },
        OrgOperation::ListUsers => OperationPolicy {
            required_roles: None,
            membership: MembershipRule::MemberOrAdmin,
        },
    }
}

/// Role and membership gates applied before each organization operation.
#[derive(Debug, Clone, Copy)]
pub struct Authorizer {
    enforce_membership: bool,
}

impl Authorizer {
    /// Create an authorizer. `enforce_membership` controls whether
    /// member-scoped operations actually check membership.
    pub fn new(enforce_membership: bool) -> Self {
        Self { enforce_membership }
    }

    /// Apply the role gate for an operation.
    pub fn check_role(&self, claims: &Claims, op: OrgOperation) -> Result<(), AuthError> {
        if let Some(required) = policy(op).required_roles
            && !required.contains(&claims.role)
        {
            return Err(AuthError::InsufficientPermissions(format!(
                "role {} may not perform this operation",
                claims.role
            )));
        }
        Ok(())
    }

    /// Whether the membership gate for `op` needs the acting user's
    /// stored organization to decide.
    pub fn needs_membership(&self, claims: &Claims, op: OrgOperation) -> bool {
        policy(op).membership == MembershipRule::MemberOrAdmin
            && self.enforce_membership
            && !claims.is_admin()
    }

    /// Apply the membership gate for an operation targeting `target_org`.
    ///
    /// `actor_org` is the acting user's organization as recorded in the
    /// store. Admins always pass. When enforcement is disabled the gate
    /// admits everyone and logs the skip.
    pub fn check_membership(
        &self,
        claims: &Claims,
        op: OrgOperation,
        actor_org: Option<&str>,
        target_org: &str,
    ) -> Result<(), AuthError> {
        if policy(op).membership != MembershipRule::MemberOrAdmin {
            return Ok(());
        }

        if !self.enforce_membership {
            debug!(?op, "membership gate disabled, admitting");
            return Ok(());
        }

        if claims.is_admin() || actor_org == Some(target_org) {
            return Ok(());
        }

        Err(AuthError::InsufficientPermissions(
            "not a member of this organization".to_string(),
        ))
    }
}
