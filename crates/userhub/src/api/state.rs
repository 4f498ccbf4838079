//! Application state shared across handlers.

use std::sync::Arc;

use crate::auth::{AuthService, AuthState};
use crate::organization::OrganizationService;
use crate::user::UserService;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// User service for user management.
    pub users: Arc<UserService>,
    /// Organization service with per-operation authorization gates.
    pub organizations: Arc<OrganizationService>,
    /// Credential verification and login.
    pub auth_service: Arc<AuthService>,
    /// Token verification state for the middleware.
    pub auth: AuthState,
}

impl AppState {
    /// Create new application state.
    pub fn new(
        users: UserService,
        organizations: OrganizationService,
        auth_service: AuthService,
        auth: AuthState,
    ) -> Self {
        Self {
            users: Arc::new(users),
            organizations: Arc::new(organizations),
            auth_service: Arc::new(auth_service),
            auth,
        }
    }
}
