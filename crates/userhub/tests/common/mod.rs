//! Test utilities and common setup.

use axum::Router;

use userhub::api::{self, AppState};
use userhub::auth::{
    AuthConfig, AuthService, AuthState, Authorizer, PasswordHasher, Role,
};
use userhub::db::Database;
use userhub::organization::{OrganizationRepository, OrganizationService};
use userhub::user::{CreateUserRequest, User, UserService};

/// Create a test AuthConfig with a JWT secret for testing.
fn test_auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: Some("test-secret-for-integration-tests-minimum-32-chars".to_string()),
        ..AuthConfig::default()
    }
}

/// A fully wired application over an in-memory database, plus handles for
/// seeding state and minting tokens directly.
pub struct TestApp {
    pub router: Router,
    pub auth: AuthState,
    pub users: UserService,
}

/// Create a test application with all services initialized.
pub async fn test_app() -> TestApp {
    // Use in-memory database for tests
    let db = Database::in_memory().await.unwrap();

    let auth_config = test_auth_config();
    let auth_state = AuthState::new(&auth_config).unwrap();
    let hasher = PasswordHasher::default();

    let user_repo = userhub::user::UserRepository::new(db.pool().clone());
    let org_repo = OrganizationRepository::new(db.pool().clone());

    let user_service = UserService::new(user_repo.clone(), hasher);
    let auth_service = AuthService::new(user_repo.clone(), hasher, auth_state.issuer());
    let authorizer = Authorizer::new(auth_config.enforce_membership);
    let org_service = OrganizationService::new(org_repo, user_repo, authorizer);

    let state = AppState::new(
        user_service.clone(),
        org_service,
        auth_service,
        auth_state.clone(),
    );

    TestApp {
        router: api::create_router(state),
        auth: auth_state,
        users: user_service,
    }
}

/// Seed a user and return the stored row.
pub async fn seed_user(app: &TestApp, email: &str, password: &str, role: Role) -> User {
    app.users
        .create_user(CreateUserRequest {
            email: email.to_string(),
            password: password.to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            role: Some(role),
            organization_id: None,
        })
        .await
        .unwrap()
}

/// Mint a valid bearer token for a seeded user.
pub fn token_for(app: &TestApp, user: &User) -> String {
    app.auth
        .issue_token(&user.id, &user.email, user.role)
        .unwrap()
}
