//! User management logic over the repository.

use anyhow::{Result, bail};
use tracing::{info, instrument, warn};

use super::models::{CreateUserRequest, UpdateUserRequest, User, UserListQuery};
use super::repository::UserRepository;
use crate::auth::PasswordHasher;

/// Service for user management operations.
#[derive(Debug, Clone)]
pub struct UserService {
    repo: UserRepository,
    hasher: PasswordHasher,
}

impl UserService {
    pub fn new(repo: UserRepository, hasher: PasswordHasher) -> Self {
        Self { repo, hasher }
    }

    /// Validate a registration request, hash the password, and insert
    /// the user.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn create_user(&self, request: CreateUserRequest) -> Result<User> {
        if !is_valid_email(&request.email) {
            bail!("Invalid email format.");
        }
        if request.first_name.trim().is_empty() || request.last_name.trim().is_empty() {
            bail!("Invalid name: first and last name must not be empty.");
        }
        check_password_length(&request.password)?;

        // Fast-path duplicate answer; the column constraint still guards
        // the insert itself.
        if !self.repo.is_email_available(&request.email).await? {
            bail!("Email '{}' is already registered.", request.email);
        }

        let password_hash = self.hasher.hash(&request.password)?;
        let user = self.repo.create(request, &password_hash).await?;
        info!(user_id = %user.id, email = %user.email, "Created new user");

        Ok(user)
    }

    #[instrument(skip(self))]
    pub async fn get_user(&self, id: &str) -> Result<Option<User>> {
        self.repo.get(id).await
    }

    #[instrument(skip(self))]
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.repo.get_by_email(email).await
    }

    #[instrument(skip(self))]
    pub async fn list_users(&self, query: UserListQuery) -> Result<Vec<User>> {
        self.repo.list(query).await
    }

    /// Apply a partial update, re-validating any changed email and
    /// re-hashing any changed password.
    #[instrument(skip(self, request))]
    pub async fn update_user(&self, id: &str, mut request: UpdateUserRequest) -> Result<User> {
        if let Some(email) = &request.email {
            if !is_valid_email(email) {
                bail!("Invalid email format.");
            }
            // Taken is fine when it is taken by this same user
            if let Some(existing) = self.repo.get_by_email(email).await?
                && existing.id != id
            {
                bail!("Email '{}' is already registered.", email);
            }
        }

        if let Some(password) = &request.password {
            check_password_length(password)?;
            request.password = Some(self.hasher.hash(password)?);
        }

        let user = self.repo.update(id, request).await?;
        info!(user_id = %user.id, "Updated user");

        Ok(user)
    }

    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: &str) -> Result<()> {
        if self.repo.get(id).await?.is_none() {
            bail!("User not found: {}", id);
        }

        self.repo.delete(id).await?;
        info!(user_id = %id, "Deleted user");

        Ok(())
    }

    /// Disable an account without deleting it; login is refused while
    /// inactive.
    #[instrument(skip(self))]
    pub async fn deactivate_user(&self, id: &str) -> Result<User> {
        let user = self.set_active(id, false).await?;
        warn!(user_id = %id, "Deactivated user");
        Ok(user)
    }

    #[instrument(skip(self))]
    pub async fn activate_user(&self, id: &str) -> Result<User> {
        let user = self.set_active(id, true).await?;
        info!(user_id = %id, "Activated user");
        Ok(user)
    }

    async fn set_active(&self, id: &str, is_active: bool) -> Result<User> {
        self.repo
            .update(
                id,
                UpdateUserRequest {
                    is_active: Some(is_active),
                    ..Default::default()
                },
            )
            .await
    }
}

fn check_password_length(password: &str) -> Result<()> {
    if password.len() < 8 {
        bail!("Password must be at least 8 characters.");
    }
    Ok(())
}

/// Structural email check: one `@`, a non-empty local part, and a dotted
/// domain. Anything stricter belongs to a confirmation mail, not here.
fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.contains('@'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::db::Database;

    async fn setup_service() -> UserService {
        let db = Database::in_memory().await.unwrap();
        UserService::new(
            UserRepository::new(db.pool().clone()),
            PasswordHasher::default(),
        )
    }

    fn create_request(email: &str, password: &str) -> CreateUserRequest {
        CreateUserRequest {
            email: email.to_string(),
            password: password.to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            role: None,
            organization_id: None,
        }
    }

    #[test]
    fn test_is_valid_email() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("user.name@sub.domain.com"));
        assert!(!is_valid_email("userexample.com"));
        assert!(!is_valid_email("user@"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@host@example.com"));
    }

    #[tokio::test]
    async fn test_create_user_hashes_password() {
        let service = setup_service().await;
        let user = service
            .create_user(create_request("new@example.com", "correct horse"))
            .await
            .unwrap();

        assert_ne!(user.password_hash, "correct horse");
        assert!(user.password_hash.starts_with("$2"));
        assert_eq!(user.role, Role::User);
    }

    #[tokio::test]
    async fn test_create_user_rejects_short_password() {
        let service = setup_service().await;
        let err = service
            .create_user(create_request("short@example.com", "seven77"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("at least 8 characters"));
    }

    #[tokio::test]
    async fn test_create_user_rejects_bad_email() {
        let service = setup_service().await;
        let err = service
            .create_user(create_request("not-an-email", "long enough"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Invalid email"));
    }

    #[tokio::test]
    async fn test_create_user_rejects_duplicate_email() {
        let service = setup_service().await;
        service
            .create_user(create_request("dup@example.com", "long enough"))
            .await
            .unwrap();

        let err = service
            .create_user(create_request("dup@example.com", "long enough"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already registered"));
    }

    #[tokio::test]
    async fn test_update_rehashes_password() {
        let service = setup_service().await;
        let user = service
            .create_user(create_request("rehash@example.com", "first password"))
            .await
            .unwrap();

        let updated = service
            .update_user(
                &user.id,
                UpdateUserRequest {
                    password: Some("second password".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_ne!(updated.password_hash, user.password_hash);
        assert!(updated.password_hash.starts_with("$2"));
    }

    #[tokio::test]
    async fn test_update_keeps_own_email() {
        let service = setup_service().await;
        let user = service
            .create_user(create_request("same@example.com", "long enough"))
            .await
            .unwrap();

        // Re-submitting the current email is not a conflict.
        let updated = service
            .update_user(
                &user.id,
                UpdateUserRequest {
                    email: Some("same@example.com".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.email, "same@example.com");
    }

    #[tokio::test]
    async fn test_deactivate_and_activate() {
        let service = setup_service().await;
        let user = service
            .create_user(create_request("toggle@example.com", "long enough"))
            .await
            .unwrap();

        let deactivated = service.deactivate_user(&user.id).await.unwrap();
        assert!(!deactivated.is_active);

        let activated = service.activate_user(&user.id).await.unwrap();
        assert!(activated.is_active);
    }
}
