//! User persistence.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::{debug, instrument};

use super::models::{CreateUserRequest, UpdateUserRequest, User, UserListQuery};
use crate::auth::Role;
use crate::db::is_unique_violation;

const USER_COLUMNS: &str = "id, email, password_hash, first_name, last_name, role, \
     is_active, organization_id, created_at, updated_at, last_login_at";

/// Repository for user rows.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn generate_id() -> String {
        format!("usr_{}", nanoid::nanoid!(12))
    }

    /// Insert a user row. The caller supplies the already-hashed password;
    /// plaintext never reaches this layer.
    #[instrument(skip(self, request, password_hash), fields(email = %request.email))]
    pub async fn create(&self, request: CreateUserRequest, password_hash: &str) -> Result<User> {
        let id = Self::generate_id();
        let role = request.role.unwrap_or(Role::User);

        debug!("Creating user: {} ({})", request.email, id);

        sqlx::query(
            "INSERT INTO users (id, email, password_hash, first_name, last_name, role, organization_id) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&request.email)
        .bind(password_hash)
        .bind(&request.first_name)
        .bind(&request.last_name)
        .bind(role.to_string())
        .bind(&request.organization_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                anyhow::anyhow!("Email '{}' is already registered.", request.email)
            } else {
                anyhow::Error::new(e).context("Failed to insert user")
            }
        })?;

        self.get(&id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User not found after creation"))
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: &str) -> Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch user")
    }

    /// Look up a user by email. The match is case-sensitive, against the
    /// stored value exactly.
    #[instrument(skip(self))]
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch user by email")
    }

    /// List users, filtered by role, active flag, and/or a substring
    /// search over email and name.
    #[instrument(skip(self))]
    pub async fn list(&self, query: UserListQuery) -> Result<Vec<User>> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut binds: Vec<String> = Vec::new();

        if let Some(role) = &query.role {
            clauses.push("role = ?");
            binds.push(role.to_string());
        }

        if let Some(is_active) = query.is_active {
            clauses.push("is_active = ?");
            binds.push(i32::from(is_active).to_string());
        }

        if let Some(search) = &query.search {
            clauses.push("(email LIKE ? OR first_name LIKE ? OR last_name LIKE ?)");
            let pattern = format!("%{}%", search);
            binds.extend([pattern.clone(), pattern.clone(), pattern]);
        }

        let mut sql = format!("SELECT {USER_COLUMNS} FROM users");
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY created_at DESC LIMIT ? OFFSET ?");

        let mut q = sqlx::query_as::<_, User>(&sql);
        for value in &binds {
            q = q.bind(value);
        }
        q = q.bind(query.limit.unwrap_or(100)).bind(query.offset.unwrap_or(0));

        q.fetch_all(&self.pool).await.context("Failed to list users")
    }

    /// List the members of an organization, oldest first.
    #[instrument(skip(self))]
    pub async fn list_by_organization(&self, organization_id: &str) -> Result<Vec<User>> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE organization_id = ? ORDER BY created_at ASC"
        ))
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list users by organization")
    }

    /// Apply a partial update. A password change arrives pre-hashed.
    #[instrument(skip(self, request))]
    pub async fn update(&self, id: &str, request: UpdateUserRequest) -> Result<User> {
        let existing = self
            .get(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User not found: {}", id))?;

        let mut assignments: Vec<(&str, String)> = Vec::new();

        if let Some(email) = &request.email {
            assignments.push(("email = ?", email.clone()));
        }
        if let Some(password_hash) = &request.password {
            assignments.push(("password_hash = ?", password_hash.clone()));
        }
        if let Some(first_name) = &request.first_name {
            assignments.push(("first_name = ?", first_name.clone()));
        }
        if let Some(last_name) = &request.last_name {
            assignments.push(("last_name = ?", last_name.clone()));
        }
        if let Some(role) = &request.role {
            assignments.push(("role = ?", role.to_string()));
        }
        if let Some(is_active) = request.is_active {
            assignments.push(("is_active = ?", i32::from(is_active).to_string()));
        }

        if assignments.is_empty() {
            return Ok(existing);
        }

        let columns: Vec<&str> = assignments
            .iter()
            .map(|(column, _)| *column)
            .chain(["updated_at = datetime('now')"])
            .collect();
        let sql = format!("UPDATE users SET {} WHERE id = ?", columns.join(", "));

        let mut q = sqlx::query(&sql);
        for (_, value) in &assignments {
            q = q.bind(value);
        }

        q.bind(id).execute(&self.pool).await.map_err(|e| {
            if is_unique_violation(&e) {
                let email = request.email.as_deref().unwrap_or_default();
                anyhow::anyhow!("Email '{}' is already registered.", email)
            } else {
                anyhow::Error::new(e).context("Failed to update user")
            }
        })?;

        self.get(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User not found after update"))
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete user")?;

        if result.rows_affected() == 0 {
            return Err(anyhow::anyhow!("User not found: {}", id));
        }

        Ok(())
    }

    /// Stamp the login audit column.
    #[instrument(skip(self))]
    pub async fn update_last_login(&self, id: &str) -> Result<()> {
        sqlx::query("UPDATE users SET last_login_at = datetime('now') WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to update last login")?;

        Ok(())
    }

    /// Put a user into an organization.
    #[instrument(skip(self))]
    pub async fn set_organization(&self, id: &str, organization_id: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE users SET organization_id = ?, updated_at = datetime('now') WHERE id = ?",
        )
        .bind(organization_id)
        .bind(id)
        .execute(&self.pool)
        .await
        .context("Failed to set user organization")?;

        if result.rows_affected() == 0 {
            return Err(anyhow::anyhow!("User not found: {}", id));
        }

        Ok(())
    }

    /// Clear the organization reference for every member of an
    /// organization. Returns the number of detached users.
    #[instrument(skip(self))]
    pub async fn detach_organization(&self, organization_id: &str) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE users SET organization_id = NULL, updated_at = datetime('now') \
             WHERE organization_id = ?",
        )
        .bind(organization_id)
        .execute(&self.pool)
        .await
        .context("Failed to detach organization members")?;

        Ok(result.rows_affected())
    }

    /// Fast-path duplicate check; the email UNIQUE constraint remains
    /// the authoritative guard.
    #[instrument(skip(self))]
    pub async fn is_email_available(&self, email: &str) -> Result<bool> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = ?")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .context("Failed to check email availability")?;

        Ok(count.0 == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    async fn setup_repo() -> UserRepository {
        let db = Database::in_memory().await.unwrap();
        UserRepository::new(db.pool().clone())
    }

    fn create_request(email: &str) -> CreateUserRequest {
        CreateUserRequest {
            email: email.to_string(),
            password: "plaintext-ignored-here".to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            role: None,
            organization_id: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_user() {
        let repo = setup_repo().await;

        let user = repo
            .create(create_request("test@example.com"), "hashed_password")
            .await
            .unwrap();
        assert_eq!(user.email, "test@example.com");
        assert_eq!(user.role, Role::User);
        assert!(user.is_active);
        assert!(user.organization_id.is_none());
        assert!(user.last_login_at.is_none());

        let fetched = repo.get(&user.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, user.id);
        assert_eq!(fetched.password_hash, "hashed_password");

        let by_email = repo.get_by_email("test@example.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, user.id);
    }

    #[tokio::test]
    async fn test_email_lookup_is_case_sensitive() {
        let repo = setup_repo().await;
        repo.create(create_request("Case@Example.com"), "hash")
            .await
            .unwrap();

        assert!(repo.get_by_email("Case@Example.com").await.unwrap().is_some());
        assert!(repo.get_by_email("case@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_hits_unique_constraint() {
        let repo = setup_repo().await;
        repo.create(create_request("dup@example.com"), "hash")
            .await
            .unwrap();

        let err = repo
            .create(create_request("dup@example.com"), "hash")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already registered"));
    }

    #[tokio::test]
    async fn test_update_user() {
        let repo = setup_repo().await;
        let user = repo
            .create(create_request("update@example.com"), "hash")
            .await
            .unwrap();

        let update = UpdateUserRequest {
            first_name: Some("Updated".to_string()),
            role: Some(Role::Admin),
            ..Default::default()
        };

        let updated = repo.update(&user.id, update).await.unwrap();
        assert_eq!(updated.first_name, "Updated");
        assert_eq!(updated.role, Role::Admin);
    }

    #[tokio::test]
    async fn test_update_missing_user_is_not_found() {
        let repo = setup_repo().await;
        let err = repo
            .update("usr_missing", UpdateUserRequest::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_delete_user() {
        let repo = setup_repo().await;
        let user = repo
            .create(create_request("delete@example.com"), "hash")
            .await
            .unwrap();

        repo.delete(&user.id).await.unwrap();
        assert!(repo.get(&user.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_last_login() {
        let repo = setup_repo().await;
        let user = repo
            .create(create_request("login@example.com"), "hash")
            .await
            .unwrap();
        assert!(user.last_login_at.is_none());

        repo.update_last_login(&user.id).await.unwrap();
        let fetched = repo.get(&user.id).await.unwrap().unwrap();
        assert!(fetched.last_login_at.is_some());
    }

    #[tokio::test]
    async fn test_organization_membership_updates() {
        let repo = setup_repo().await;
        let a = repo.create(create_request("a@example.com"), "hash").await.unwrap();
        let b = repo.create(create_request("b@example.com"), "hash").await.unwrap();
        let c = repo.create(create_request("c@example.com"), "hash").await.unwrap();

        repo.set_organization(&a.id, "org_1").await.unwrap();
        repo.set_organization(&b.id, "org_1").await.unwrap();
        repo.set_organization(&c.id, "org_2").await.unwrap();

        let members = repo.list_by_organization("org_1").await.unwrap();
        assert_eq!(members.len(), 2);

        let detached = repo.detach_organization("org_1").await.unwrap();
        assert_eq!(detached, 2);
        assert!(repo.list_by_organization("org_1").await.unwrap().is_empty());

        // Members of other organizations are untouched.
        let fetched = repo.get(&c.id).await.unwrap().unwrap();
        assert_eq!(fetched.organization_id.as_deref(), Some("org_2"));
    }

    #[tokio::test]
    async fn test_set_organization_missing_user() {
        let repo = setup_repo().await;
        let err = repo.set_organization("usr_missing", "org_1").await.unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_list_users() {
        let repo = setup_repo().await;

        for i in 0..5 {
            let mut request = create_request(&format!("user{}@example.com", i));
            if i == 0 {
                request.role = Some(Role::Admin);
            }
            repo.create(request, "hash").await.unwrap();
        }

        let all = repo.list(UserListQuery::default()).await.unwrap();
        assert_eq!(all.len(), 5);

        let admins = repo
            .list(UserListQuery {
                role: Some(Role::Admin),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(admins.len(), 1);

        let search = repo
            .list(UserListQuery {
                search: Some("user2".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(search.len(), 1);
    }

    #[tokio::test]
    async fn test_is_email_available() {
        let repo = setup_repo().await;
        assert!(repo.is_email_available("fresh@example.com").await.unwrap());

        repo.create(create_request("fresh@example.com"), "hash")
            .await
            .unwrap();
        assert!(!repo.is_email_available("fresh@example.com").await.unwrap());
    }
}
