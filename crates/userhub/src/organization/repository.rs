//! Organization persistence.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::{debug, instrument};

use super::models::{CreateOrganizationRequest, Organization, UpdateOrganizationRequest};
use crate::db::is_unique_violation;

const ORG_COLUMNS: &str = "id, name, description, is_active, settings, created_at, updated_at";

/// Repository for organization rows.
#[derive(Debug, Clone)]
pub struct OrganizationRepository {
    pool: SqlitePool,
}

impl OrganizationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn generate_id() -> String {
        format!("org_{}", nanoid::nanoid!(12))
    }

    /// Insert an organization row.
    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create(&self, request: CreateOrganizationRequest) -> Result<Organization> {
        let id = Self::generate_id();
        let settings = request.settings.unwrap_or_else(|| "{}".to_string());

        debug!("Creating organization: {} ({})", request.name, id);

        sqlx::query(
            "INSERT INTO organizations (id, name, description, settings) VALUES (?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&request.name)
        .bind(&request.description)
        .bind(&settings)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                anyhow::anyhow!("Organization '{}' already exists.", request.name)
            } else {
                anyhow::Error::new(e).context("Failed to insert organization")
            }
        })?;

        self.get(&id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Organization not found after creation"))
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: &str) -> Result<Option<Organization>> {
        sqlx::query_as::<_, Organization>(&format!(
            "SELECT {ORG_COLUMNS} FROM organizations WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch organization")
    }

    #[instrument(skip(self))]
    pub async fn get_by_name(&self, name: &str) -> Result<Option<Organization>> {
        sqlx::query_as::<_, Organization>(&format!(
            "SELECT {ORG_COLUMNS} FROM organizations WHERE name = ?"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch organization by name")
    }

    /// List all organizations, newest first.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Organization>> {
        sqlx::query_as::<_, Organization>(&format!(
            "SELECT {ORG_COLUMNS} FROM organizations ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list organizations")
    }

    /// Apply a partial update.
    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        id: &str,
        request: UpdateOrganizationRequest,
    ) -> Result<Organization> {
        let existing = self
            .get(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Organization not found: {}", id))?;

        let mut assignments: Vec<(&str, String)> = Vec::new();

        if let Some(name) = &request.name {
            assignments.push(("name = ?", name.clone()));
        }
        if let Some(description) = &request.description {
            assignments.push(("description = ?", description.clone()));
        }
        if let Some(is_active) = request.is_active {
            assignments.push(("is_active = ?", i32::from(is_active).to_string()));
        }
        if let Some(settings) = &request.settings {
            assignments.push(("settings = ?", settings.clone()));
        }

        if assignments.is_empty() {
            return Ok(existing);
        }

        let columns: Vec<&str> = assignments
            .iter()
            .map(|(column, _)| *column)
            .chain(["updated_at = datetime('now')"])
            .collect();
        let sql = format!(
            "UPDATE organizations SET {} WHERE id = ?",
            columns.join(", ")
        );

        let mut q = sqlx::query(&sql);
        for (_, value) in &assignments {
            q = q.bind(value);
        }

        q.bind(id).execute(&self.pool).await.map_err(|e| {
            if is_unique_violation(&e) {
                let name = request.name.as_deref().unwrap_or_default();
                anyhow::anyhow!("Organization '{}' already exists.", name)
            } else {
                anyhow::Error::new(e).context("Failed to update organization")
            }
        })?;

        self.get(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Organization not found after update"))
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM organizations WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete organization")?;

        if result.rows_affected() == 0 {
            return Err(anyhow::anyhow!("Organization not found: {}", id));
        }

        Ok(())
    }

    /// Fast-path duplicate check; the name UNIQUE constraint remains the
    /// authoritative guard.
    #[instrument(skip(self))]
    pub async fn is_name_available(&self, name: &str) -> Result<bool> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM organizations WHERE name = ?")
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .context("Failed to check organization name availability")?;

        Ok(count.0 == 0)
    }
}
