//! Role Repository

use super::{BaseRepository, RepoError, RepoResult};
use crate::db::models::{Role, RoleCreate, RoleUpdate};
use chrono::Utc;
use surrealdb::engine::local::Db;
use surrealdb::{RecordId, Surreal};

#[derive(Clone)]
pub struct RoleRepository {
    base: BaseRepository,
}

impl RoleRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    fn parse_id(id: &str) -> RepoResult<RecordId> {
        id.parse()
            .map_err(|_| RepoError::Validation(format!("Invalid ID: {}", id)))
    }

    pub async fn find_all(&self) -> RepoResult<Vec<Role>> {
        let roles: Vec<Role> = self
            .base
            .db()
            .query("SELECT * FROM role ORDER BY role_name")
            .await?
            .take(0)?;
        Ok(roles)
    }

    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<Role>> {
        let thing = Self::parse_id(id)?;
        let role: Option<Role> = self.base.db().select(thing).await?;
        Ok(role)
    }

    pub async fn find_by_name(&self, role_name: &str) -> RepoResult<Option<Role>> {
        let role_name = role_name.to_string();
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM role WHERE role_name = $role_name LIMIT 1")
            .bind(("role_name", role_name))
            .await?;
        let roles: Vec<Role> = result.take(0)?;
        Ok(roles.into_iter().next())
    }

    /// Create a new role
    ///
    /// The matrix must be complete for every resource it lists.
    pub async fn create(&self, data: RoleCreate, created_by: Option<RecordId>) -> RepoResult<Role> {
        if data.role_name.trim().is_empty() {
            return Err(RepoError::Validation("Role name cannot be empty".to_string()));
        }
        data.permissions
            .validate()
            .map_err(|e| RepoError::Validation(e.message))?;

        if self.find_by_name(&data.role_name).await?.is_some() {
            return Err(RepoError::Duplicate("role_name".to_string()));
        }

        let now = Utc::now().timestamp();
        let mut result = self
            .base
            .db()
            .query(
                r#"CREATE role SET
                    role_name = $role_name,
                    permissions = $permissions,
                    is_system = false,
                    is_active = true,
                    created_by = $created_by,
                    created_at = $now
                RETURN AFTER"#,
            )
            .bind(("role_name", data.role_name))
            .bind(("permissions", data.permissions))
            .bind(("created_by", created_by.map(|id| id.to_string())))
            .bind(("now", now))
            .await?;

        let created: Option<Role> = result.take(0)?;
        created.ok_or_else(|| RepoError::Database("Failed to create role".to_string()))
    }

    /// Update a role
    ///
    /// System roles only accept permission changes; their name and active
    /// flag are fixed.
    pub async fn update(&self, id: &str, data: RoleUpdate) -> RepoResult<Role> {
        let thing = Self::parse_id(id)?;
        let existing = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("Role {} not found", id)))?;

        if existing.is_system && (data.role_name.is_some() || data.is_active.is_some()) {
            return Err(RepoError::Validation(
                "System role can only change permissions".to_string(),
            ));
        }

        if let Some(ref permissions) = data.permissions {
            permissions
                .validate()
                .map_err(|e| RepoError::Validation(e.message))?;
        }

        if let Some(ref new_name) = data.role_name {
            if new_name.trim().is_empty() {
                return Err(RepoError::Validation("Role name cannot be empty".to_string()));
            }
            if new_name != &existing.role_name && self.find_by_name(new_name).await?.is_some() {
                return Err(RepoError::Duplicate("role_name".to_string()));
            }
        }

        let mut result = self
            .base
            .db()
            .query(
                r#"UPDATE $thing SET
                    role_name = IF $has_role_name THEN $role_name ELSE role_name END,
                    permissions = IF $has_permissions THEN $permissions ELSE permissions END,
                    is_active = IF $has_is_active THEN $is_active ELSE is_active END
                RETURN AFTER"#,
            )
            .bind(("thing", thing))
            .bind(("has_role_name", data.role_name.is_some()))
            .bind(("role_name", data.role_name))
            .bind(("has_permissions", data.permissions.is_some()))
            .bind(("permissions", data.permissions))
            .bind(("has_is_active", data.is_active.is_some()))
            .bind(("is_active", data.is_active))
            .await?;

        result
            .take::<Option<Role>>(0)?
            .ok_or_else(|| RepoError::NotFound(format!("Role {} not found", id)))
    }

    /// Hard delete a role. Ownership guards live in the handler.
    pub async fn delete(&self, id: &str) -> RepoResult<bool> {
        let thing = Self::parse_id(id)?;
        self.find_by_id(id)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("Role {} not found", id)))?;

        self.base
            .db()
            .query("DELETE $thing")
            .bind(("thing", thing))
            .await?;
        Ok(true)
    }

    /// Seed a system role if it does not exist yet
    pub async fn ensure_system_role(
        &self,
        role_name: &str,
        permissions: crate::auth::permissions::PermissionMatrix,
    ) -> RepoResult<Role> {
        if let Some(existing) = self.find_by_name(role_name).await? {
            return Ok(existing);
        }

        let role_name = role_name.to_string();
        let now = Utc::now().timestamp();
        let mut result = self
            .base
            .db()
            .query(
                r#"CREATE role SET
                    role_name = $role_name,
                    permissions = $permissions,
                    is_system = true,
                    is_active = true,
                    created_by = NONE,
                    created_at = $now
                RETURN AFTER"#,
            )
            .bind(("role_name", role_name))
            .bind(("permissions", permissions))
            .bind(("now", now))
            .await?;

        let created: Option<Role> = result.take(0)?;
        created.ok_or_else(|| RepoError::Database("Failed to seed role".to_string()))
    }
}
