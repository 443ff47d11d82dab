//! Database Module
//!
//! Embedded SurrealDB storage and the repositories over it.

pub mod models;
pub mod repository;

use crate::auth::permissions::PermissionMatrix;
use crate::db::models::{AccountType, UserCreate};
use crate::db::repository::{RoleRepository, UserRepository};
use shared::AppError;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem, RocksDb};

const NAMESPACE: &str = "bazaar";
const DATABASE: &str = "bazaar";

/// Database service
pub struct DbService;

impl DbService {
    /// Open the persistent store under the working directory
    pub async fn new(work_dir: &str) -> Result<Surreal<Db>, AppError> {
        let path = format!("{}/data", work_dir);
        let db: Surreal<Db> = Surreal::new::<RocksDb>(path.as_str())
            .await
            .map_err(|e| AppError::database(format!("Failed to open database: {e}")))?;
        db.use_ns(NAMESPACE)
            .use_db(DATABASE)
            .await
            .map_err(|e| AppError::database(format!("Failed to select database: {e}")))?;
        Self::define_indexes(&db).await?;

        tracing::info!(path = %path, "Database connection established");
        Ok(db)
    }

    /// Open a throwaway in-memory store. Used by tests.
    pub async fn open_in_memory() -> Result<Surreal<Db>, AppError> {
        let db: Surreal<Db> = Surreal::new::<Mem>(())
            .await
            .map_err(|e| AppError::database(format!("Failed to open database: {e}")))?;
        db.use_ns(NAMESPACE)
            .use_db(DATABASE)
            .await
            .map_err(|e| AppError::database(format!("Failed to select database: {e}")))?;
        Self::define_indexes(&db).await?;
        Ok(db)
    }

    /// Uniqueness the store enforces on its own, so a pair of racing
    /// registrations cannot both land
    ///
    /// Username has no index: it is optional and the engine would treat two
    /// absent values as a collision, so that field keeps the guarded check
    /// in the repository.
    async fn define_indexes(db: &Surreal<Db>) -> Result<(), AppError> {
        db.query(
            "DEFINE INDEX IF NOT EXISTS user_email_unique ON TABLE user FIELDS email UNIQUE;
             DEFINE INDEX IF NOT EXISTS user_mobile_unique ON TABLE user FIELDS mobile UNIQUE;",
        )
        .await
        .map_err(|e| AppError::database(format!("Failed to define indexes: {e}")))?
        .check()
        .map_err(|e| AppError::database(format!("Failed to define indexes: {e}")))?;
        Ok(())
    }
}

/// Seed the system roles and the bootstrap admin account
///
/// Idempotent: existing records are left untouched, so a password change on
/// the admin account survives restarts.
pub async fn seed_defaults(
    db: &Surreal<Db>,
    default_role: &str,
    admin_password: &str,
) -> Result<(), AppError> {
    let roles = RoleRepository::new(db.clone());
    let users = UserRepository::new(db.clone());

    let admin_role = roles
        .ensure_system_role("admin", PermissionMatrix::full_grant())
        .await?;
    roles
        .ensure_system_role(default_role, PermissionMatrix::empty())
        .await?;

    if users.find_by_email("admin@bazaar.local").await?.is_none() {
        let role = admin_role
            .id
            .ok_or_else(|| AppError::database("Seeded role has no id"))?;
        users
            .create(UserCreate {
                username: Some("admin".into()),
                full_name: "Administrator".into(),
                email: "admin@bazaar.local".into(),
                country_code: "+0".into(),
                mobile: "0000000000".into(),
                password: admin_password.into(),
                role,
                account_type: AccountType::SuperAdmin,
                profile_pic: None,
                cover_pic: None,
                description: None,
                social_links: None,
            })
            .await?;
        tracing::info!("Bootstrap admin account created");
    }

    Ok(())
}
