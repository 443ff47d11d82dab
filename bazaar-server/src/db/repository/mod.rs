//! Repository Module
//!
//! CRUD and domain operations against the embedded SurrealDB tables. Every
//! multi-field mutation of a single document is a single SurrealQL
//! statement so concurrent writers cannot interleave.

// Auth
pub mod role;
pub mod user;

// Catalog
pub mod product;

// Re-exports
pub use product::ProductRepository;
pub use role::RoleRepository;
pub use user::UserRepository;

use shared::{AppError, ErrorCode};
use surrealdb::Surreal;
use surrealdb::engine::local::Db;
use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    /// Carries the colliding field name
    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<surrealdb::Error> for RepoError {
    fn from(err: surrealdb::Error) -> Self {
        RepoError::Database(err.to_string())
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(what) => AppError::not_found(what),
            RepoError::Duplicate(field) => AppError::conflict_on(field),
            RepoError::Database(msg) => AppError::database(msg),
            RepoError::Validation(msg) => {
                AppError::with_message(ErrorCode::ValidationFailed, msg)
            }
        }
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

// =============================================================================
// ID convention: the "table:id" string form everywhere
// =============================================================================
//
// All IDs go through surrealdb::RecordId:
//   - parse:   let id: RecordId = "user:abc".parse()?;
//   - build:   let id = RecordId::from_table_key("user", "abc");
//   - table:   id.table()
//   - key:     id.key().to_string()
//   - CRUD:    db.select(id) / db.delete(id) take a RecordId directly

/// Base repository holding the database handle
#[derive(Clone)]
pub struct BaseRepository {
    db: Surreal<Db>,
}

impl BaseRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Surreal<Db> {
        &self.db
    }
}
