//! Database Models

// Serde helpers
pub mod serde_helpers;

// Auth
pub mod role;
pub mod user;

// Catalog
pub mod product;

// Re-exports
pub use product::{Product, ProductCreate, ProductId, ProductUpdate};
pub use role::{Role, RoleCreate, RoleId, RoleUpdate};
pub use user::{AccountType, User, UserCreate, UserId};
