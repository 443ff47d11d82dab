//! Shared types for the Bazaar backend
//!
//! Common types used by the server and API clients: error codes, the
//! unified response envelope, and the wire DTOs for the auth endpoints.

pub mod client;
pub mod error;

// Re-exports
pub use error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
pub use serde::{Deserialize, Serialize};
