//! Unified error handling
//!
//! Re-exports the shared error types under the server crate.

pub use shared::error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
