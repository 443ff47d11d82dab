//! Utility module
//!
//! - [`AppError`] / [`ApiResponse`] (from shared::error)
//! - Logging setup

pub mod error;
pub mod logger;

pub use error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
pub use logger::init_logger;
