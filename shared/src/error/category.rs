//! Error categories derived from code ranges

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};

/// Classification of errors by domain
///
/// The category is derived from the numeric range of the error code,
/// so clients can branch on coarse error classes without enumerating
/// every code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// 0xxx: General errors
    General,
    /// 1xxx: Authentication errors
    Auth,
    /// 2xxx: Permission errors
    Permission,
    /// 3xxx: Verification code errors
    Verification,
    /// 4xxx: User errors
    User,
    /// 5xxx: Role errors
    Role,
    /// 6xxx: Product errors
    Product,
    /// 9xxx: System errors
    System,
}

impl ErrorCategory {
    /// Get the category for an error code
    pub fn of(code: ErrorCode) -> Self {
        match code.as_u16() / 1000 {
            0 => Self::General,
            1 => Self::Auth,
            2 => Self::Permission,
            3 => Self::Verification,
            4 => Self::User,
            5 => Self::Role,
            6 => Self::Product,
            _ => Self::System,
        }
    }

    /// Whether errors in this category are caused by the caller
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::System)
    }
}

impl From<ErrorCode> for ErrorCategory {
    fn from(code: ErrorCode) -> Self {
        Self::of(code)
    }
}
