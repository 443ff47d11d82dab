//! Unified error codes for the Bazaar backend
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 3xxx: Verification code errors
//! - 4xxx: User errors
//! - 5xxx: Role errors
//! - 6xxx: Product errors
//! - 9xxx: System errors

use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility (Rust, TypeScript, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Required field missing
    RequiredField = 6,

    // ==================== 1xxx: Auth ====================
    /// Caller is not authenticated
    NotAuthenticated = 1001,
    /// Invalid credentials (identifier/password)
    InvalidCredentials = 1002,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,
    /// Account is blocked by an administrator
    AccountBlocked = 1006,
    /// Account is disabled or soft-deleted
    AccountDisabled = 1007,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// Specific role required
    RoleRequired = 2002,
    /// Admin role required
    AdminRequired = 2003,

    // ==================== 3xxx: Verification ====================
    /// Verification code invalid (wrong code, wrong reference, or no live slot)
    VerificationCodeInvalid = 3001,
    /// Verification code expired
    VerificationCodeExpired = 3002,
    /// Two-factor challenge required before a token is issued
    TwoFactorRequired = 3003,
    /// Two-factor authentication is already enabled
    TwoFactorAlreadyEnabled = 3004,

    // ==================== 4xxx: User ====================
    /// User not found
    UserNotFound = 4001,
    /// User is already blocked
    UserAlreadyBlocked = 4002,
    /// User is already verified
    UserAlreadyVerified = 4003,

    // ==================== 5xxx: Role ====================
    /// Role not found
    RoleNotFound = 5001,
    /// Role is still referenced by users
    RoleInUse = 5002,
    /// System roles cannot be modified or deleted
    RoleIsSystem = 5003,
    /// Permission matrix is malformed (partial action set for a resource)
    InvalidPermissionMatrix = 5004,

    // ==================== 6xxx: Product ====================
    /// Product not found
    ProductNotFound = 6001,
    /// Product is blacklisted
    ProductBlacklisted = 6002,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Secure random source unavailable
    EntropyFailure = 9003,
}

impl ErrorCode {
    /// Get the default human-readable message for this error code
    pub fn message(&self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::Unknown => "Unknown error",
            Self::ValidationFailed => "Validation failed",
            Self::NotFound => "Resource not found",
            Self::AlreadyExists => "Resource already exists",
            Self::InvalidRequest => "Invalid request",
            Self::RequiredField => "Required field missing",

            Self::NotAuthenticated => "Please login first",
            Self::InvalidCredentials => "Invalid credentials",
            Self::TokenExpired => "Token expired",
            Self::TokenInvalid => "Invalid token",
            Self::AccountBlocked => "Account has been blocked",
            Self::AccountDisabled => "Account has been disabled",

            Self::PermissionDenied => "You are not permitted to perform this action",
            Self::RoleRequired => "Role required",
            Self::AdminRequired => "Admin role required",

            Self::VerificationCodeInvalid => "Verification code is invalid",
            Self::VerificationCodeExpired => "Verification code has expired",
            Self::TwoFactorRequired => "Two-factor verification required",
            Self::TwoFactorAlreadyEnabled => "Two-factor authentication already enabled",

            Self::UserNotFound => "User not found",
            Self::UserAlreadyBlocked => "User is already blocked",
            Self::UserAlreadyVerified => "User is already verified",

            Self::RoleNotFound => "Role not found",
            Self::RoleInUse => "Role is still assigned to users",
            Self::RoleIsSystem => "System roles cannot be changed",
            Self::InvalidPermissionMatrix => "Permission matrix is malformed",

            Self::ProductNotFound => "Product not found",
            Self::ProductBlacklisted => "Product is blacklisted",

            Self::InternalError => "Internal server error",
            Self::DatabaseError => "Database error",
            Self::EntropyFailure => "Secure random source unavailable",
        }
    }

    /// Get the HTTP status code for this error
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Success => StatusCode::OK,

            Self::ValidationFailed | Self::InvalidRequest | Self::RequiredField => {
                StatusCode::BAD_REQUEST
            }
            Self::InvalidPermissionMatrix => StatusCode::BAD_REQUEST,

            Self::NotAuthenticated
            | Self::InvalidCredentials
            | Self::TokenExpired
            | Self::TokenInvalid => StatusCode::UNAUTHORIZED,

            Self::PermissionDenied
            | Self::RoleRequired
            | Self::AdminRequired
            | Self::AccountBlocked
            | Self::AccountDisabled => StatusCode::FORBIDDEN,

            Self::NotFound | Self::UserNotFound | Self::RoleNotFound | Self::ProductNotFound => {
                StatusCode::NOT_FOUND
            }

            Self::AlreadyExists
            | Self::RoleInUse
            | Self::UserAlreadyBlocked
            | Self::UserAlreadyVerified
            | Self::TwoFactorAlreadyEnabled => StatusCode::CONFLICT,

            Self::VerificationCodeInvalid
            | Self::VerificationCodeExpired
            | Self::TwoFactorRequired => StatusCode::UNPROCESSABLE_ENTITY,

            Self::RoleIsSystem | Self::ProductBlacklisted => StatusCode::UNPROCESSABLE_ENTITY,

            Self::Unknown | Self::InternalError | Self::DatabaseError | Self::EntropyFailure => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Numeric value of this code
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u16())
    }
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> Self {
        code as u16
    }
}

/// Error returned when converting an unknown u16 into an [`ErrorCode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid error code: {0}")]
pub struct InvalidErrorCode(pub u16);

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        let code = match value {
            0 => Self::Success,
            1 => Self::Unknown,
            2 => Self::ValidationFailed,
            3 => Self::NotFound,
            4 => Self::AlreadyExists,
            5 => Self::InvalidRequest,
            6 => Self::RequiredField,

            1001 => Self::NotAuthenticated,
            1002 => Self::InvalidCredentials,
            1003 => Self::TokenExpired,
            1004 => Self::TokenInvalid,
            1006 => Self::AccountBlocked,
            1007 => Self::AccountDisabled,

            2001 => Self::PermissionDenied,
            2002 => Self::RoleRequired,
            2003 => Self::AdminRequired,

            3001 => Self::VerificationCodeInvalid,
            3002 => Self::VerificationCodeExpired,
            3003 => Self::TwoFactorRequired,
            3004 => Self::TwoFactorAlreadyEnabled,

            4001 => Self::UserNotFound,
            4002 => Self::UserAlreadyBlocked,
            4003 => Self::UserAlreadyVerified,

            5001 => Self::RoleNotFound,
            5002 => Self::RoleInUse,
            5003 => Self::RoleIsSystem,
            5004 => Self::InvalidPermissionMatrix,

            6001 => Self::ProductNotFound,
            6002 => Self::ProductBlacklisted,

            9001 => Self::InternalError,
            9002 => Self::DatabaseError,
            9003 => Self::EntropyFailure,

            other => return Err(InvalidErrorCode(other)),
        };
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u16_roundtrip() {
        let codes = [
            ErrorCode::Success,
            ErrorCode::NotAuthenticated,
            ErrorCode::PermissionDenied,
            ErrorCode::VerificationCodeInvalid,
            ErrorCode::RoleInUse,
            ErrorCode::EntropyFailure,
        ];

        for code in codes {
            let value: u16 = code.into();
            let back = ErrorCode::try_from(value).unwrap();
            assert_eq!(code, back);
        }
    }

    #[test]
    fn test_unknown_code_rejected() {
        assert!(ErrorCode::try_from(777).is_err());
    }

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(
            ErrorCode::NotAuthenticated.http_status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ErrorCode::PermissionDenied.http_status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(ErrorCode::AlreadyExists.http_status(), StatusCode::CONFLICT);
        assert_eq!(
            ErrorCode::VerificationCodeInvalid.http_status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ErrorCode::EntropyFailure.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
