//! Client-facing wire types
//!
//! Request/response DTOs for the auth and user-management endpoints,
//! shared between the server and API clients.

use serde::{Deserialize, Serialize};
use validator::Validate;

// =============================================================================
// Auth API DTOs
// =============================================================================

/// Social profile links supplied at sign-up
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SocialLinks {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facebook: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instagram: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discord: Option<String>,
}

/// Sign-up request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SignUpRequest {
    #[validate(length(min = 3, max = 50))]
    pub username: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub full_name: String,
    #[validate(email)]
    pub email: String,
    pub country_code: String,
    #[validate(length(min = 5, max = 20))]
    pub mobile: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    pub profile_pic: Option<String>,
    pub cover_pic: Option<String>,
    pub description: Option<String>,
    pub social_links: Option<SocialLinks>,
}

/// Sign-in request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// Sign-in response
///
/// When two-factor verification applies, `token` is absent and
/// `reference_code` identifies the challenge; the delivered code plus the
/// reference code must be submitted to the verify endpoint before a token
/// is issued.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignInResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_code: Option<String>,
    pub two_factor_required: bool,
    pub is_first_login: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserInfo>,
}

/// Code submission: the delivered code plus the reference code returned
/// when the slot was issued
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeSubmission {
    pub reference_code: String,
    pub code: String,
}

/// Forgot-password request (unauthenticated, email or mobile lookup)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForgotPasswordRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,
}

/// Password change submission, for both the reset and forgot flows
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PasswordSubmission {
    pub reference_code: String,
    pub code: String,
    #[validate(length(min = 8, max = 128))]
    pub new_password: String,
}

/// Response returned when a verification code has been issued
///
/// The code itself travels out-of-band (email/SMS/authenticator); only the
/// reference code is echoed to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeResponse {
    pub reference_code: String,
}

/// Authenticator enrollment request (the provider dictates the secret)
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AuthenticatorEnrollRequest {
    #[validate(length(min = 6, max = 64))]
    pub secret: String,
}

// =============================================================================
// User DTOs
// =============================================================================

/// User information returned by the API
///
/// Password hashes and verification slots never appear here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    pub account_type: String,
    pub role_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_name: Option<String>,
    pub is_verified: bool,
    pub is_blocked: bool,
    pub is_active: bool,
    pub two_factor_enabled: bool,
    pub is_first_login: bool,
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn test_sign_up_validation() {
        let req = SignUpRequest {
            username: Some("alice".into()),
            full_name: "Alice Smith".into(),
            email: "alice@example.com".into(),
            country_code: "+44".into(),
            mobile: "7700900123".into(),
            password: "correct horse".into(),
            profile_pic: None,
            cover_pic: None,
            description: None,
            social_links: None,
        };
        assert!(req.validate().is_ok());

        let bad = SignUpRequest {
            email: "not-an-email".into(),
            password: "short".into(),
            ..req
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_sign_in_response_omits_absent_token() {
        let resp = SignInResponse {
            token: None,
            reference_code: Some("ab12cd34ef".into()),
            two_factor_required: true,
            is_first_login: false,
            user: None,
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(!json.contains("\"token\""));
        assert!(json.contains("ab12cd34ef"));
    }
}
