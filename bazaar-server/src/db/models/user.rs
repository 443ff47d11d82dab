//! User Model

use super::RoleId;
use super::serde_helpers;
use crate::auth::verification::VerificationSet;
use serde::{Deserialize, Serialize};
use shared::client::{SocialLinks, UserInfo};
use surrealdb::RecordId;

/// User ID type
pub type UserId = RecordId;

/// Account tier, orthogonal to the role-owned permission matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    User,
    Admin,
    SubAdmin,
    SuperAdmin,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::User => "USER",
            AccountType::Admin => "ADMIN",
            AccountType::SubAdmin => "SUB_ADMIN",
            AccountType::SuperAdmin => "SUPER_ADMIN",
        }
    }
}

/// User model matching the SurrealDB schema
///
/// The verification array holds at most one slot per purpose; all mutation
/// of it goes through the user repository so it stays a single-statement
/// read-modify-write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(default, with = "serde_helpers::option_record_id")]
    pub id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub full_name: String,
    pub email: String,
    pub country_code: String,
    pub mobile: String,
    #[serde(skip_serializing)]
    pub hash_pass: String,
    #[serde(with = "serde_helpers::record_id")]
    pub role: RoleId,
    pub account_type: AccountType,
    #[serde(default)]
    pub verification: VerificationSet,
    #[serde(default, deserialize_with = "serde_helpers::bool_false")]
    pub is_verified: bool,
    #[serde(default, deserialize_with = "serde_helpers::bool_false")]
    pub is_blocked: bool,
    #[serde(
        default = "default_true",
        deserialize_with = "serde_helpers::bool_true"
    )]
    pub is_active: bool,
    #[serde(default, deserialize_with = "serde_helpers::bool_false")]
    pub is_deleted: bool,
    #[serde(default, deserialize_with = "serde_helpers::bool_false")]
    pub two_factor_enabled: bool,
    #[serde(default, deserialize_with = "serde_helpers::bool_false")]
    pub google_auth_enabled: bool,
    #[serde(
        default = "default_true",
        deserialize_with = "serde_helpers::bool_true"
    )]
    pub is_first_login: bool,
    /// Unix seconds of the last password change; tokens issued before this
    /// instant are rejected
    #[serde(default)]
    pub password_changed_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_pic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_pic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub social_links: Option<SocialLinks>,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

fn default_true() -> bool {
    true
}

impl User {
    /// Verify a password against the stored argon2 hash
    pub fn verify_password(&self, password: &str) -> Result<bool, argon2::password_hash::Error> {
        use argon2::{
            Argon2,
            password_hash::{PasswordHash, PasswordVerifier},
        };

        let parsed_hash = PasswordHash::new(&self.hash_pass)?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Hash a password with argon2
    pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
        use argon2::{
            Argon2,
            password_hash::{PasswordHasher, SaltString, rand_core::OsRng},
        };

        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        let password_hash = argon2.hash_password(password.as_bytes(), &salt)?;
        Ok(password_hash.to_string())
    }

    /// Whether the password changed after a token was issued
    ///
    /// `iat` is the token's issued-at timestamp in unix seconds. A token
    /// minted in the same second as the change stays valid.
    pub fn changed_password_after(&self, iat: i64) -> bool {
        self.password_changed_at > 0 && iat < self.password_changed_at
    }

    /// Whether sign-in must go through a second factor
    pub fn requires_second_factor(&self) -> bool {
        self.two_factor_enabled || self.google_auth_enabled
    }

    /// Project into the client-facing shape, with the role name when known
    pub fn to_user_info(&self, role_name: Option<String>) -> UserInfo {
        UserInfo {
            id: self.id.as_ref().map(|id| id.to_string()).unwrap_or_default(),
            username: self.username.clone(),
            full_name: self.full_name.clone(),
            email: Some(self.email.clone()),
            mobile: Some(self.mobile.clone()),
            country_code: Some(self.country_code.clone()),
            account_type: self.account_type.as_str().to_string(),
            role_id: self.role.to_string(),
            role_name,
            is_verified: self.is_verified,
            is_blocked: self.is_blocked,
            is_active: self.is_active,
            two_factor_enabled: self.requires_second_factor(),
            is_first_login: self.is_first_login,
            created_at: self.created_at,
        }
    }
}

/// Create user payload (repository-level)
#[derive(Debug, Clone)]
pub struct UserCreate {
    pub username: Option<String>,
    pub full_name: String,
    pub email: String,
    pub country_code: String,
    pub mobile: String,
    pub password: String,
    pub role: RoleId,
    pub account_type: AccountType,
    pub profile_pic: Option<String>,
    pub cover_pic: Option<String>,
    pub description: Option<String>,
    pub social_links: Option<SocialLinks>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user(hash_pass: String) -> User {
        User {
            id: None,
            username: Some("alice".into()),
            full_name: "Alice Smith".into(),
            email: "alice@example.com".into(),
            country_code: "+44".into(),
            mobile: "7700900123".into(),
            hash_pass,
            role: "role:user".parse().unwrap(),
            account_type: AccountType::User,
            verification: VerificationSet::default(),
            is_verified: false,
            is_blocked: false,
            is_active: true,
            is_deleted: false,
            two_factor_enabled: false,
            google_auth_enabled: false,
            is_first_login: true,
            password_changed_at: 0,
            profile_pic: None,
            cover_pic: None,
            description: None,
            social_links: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = User::hash_password("correct horse").unwrap();
        let user = test_user(hash);

        assert!(user.verify_password("correct horse").unwrap());
        assert!(!user.verify_password("wrong horse").unwrap());
    }

    #[test]
    fn test_changed_password_after() {
        let mut user = test_user("unused".into());
        // Never changed: every token stays valid
        assert!(!user.changed_password_after(100));

        user.password_changed_at = 1000;
        assert!(user.changed_password_after(999));
        assert!(!user.changed_password_after(1000));
        assert!(!user.changed_password_after(1001));
    }

    #[test]
    fn test_hash_never_serialized() {
        let user = test_user("argon2-hash-material".into());
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2-hash-material"));
        assert!(!json.contains("hash_pass"));
    }

    #[test]
    fn test_account_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&AccountType::SubAdmin).unwrap(),
            "\"SUB_ADMIN\""
        );
        let back: AccountType = serde_json::from_str("\"SUPER_ADMIN\"").unwrap();
        assert_eq!(back, AccountType::SuperAdmin);
    }
}
