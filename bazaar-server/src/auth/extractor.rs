//! Request identity
//!
//! [`CurrentUser`] is built by the authentication middleware from a
//! validated token plus a fresh database read, so role edits and account
//! flag changes apply on the very next request.

use axum::{extract::FromRequestParts, http::request::Parts};
use shared::AppError;

use crate::core::ServerState;
use crate::db::models::{AccountType, Role, User};

/// The authenticated caller, injected into request extensions
#[derive(Debug, Clone)]
pub struct CurrentUser {
    /// User record id, "user:..." form
    pub id: String,
    pub username: Option<String>,
    pub full_name: String,
    pub account_type: AccountType,
    /// The role as loaded this request, matrix included
    pub role: Role,
    pub is_first_login: bool,
}

impl CurrentUser {
    pub fn from_records(user: &User, role: Role) -> Self {
        Self {
            id: user
                .id
                .as_ref()
                .map(|id| id.to_string())
                .unwrap_or_default(),
            username: user.username.clone(),
            full_name: user.full_name.clone(),
            account_type: user.account_type,
            role,
            is_first_login: user.is_first_login,
        }
    }

    /// Log-friendly caller name
    pub fn display_name(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.full_name)
    }
}

/// Extractor for handlers behind the authentication middleware
impl FromRequestParts<ServerState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(AppError::unauthorized)
    }
}
