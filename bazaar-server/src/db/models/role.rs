//! Role Model

use super::UserId;
use super::serde_helpers;
use crate::auth::permissions::{Action, PermissionMatrix, Resource};
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

/// Role ID type
pub type RoleId = RecordId;

/// Role model matching the SurrealDB schema
///
/// A role owns the whole permission matrix; users reference their role by
/// record id, so a matrix edit applies to every holder on their next request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    #[serde(default, with = "serde_helpers::option_record_id")]
    pub id: Option<RoleId>,
    pub role_name: String,
    #[serde(default)]
    pub permissions: PermissionMatrix,
    /// Seeded roles that cannot be deleted or renamed
    #[serde(default, deserialize_with = "serde_helpers::bool_false")]
    pub is_system: bool,
    /// An inactive role denies every permission to its holders
    #[serde(
        default = "default_true",
        deserialize_with = "serde_helpers::bool_true"
    )]
    pub is_active: bool,
    /// Creating account; absent on seeded roles
    #[serde(default, with = "serde_helpers::option_record_id")]
    pub created_by: Option<UserId>,
    #[serde(default)]
    pub created_at: i64,
}

fn default_true() -> bool {
    true
}

impl Role {
    pub fn new(role_name: String, permissions: PermissionMatrix) -> Self {
        Self {
            id: None,
            role_name,
            permissions,
            is_system: false,
            is_active: true,
            created_by: None,
            created_at: 0,
        }
    }

    /// Evaluate a permission through this role
    ///
    /// Deactivation wins over any grant in the matrix.
    pub fn allows(&self, resource: Resource, action: Action) -> bool {
        self.is_active && self.permissions.allows(resource, action)
    }
}

/// Create role request
#[derive(Debug, Deserialize)]
pub struct RoleCreate {
    pub role_name: String,
    #[serde(default)]
    pub permissions: PermissionMatrix,
}

/// Update role request
#[derive(Debug, Serialize, Deserialize)]
pub struct RoleUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<PermissionMatrix>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}
