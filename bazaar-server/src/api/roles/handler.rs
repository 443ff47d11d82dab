//! Role Handlers

use axum::extract::{Json, Path, State};

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::models::{Role, RoleCreate, RoleUpdate};
use crate::db::repository::{RoleRepository, UserRepository};
use shared::{ApiResponse, AppError, ErrorCode};

pub async fn list(State(state): State<ServerState>) -> Result<ApiResponse<Vec<Role>>, AppError> {
    let roles = RoleRepository::new(state.db.clone());
    Ok(ApiResponse::success(roles.find_all().await?))
}

pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<Role>, AppError> {
    let roles = RoleRepository::new(state.db.clone());
    let role = roles
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::RoleNotFound))?;
    Ok(ApiResponse::success(role))
}

pub async fn create(
    State(state): State<ServerState>,
    current: CurrentUser,
    Json(req): Json<RoleCreate>,
) -> Result<ApiResponse<Role>, AppError> {
    let created_by = current
        .id
        .parse()
        .map_err(|_| AppError::internal("Malformed user id"))?;

    let roles = RoleRepository::new(state.db.clone());
    let role = roles.create(req, Some(created_by)).await?;
    tracing::info!(role = %role.role_name, created_by = %current.id, "Role created");
    Ok(ApiResponse::success(role))
}

pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(req): Json<RoleUpdate>,
) -> Result<ApiResponse<Role>, AppError> {
    let roles = RoleRepository::new(state.db.clone());
    let role = roles.update(&id, req).await?;
    tracing::info!(role = %role.role_name, "Role updated");
    Ok(ApiResponse::success(role))
}

/// Delete a role
///
/// System roles are permanent, and a role still held by any account
/// cannot be removed.
pub async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>, AppError> {
    let roles = RoleRepository::new(state.db.clone());
    let role = roles
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::RoleNotFound))?;

    if role.is_system {
        return Err(AppError::new(ErrorCode::RoleIsSystem));
    }

    let role_id = role
        .id
        .ok_or_else(|| AppError::internal("Role record has no id"))?;
    let users = UserRepository::new(state.db.clone());
    if users.count_by_role(&role_id).await? > 0 {
        return Err(AppError::new(ErrorCode::RoleInUse));
    }

    roles.delete(&id).await?;
    tracing::info!(role = %role.role_name, "Role deleted");
    Ok(ApiResponse::message("Role deleted"))
}
