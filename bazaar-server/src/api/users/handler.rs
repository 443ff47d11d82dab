//! User Administration Handlers

use axum::extract::{Path, State};

use crate::core::ServerState;
use crate::db::repository::UserRepository;
use shared::client::UserInfo;
use shared::{ApiResponse, AppError, ErrorCode};

pub async fn list(
    State(state): State<ServerState>,
) -> Result<ApiResponse<Vec<UserInfo>>, AppError> {
    let users = UserRepository::new(state.db.clone());
    let all = users.find_all().await?;
    Ok(ApiResponse::success(
        all.iter().map(|u| u.to_user_info(None)).collect(),
    ))
}

pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<UserInfo>, AppError> {
    let users = UserRepository::new(state.db.clone());
    let user = users
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound))?;
    Ok(ApiResponse::success(user.to_user_info(None)))
}

pub async fn block(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<UserInfo>, AppError> {
    let users = UserRepository::new(state.db.clone());
    let user = users
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound))?;

    if user.is_blocked {
        return Err(AppError::new(ErrorCode::UserAlreadyBlocked));
    }

    let user = users.set_blocked(&id, true).await?;
    tracing::info!(user_id = %id, "User blocked");
    Ok(ApiResponse::success(user.to_user_info(None)))
}

pub async fn unblock(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<UserInfo>, AppError> {
    let users = UserRepository::new(state.db.clone());
    users
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound))?;

    let user = users.set_blocked(&id, false).await?;
    tracing::info!(user_id = %id, "User unblocked");
    Ok(ApiResponse::success(user.to_user_info(None)))
}

pub async fn verify(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<UserInfo>, AppError> {
    let users = UserRepository::new(state.db.clone());
    let user = users
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound))?;

    if user.is_verified {
        return Err(AppError::new(ErrorCode::UserAlreadyVerified));
    }

    let user = users.set_verified(&id, true).await?;
    tracing::info!(user_id = %id, "User verified by admin");
    Ok(ApiResponse::success(user.to_user_info(None)))
}

pub async fn unverify(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<UserInfo>, AppError> {
    let users = UserRepository::new(state.db.clone());
    users
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound))?;

    let user = users.set_verified(&id, false).await?;
    tracing::info!(user_id = %id, "User verification revoked");
    Ok(ApiResponse::success(user.to_user_info(None)))
}
