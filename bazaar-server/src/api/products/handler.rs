//! Product Handlers

use axum::extract::{Json, Path, State};
use validator::Validate;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::models::{Product, ProductCreate, ProductUpdate};
use crate::db::repository::ProductRepository;
use shared::{ApiResponse, AppError, ErrorCode};

pub async fn list(
    State(state): State<ServerState>,
) -> Result<ApiResponse<Vec<Product>>, AppError> {
    let products = ProductRepository::new(state.db.clone());
    Ok(ApiResponse::success(products.find_all().await?))
}

pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<Product>, AppError> {
    let products = ProductRepository::new(state.db.clone());
    let product = products
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound))?;
    Ok(ApiResponse::success(product))
}

pub async fn create(
    State(state): State<ServerState>,
    current: CurrentUser,
    Json(req): Json<ProductCreate>,
) -> Result<ApiResponse<Product>, AppError> {
    req.validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let created_by = current
        .id
        .parse()
        .map_err(|_| AppError::internal("Malformed user id"))?;

    let products = ProductRepository::new(state.db.clone());
    let product = products.create(req, &created_by).await?;
    tracing::info!(product = %product.name, user_id = %current.id, "Product created");
    Ok(ApiResponse::success(product))
}

pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(req): Json<ProductUpdate>,
) -> Result<ApiResponse<Product>, AppError> {
    req.validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let products = ProductRepository::new(state.db.clone());
    let existing = products
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound))?;
    if existing.is_blacklisted {
        return Err(AppError::new(ErrorCode::ProductBlacklisted));
    }

    let product = products.update(&id, req).await?;
    Ok(ApiResponse::success(product))
}

pub async fn blacklist(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<Product>, AppError> {
    let products = ProductRepository::new(state.db.clone());
    products
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound))?;

    let product = products.set_blacklisted(&id, true).await?;
    tracing::info!(product_id = %id, "Product blacklisted");
    Ok(ApiResponse::success(product))
}

pub async fn unblacklist(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<Product>, AppError> {
    let products = ProductRepository::new(state.db.clone());
    products
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound))?;

    let product = products.set_blacklisted(&id, false).await?;
    tracing::info!(product_id = %id, "Product removed from blacklist");
    Ok(ApiResponse::success(product))
}

pub async fn delete_product(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>, AppError> {
    let products = ProductRepository::new(state.db.clone());
    products
        .delete(&id)
        .await
        .map_err(|e| match e {
            crate::db::repository::RepoError::NotFound(_) => {
                AppError::new(ErrorCode::ProductNotFound)
            }
            other => other.into(),
        })?;
    tracing::info!(product_id = %id, "Product deleted");
    Ok(ApiResponse::message("Product deleted"))
}
