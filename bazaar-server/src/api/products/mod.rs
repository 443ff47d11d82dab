//! Product API Module

pub mod handler;

use axum::{
    Router, middleware,
    routing::{delete, get, post, put},
};

use crate::auth::permissions::{Action, Resource};
use crate::auth::require_permission;
use crate::core::ServerState;

/// Product router, one permission per operation
pub fn router() -> Router<ServerState> {
    let list_routes = Router::new()
        .route("/api/products", get(handler::list))
        .layer(middleware::from_fn(require_permission(
            Resource::Product,
            Action::GetAll,
        )));

    let get_routes = Router::new()
        .route("/api/products/{id}", get(handler::get_by_id))
        .layer(middleware::from_fn(require_permission(
            Resource::Product,
            Action::Get,
        )));

    let create_routes = Router::new()
        .route("/api/products", post(handler::create))
        .layer(middleware::from_fn(require_permission(
            Resource::Product,
            Action::Create,
        )));

    let update_routes = Router::new()
        .route("/api/products/{id}", put(handler::update))
        .layer(middleware::from_fn(require_permission(
            Resource::Product,
            Action::Update,
        )));

    let blacklist_routes = Router::new()
        .route(
            "/api/products/{id}/blacklist",
            put(handler::blacklist).delete(handler::unblacklist),
        )
        .layer(middleware::from_fn(require_permission(
            Resource::Product,
            Action::Blacklist,
        )));

    let delete_routes = Router::new()
        .route("/api/products/{id}", delete(handler::delete_product))
        .layer(middleware::from_fn(require_permission(
            Resource::Product,
            Action::Delete,
        )));

    list_routes
        .merge(get_routes)
        .merge(create_routes)
        .merge(update_routes)
        .merge(blacklist_routes)
        .merge(delete_routes)
}
