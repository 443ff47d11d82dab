//! Role API Module

pub mod handler;

use axum::{Router, middleware, routing::get, routing::post, routing::put};

use crate::auth::permissions::{Action, Resource};
use crate::auth::require_permission;
use crate::core::ServerState;

/// Role router, one permission per operation
pub fn router() -> Router<ServerState> {
    let list_routes = Router::new()
        .route("/api/roles", get(handler::list))
        .layer(middleware::from_fn(require_permission(
            Resource::Role,
            Action::GetAll,
        )));

    let get_routes = Router::new()
        .route("/api/roles/{id}", get(handler::get_by_id))
        .layer(middleware::from_fn(require_permission(
            Resource::Role,
            Action::Get,
        )));

    let create_routes = Router::new()
        .route("/api/roles", post(handler::create))
        .layer(middleware::from_fn(require_permission(
            Resource::Role,
            Action::Create,
        )));

    let update_routes = Router::new()
        .route("/api/roles/{id}", put(handler::update))
        .layer(middleware::from_fn(require_permission(
            Resource::Role,
            Action::Update,
        )));

    let delete_routes = Router::new()
        .route("/api/roles/{id}", axum::routing::delete(handler::delete))
        .layer(middleware::from_fn(require_permission(
            Resource::Role,
            Action::Delete,
        )));

    list_routes
        .merge(get_routes)
        .merge(create_routes)
        .merge(update_routes)
        .merge(delete_routes)
}
