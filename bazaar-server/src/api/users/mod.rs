//! User Administration API Module

pub mod handler;

use axum::{Router, middleware, routing::get, routing::post};

use crate::auth::permissions::{Action, Resource};
use crate::auth::require_permission;
use crate::core::ServerState;

/// User administration router, one permission per operation
pub fn router() -> Router<ServerState> {
    let list_routes = Router::new()
        .route("/api/users", get(handler::list))
        .layer(middleware::from_fn(require_permission(
            Resource::User,
            Action::GetAll,
        )));

    let get_routes = Router::new()
        .route("/api/users/{id}", get(handler::get_by_id))
        .layer(middleware::from_fn(require_permission(
            Resource::User,
            Action::Get,
        )));

    let block_routes = Router::new()
        .route("/api/users/{id}/block", post(handler::block))
        .layer(middleware::from_fn(require_permission(
            Resource::User,
            Action::Block,
        )));

    let unblock_routes = Router::new()
        .route("/api/users/{id}/unblock", post(handler::unblock))
        .layer(middleware::from_fn(require_permission(
            Resource::User,
            Action::Unblock,
        )));

    let verify_routes = Router::new()
        .route("/api/users/{id}/verify", post(handler::verify))
        .layer(middleware::from_fn(require_permission(
            Resource::User,
            Action::Verify,
        )));

    let unverify_routes = Router::new()
        .route("/api/users/{id}/unverify", post(handler::unverify))
        .layer(middleware::from_fn(require_permission(
            Resource::User,
            Action::Unverify,
        )));

    list_routes
        .merge(get_routes)
        .merge(block_routes)
        .merge(unblock_routes)
        .merge(verify_routes)
        .merge(unverify_routes)
}
