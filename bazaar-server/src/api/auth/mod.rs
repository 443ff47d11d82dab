//! Auth API Module

pub mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

/// Auth router
///
/// Sign-up, sign-in and the forgot-password pair are public; everything
/// else runs behind the authentication middleware.
pub fn router() -> Router<ServerState> {
    Router::new()
        // Public routes
        .route("/api/auth/sign-up", post(handler::sign_up))
        .route("/api/auth/sign-in", post(handler::sign_in))
        .route("/api/auth/sign-in/verify", post(handler::sign_in_verify))
        .route("/api/auth/forgot-password", post(handler::forgot_password))
        .route(
            "/api/auth/forgot-password/submit",
            post(handler::forgot_password_submit),
        )
        // Authenticated routes
        .route("/api/auth/me", get(handler::me))
        .route("/api/auth/password-reset", post(handler::password_reset))
        .route(
            "/api/auth/password-reset/submit",
            post(handler::password_reset_submit),
        )
        .route("/api/auth/two-fa/enable", post(handler::two_fa_enable))
        .route("/api/auth/two-fa/verify", post(handler::two_fa_verify))
        .route(
            "/api/auth/google-auth/enable",
            post(handler::google_auth_enable),
        )
        .route(
            "/api/auth/google-auth/verify",
            post(handler::google_auth_verify),
        )
        .route("/api/auth/email/request", post(handler::email_request))
        .route("/api/auth/email/confirm", post(handler::email_confirm))
        .route("/api/auth/mobile/request", post(handler::mobile_request))
        .route("/api/auth/mobile/confirm", post(handler::mobile_confirm))
}
