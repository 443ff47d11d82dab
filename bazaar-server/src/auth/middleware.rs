//! Authentication and authorization middleware
//!
//! Axum middleware for JWT authentication and the per-route permission
//! requirements.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use shared::{AppError, ErrorCode};

use crate::auth::permissions::{Action, Resource};
use crate::auth::{CurrentUser, JwtService};
use crate::core::ServerState;
use crate::db::repository::{RoleRepository, UserRepository};
use crate::security_log;

/// Routes reachable without a token
fn is_public_api_route(path: &str) -> bool {
    matches!(
        path,
        "/api/health"
            | "/api/auth/sign-up"
            | "/api/auth/sign-in"
            | "/api/auth/sign-in/verify"
            | "/api/auth/forgot-password"
            | "/api/auth/forgot-password/submit"
    )
}

/// Authentication middleware
///
/// Extracts and validates the bearer token, then reloads the account and
/// its role from the database. The reload is what makes blocking, role
/// deactivation and password changes take effect on in-flight tokens.
///
/// Injects [`CurrentUser`] into request extensions on success.
pub async fn require_auth(
    State(state): State<ServerState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let path = req.uri().path();

    // CORS preflight skips authentication
    if req.method() == http::Method::OPTIONS {
        return Ok(next.run(req).await);
    }

    // Non-API routes fall through to their own 404
    if !path.starts_with("/api/") {
        return Ok(next.run(req).await);
    }

    if is_public_api_route(path) {
        return Ok(next.run(req).await);
    }

    let auth_header = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header {
        Some(header) => JwtService::extract_from_header(header)
            .ok_or_else(|| AppError::invalid_token("Invalid authorization header"))?,
        None => {
            security_log!("WARN", "auth_missing", uri = format!("{:?}", req.uri()));
            return Err(AppError::unauthorized());
        }
    };

    let claims = state.jwt_service.validate_token(token).map_err(|e| {
        security_log!(
            "WARN",
            "auth_failed",
            error = format!("{}", e),
            uri = format!("{:?}", req.uri())
        );
        match e {
            crate::auth::JwtError::ExpiredToken => AppError::token_expired(),
            _ => AppError::invalid_token("Invalid token"),
        }
    })?;

    let users = UserRepository::new(state.db.clone());
    let user = users
        .find_by_id(&claims.sub)
        .await?
        .ok_or_else(AppError::unauthorized)?;

    if user.is_blocked {
        security_log!("WARN", "auth_blocked_account", user_id = claims.sub.clone());
        return Err(AppError::new(ErrorCode::AccountBlocked));
    }
    if !user.is_active {
        return Err(AppError::new(ErrorCode::AccountDisabled));
    }
    // Tokens minted before the last password change are dead
    if user.changed_password_after(claims.iat) {
        security_log!("WARN", "auth_stale_token", user_id = claims.sub.clone());
        return Err(AppError::token_expired());
    }

    let roles = RoleRepository::new(state.db.clone());
    let role = roles
        .find_by_id(&user.role.to_string())
        .await?
        .ok_or_else(AppError::forbidden)?;

    let current = CurrentUser::from_records(&user, role);
    req.extensions_mut().insert(current);
    Ok(next.run(req).await)
}

/// Permission middleware
///
/// Declares the single (resource, action) pair an operation requires.
/// Evaluation goes through the caller's role; a deny short-circuits before
/// the handler runs and never names the missing permission to the caller.
///
/// # Usage
///
/// ```ignore
/// use axum::middleware;
/// Router::new()
///     .route("/api/products", post(handler::create))
///     .layer(middleware::from_fn(require_permission(
///         Resource::Product,
///         Action::Create,
///     )));
/// ```
pub fn require_permission(
    resource: Resource,
    action: Action,
) -> impl Fn(
    Request,
    Next,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Response, AppError>> + Send>>
+ Clone {
    move |req: Request, next: Next| {
        Box::pin(async move {
            let user = req
                .extensions()
                .get::<CurrentUser>()
                .ok_or_else(AppError::unauthorized)?;

            if !user.role.allows(resource, action) {
                security_log!(
                    "WARN",
                    "permission_denied",
                    user_id = user.id.clone(),
                    username = user.display_name().to_string(),
                    resource = format!("{:?}", resource),
                    action = format!("{:?}", action)
                );
                return Err(AppError::forbidden());
            }

            Ok(next.run(req).await)
        })
    }
}
