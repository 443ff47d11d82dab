//! Bazaar Server - multi-tenant marketplace backend
//!
//! # Architecture
//!
//! - **Database** (`db`): embedded SurrealDB storage
//! - **Auth** (`auth`): JWT + Argon2, role permission matrices,
//!   purpose-scoped verification codes
//! - **HTTP API** (`api`): RESTful endpoints
//!
//! # Module layout
//!
//! ```text
//! bazaar-server/src/
//! ├── core/          # configuration, state, server
//! ├── auth/          # JWT, permissions, verification codes, middleware
//! ├── api/           # HTTP routes and handlers
//! ├── db/            # models and repositories
//! └── utils/         # errors, logging
//! ```

pub mod api;
pub mod auth;
pub mod core;
pub mod db;
pub mod utils;

// Re-export public types
pub use auth::{CurrentUser, JwtService};
pub use core::{Config, Server, ServerState};
pub use utils::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
pub use utils::init_logger;

// Security logging macro - structured events under the "security" target
#[macro_export]
macro_rules! security_log {
    ($level:expr, $event:expr, $($key:ident = $value:expr),*) => {
        tracing::info!(
            target: "security",
            level = $level,
            event = $event,
            $($key = $value),*
        );
    };
}

/// Load the environment and initialize logging
pub fn setup_environment() -> Result<Config, Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    let config = Config::from_env();
    init_logger(&config.environment);
    Ok(config)
}
