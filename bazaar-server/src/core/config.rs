use crate::auth::JwtConfig;

/// Server configuration
///
/// # Environment variables
///
/// Every setting can be overridden through the environment:
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | WORK_DIR | /var/lib/bazaar | Working directory (database, logs) |
/// | HTTP_PORT | 3000 | HTTP API port |
/// | ENVIRONMENT | development | Runtime environment |
/// | DEFAULT_ROLE | user | Role assigned to self-registered accounts |
/// | VERIFY_CODE_TTL_SECS | 600 | Verification code lifetime in seconds |
/// | ADMIN_PASSWORD | admin123 | Initial password for the seeded admin |
/// | JWT_SECRET | (generated in dev) | JWT signing key, at least 32 chars |
/// | JWT_EXPIRATION_MINUTES | 1440 | Token lifetime |
///
/// # Example
///
/// ```ignore
/// WORK_DIR=/data/bazaar HTTP_PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Working directory for the embedded database and logs
    pub work_dir: String,
    /// HTTP API port
    pub http_port: u16,
    /// JWT settings
    pub jwt: JwtConfig,
    /// Runtime environment: development | staging | production
    pub environment: String,
    /// Role name assigned to accounts created through sign-up
    pub default_role: String,
    /// Verification code lifetime, checked when a code is consumed
    pub verify_code_ttl_secs: i64,
    /// Initial password for the seeded admin account
    pub admin_password: String,
}

impl Config {
    /// Load configuration from the environment, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/bazaar".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            jwt: JwtConfig::default(),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            default_role: std::env::var("DEFAULT_ROLE").unwrap_or_else(|_| "user".into()),
            verify_code_ttl_secs: std::env::var("VERIFY_CODE_TTL_SECS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(600),
            admin_password: std::env::var("ADMIN_PASSWORD")
                .unwrap_or_else(|_| "admin123".into()),
        }
    }

    /// Override the storage/network settings, keeping the rest from the
    /// environment. Used by tests.
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
