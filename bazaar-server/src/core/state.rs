use std::sync::Arc;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use crate::auth::verification::CodeGenerator;
use crate::auth::{JwtService, Notifier, TracingNotifier};
use crate::core::Config;
use crate::db::{DbService, seed_defaults};

/// Server state, one shared instance behind cheap clones
///
/// | Field | Type | Meaning |
/// |-------|------|---------|
/// | config | Config | Settings (immutable) |
/// | db | Surreal<Db> | Embedded database |
/// | jwt_service | Arc<JwtService> | Token issue/validation |
/// | code_generator | CodeGenerator | Verification code entropy |
/// | notifier | Arc<dyn Notifier> | Out-of-band code delivery |
#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub db: Surreal<Db>,
    pub jwt_service: Arc<JwtService>,
    pub code_generator: CodeGenerator,
    pub notifier: Arc<dyn Notifier>,
}

impl ServerState {
    /// Initialize the state: open storage, seed system records, wire services
    ///
    /// # Panics
    ///
    /// Panics when the database cannot be opened or seeded.
    pub async fn initialize(config: &Config) -> Self {
        std::fs::create_dir_all(&config.work_dir)
            .expect("Failed to create work directory");

        let db = DbService::new(&config.work_dir)
            .await
            .expect("Failed to initialize database");

        seed_defaults(&db, &config.default_role, &config.admin_password)
            .await
            .expect("Failed to seed default records");

        Self {
            config: config.clone(),
            db,
            jwt_service: Arc::new(JwtService::with_config(config.jwt.clone())),
            code_generator: CodeGenerator::new(),
            notifier: Arc::new(TracingNotifier),
        }
    }

    /// State over a throwaway in-memory store. Used by tests.
    #[cfg(test)]
    pub async fn for_tests() -> Self {
        use crate::auth::JwtConfig;

        let config = Config {
            work_dir: "/tmp/bazaar-test".into(),
            http_port: 0,
            jwt: JwtConfig {
                secret: "test-secret-key-with-enough-length!".into(),
                expiration_minutes: 60,
                issuer: "bazaar-server".into(),
                audience: "bazaar-clients".into(),
            },
            environment: "test".into(),
            default_role: "user".into(),
            verify_code_ttl_secs: 600,
            admin_password: "admin123".into(),
        };

        let db = DbService::open_in_memory()
            .await
            .expect("in-memory db should open");
        seed_defaults(&db, &config.default_role, &config.admin_password)
            .await
            .expect("seeding should succeed");

        Self {
            jwt_service: Arc::new(JwtService::with_config(config.jwt.clone())),
            config,
            db,
            code_generator: CodeGenerator::new(),
            notifier: Arc::new(TracingNotifier),
        }
    }

    pub fn get_db(&self) -> Surreal<Db> {
        self.db.clone()
    }
}
