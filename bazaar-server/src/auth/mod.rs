//! Authentication and authorization
//!
//! - [`jwt`]: token issue and validation
//! - [`permissions`]: the role-owned resource/action matrix
//! - [`verification`]: purpose-scoped verification code slots
//! - [`middleware`]: `require_auth` and `require_permission` layers
//! - [`extractor`]: the [`CurrentUser`] request identity
//! - [`notifier`]: out-of-band code delivery

pub mod extractor;
pub mod jwt;
pub mod middleware;
pub mod notifier;
pub mod permissions;
pub mod verification;

pub use extractor::CurrentUser;
pub use jwt::{Claims, JwtConfig, JwtError, JwtService};
pub use middleware::{require_auth, require_permission};
pub use notifier::{Channel, Notifier, TracingNotifier};
