//! Application Configuration
//!
//! Loads configuration from environment variables with documented defaults.
//! Everything a handler needs at runtime hangs off [`AppConfig`], which is
//! constructed once at startup and shared through `AppState`; there is no
//! ambient global configuration.

use std::time::Duration;

use tracing::warn;

use crate::db::DatabaseConfig;

/// Default signing secret used when `JWT_SECRET` is unset.
///
/// Known weakness carried over from the observed system: tokens signed with
/// this value are forgeable by anyone who reads the source. `from_env` warns
/// loudly when the fallback is taken.
pub const DEFAULT_JWT_SECRET: &str = "your-secret-key";

/// Session token lifetime, fixed at 24 hours. There is no revocation
/// mechanism, so a leaked token remains valid until expiry.
pub const TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Application configuration loaded from environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// TCP port to listen on
    pub port: u16,

    /// Database pool configuration
    pub database: DatabaseConfig,

    /// JWT signing secret
    pub jwt_secret: String,

    /// Token lifetime
    pub token_ttl: Duration,

    /// Directory where uploaded content files are stored
    pub upload_dir: String,

    /// Seeded admin account. Created through the normal admin-insert path at
    /// startup if no row with this email exists; there is no in-code
    /// credential bypass.
    pub admin_username: String,
    pub admin_email: String,
    pub admin_password: String,

    /// Per-request timeout applied by the outer service layers
    pub request_timeout: Duration,

    /// Maximum request body size (uploads included)
    pub max_request_size: usize,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `PORT`: listen port (default: 3000)
    /// - `DATABASE_URL`: SQLite URL (default: `sqlite://studyhall.db`)
    /// - `JWT_SECRET`: token signing secret (default: insecure fallback,
    ///   warned at startup)
    /// - `UPLOAD_DIR`: content upload directory (default: `uploads`)
    /// - `ADMIN_USERNAME` / `ADMIN_EMAIL` / `ADMIN_PASSWORD`: seeded admin
    ///   credentials (development defaults; override in production)
    /// - `REQUEST_TIMEOUT_SECS`: per-request timeout (default: 30)
    /// - `MAX_REQUEST_SIZE`: body size limit in bytes (default: 25 MiB)
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);

        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            warn!(
                "JWT_SECRET not set; falling back to the built-in default. \
                 Tokens signed with the default secret are forgeable."
            );
            DEFAULT_JWT_SECRET.to_string()
        });

        let upload_dir = std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".into());

        let admin_username =
            std::env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".into());
        let admin_email =
            std::env::var("ADMIN_EMAIL").unwrap_or_else(|_| "admin@studyhall.local".into());
        let admin_password =
            std::env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "change-me-now".into());

        let request_timeout = std::env::var("REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(30));

        let max_request_size = std::env::var("MAX_REQUEST_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(25 * 1024 * 1024);

        Self {
            port,
            database: DatabaseConfig::from_env(),
            jwt_secret,
            token_ttl: TOKEN_TTL,
            upload_dir,
            admin_username,
            admin_email,
            admin_password,
            request_timeout,
            max_request_size,
        }
    }

    /// Configuration suitable for tests: in-memory database, fixed secret,
    /// temp-friendly upload directory supplied by the caller.
    pub fn for_tests(upload_dir: impl Into<String>) -> Self {
        Self {
            port: 0,
            database: DatabaseConfig::in_memory(),
            jwt_secret: "test-secret-key-not-for-production".into(),
            token_ttl: TOKEN_TTL,
            upload_dir: upload_dir.into(),
            admin_username: "admin".into(),
            admin_email: "admin@studyhall.local".into(),
            admin_password: "change-me-now".into(),
            request_timeout: Duration::from_secs(30),
            max_request_size: 25 * 1024 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_ttl_is_24_hours() {
        assert_eq!(TOKEN_TTL, Duration::from_secs(86_400));
    }

    #[test]
    fn test_test_config_defaults() {
        let config = AppConfig::for_tests("/tmp/uploads");
        assert_eq!(config.upload_dir, "/tmp/uploads");
        assert_eq!(config.token_ttl, TOKEN_TTL);
        assert_ne!(config.jwt_secret, DEFAULT_JWT_SECRET);
    }
}
