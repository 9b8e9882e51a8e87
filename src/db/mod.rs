//! Database Infrastructure Layer
//!
//! Pool configuration and connection management for the SQLite store. The
//! persistence layer exclusively owns all SQL: handlers call the query
//! functions in the submodules through a request-scoped pool reference and
//! never build statements themselves.
//!
//! Schema bootstrapping runs through `sqlx::migrate!` on connect, and a
//! health check verifies the pool before the server starts accepting
//! requests.

pub mod activity;
pub mod content;
pub mod progress;
pub mod users;

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::info;

use crate::events::SecurityEvent;
use crate::security_event;

/// Database configuration with conservative defaults.
///
/// SQLite serializes writers internally; the busy timeout keeps concurrent
/// request handlers queued at the storage engine instead of failing, and the
/// unique constraints on `users` and `user_progress` are the arbiters for
/// conflicting inserts.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database URL (from DATABASE_URL env var)
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Maximum time to wait for a connection from the pool
    pub acquire_timeout: Duration,

    /// How long a writer waits on a locked database before erroring
    pub busy_timeout: Duration,

    /// Create the database file if it does not exist
    pub create_if_missing: bool,

    /// Run migrations automatically on connect
    pub auto_migrate: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://studyhall.db".into(),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
            create_if_missing: true,
            auto_migrate: true,
        }
    }
}

impl DatabaseConfig {
    /// Load configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `DATABASE_URL`: SQLite URL (default: `sqlite://studyhall.db`)
    /// - `DB_MAX_CONNECTIONS`: max pool size (default: 5)
    /// - `DB_ACQUIRE_TIMEOUT_SECS`: connection acquire timeout (default: 30)
    pub fn from_env() -> Self {
        let url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://studyhall.db".into());

        let max_connections = std::env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        let acquire_timeout = std::env::var("DB_ACQUIRE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(30));

        Self {
            url,
            max_connections,
            acquire_timeout,
            ..Default::default()
        }
    }

    /// In-memory database for tests. A single connection keeps every query
    /// on the same memory database.
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".into(),
            max_connections: 1,
            ..Default::default()
        }
    }
}

/// Create a connection pool with the given configuration.
///
/// Parses the URL, applies SQLite pragmas (foreign keys, busy timeout),
/// builds the pool, optionally runs migrations, and performs a health
/// check before returning.
pub async fn create_pool(config: &DatabaseConfig) -> Result<SqlitePool, DatabaseError> {
    info!(
        max_connections = config.max_connections,
        auto_migrate = config.auto_migrate,
        "Initializing database connection pool"
    );

    let connect_options = SqliteConnectOptions::from_str(&config.url)
        .map_err(|e| DatabaseError::Configuration(format!("Invalid DATABASE_URL: {}", e)))?
        .create_if_missing(config.create_if_missing)
        .foreign_keys(true)
        .busy_timeout(config.busy_timeout);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect_with(connect_options)
        .await
        .map_err(|e| DatabaseError::Connection(format!("Failed to connect: {}", e)))?;

    if config.auto_migrate {
        sqlx::migrate!()
            .run(&pool)
            .await
            .map_err(|e| DatabaseError::Migration(e.to_string()))?;
    }

    health_check(&pool).await?;

    security_event!(
        SecurityEvent::DatabaseConnected,
        url = %config.url,
        "Database connection pool initialized"
    );

    Ok(pool)
}

/// Verify the pool can execute a query and report its latency.
pub async fn health_check(pool: &SqlitePool) -> Result<HealthStatus, DatabaseError> {
    let start = std::time::Instant::now();

    let result: (i32,) = sqlx::query_as("SELECT 1")
        .fetch_one(pool)
        .await
        .map_err(|e| DatabaseError::HealthCheck(format!("Query failed: {}", e)))?;

    if result.0 != 1 {
        return Err(DatabaseError::HealthCheck("Unexpected query result".into()));
    }

    Ok(HealthStatus {
        connected: true,
        latency: start.elapsed(),
        pool_size: pool.size(),
    })
}

/// Database health status
#[derive(Debug, Clone)]
pub struct HealthStatus {
    /// Connection is alive
    pub connected: bool,
    /// Query latency
    pub latency: Duration,
    /// Current pool size
    pub pool_size: u32,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.connected && self.latency < Duration::from_secs(5)
    }
}

/// Database-specific errors
#[derive(Debug)]
pub enum DatabaseError {
    /// Configuration error (invalid URL, etc.)
    Configuration(String),
    /// Connection error
    Connection(String),
    /// Health check failed
    HealthCheck(String),
    /// Migration error
    Migration(String),
}

impl std::fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configuration(msg) => write!(f, "Database configuration error: {}", msg),
            Self::Connection(msg) => write!(f, "Database connection error: {}", msg),
            Self::HealthCheck(msg) => write!(f, "Database health check failed: {}", msg),
            Self::Migration(msg) => write!(f, "Database migration error: {}", msg),
        }
    }
}

impl std::error::Error for DatabaseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_pool_bootstraps_schema() {
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_health_check_reports_healthy() {
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        let status = health_check(&pool).await.unwrap();
        assert!(status.is_healthy());
    }

    #[test]
    fn test_in_memory_uses_single_connection() {
        let config = DatabaseConfig::in_memory();
        assert_eq!(config.max_connections, 1);
    }
}
