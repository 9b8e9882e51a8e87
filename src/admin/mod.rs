//! Admin surface: read-only aggregate views and user control actions.
//!
//! Every route in this module sits behind the admin access policy. The
//! bootstrap admin account is seeded here at startup through the same
//! hash-and-insert path as any other admin; there is no code-level
//! credential special case.

pub mod handlers;

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use crate::auth::password::hash_password;
use crate::config::AppConfig;
use crate::db;
use crate::error::AppError;

/// Seed the bootstrap admin account if it does not exist yet.
pub async fn seed_admin_account(pool: &SqlitePool, config: &AppConfig) -> Result<(), AppError> {
    let password_hash = hash_password(&config.admin_password)?;

    db::users::seed_admin(
        pool,
        &config.admin_username,
        &config.admin_email,
        &password_hash,
        Utc::now(),
    )
    .await
    .map_err(|e| AppError::store("Failed to seed admin account", e))?;

    info!(email = %config.admin_email, "Admin account ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::verify_password;
    use crate::db::{create_pool, DatabaseConfig};

    #[tokio::test]
    async fn test_seeded_admin_uses_normal_credential_path() {
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        let config = AppConfig::for_tests("/tmp/uploads");

        seed_admin_account(&pool, &config).await.unwrap();
        // Second run is a no-op, not an error.
        seed_admin_account(&pool, &config).await.unwrap();

        let admin = db::users::find_admin_by_email(&pool, &config.admin_email)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(admin.role, "admin");
        assert!(verify_password(&config.admin_password, &admin.password));
        assert_eq!(db::users::count_admins(&pool).await.unwrap(), 1);
    }
}
