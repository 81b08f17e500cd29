#![cfg(test)]
//! Shared database fixture for repository tests. Tests call [`get_db`] and
//! return early on `None`, which happens when `DATABASE_URL` is unset or
//! `SKIP_DB_TESTS` is set.
use migration::MigratorTrait;
use models::db::{connect_with_config, DatabaseConfig};
use sea_orm::DatabaseConnection;
use tokio::sync::OnceCell;

// Ensure migrations run only once across the entire test process
static MIGRATED: OnceCell<bool> = OnceCell::const_new();

fn test_config(url: String) -> DatabaseConfig {
    DatabaseConfig {
        url,
        max_connections: 10,
        min_connections: 1,
        connect_timeout_secs: 5,
        idle_timeout_secs: 60,
        max_lifetime_secs: 300,
        acquire_timeout_secs: 10,
        ..Default::default()
    }
}

pub async fn get_db() -> anyhow::Result<Option<DatabaseConnection>> {
    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return Ok(None);
    }
    let Ok(url) = std::env::var("DATABASE_URL") else {
        return Ok(None);
    };
    let cfg = test_config(url);

    let migrated = *MIGRATED
        .get_or_init(|| async {
            // Throwaway connection; each test gets its own pool on its own runtime
            match connect_with_config(&cfg).await {
                Ok(db) => migration::Migrator::up(&db, None).await.is_ok(),
                Err(_) => false,
            }
        })
        .await;
    if !migrated {
        anyhow::bail!("could not migrate test database");
    }

    Ok(Some(connect_with_config(&cfg).await?))
}
