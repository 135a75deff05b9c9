use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::error::Result;

pub async fn connect(config: &DatabaseConfig) -> Result<SqlitePool> {
    let mut options = SqliteConnectOptions::from_str(&config.url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));

    let mut pool = SqlitePoolOptions::new();
    if config.is_in_memory() {
        // each connection to :memory: opens its own database
        pool = pool
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    } else {
        options = options.journal_mode(SqliteJournalMode::Wal);
        pool = pool.max_connections(config.max_connections);
    }

    Ok(pool.connect_with(options).await?)
}

pub async fn migrate(pool: &SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("phone_numbers migrations applied");
    Ok(())
}

/// Connects and migrates.
pub async fn establish_connection_pool(config: &DatabaseConfig) -> Result<SqlitePool> {
    let pool = connect(config).await?;
    migrate(&pool).await?;
    Ok(pool)
}
