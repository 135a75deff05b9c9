mod common;

use common::{facility, init_tracing};
use phone_numbers::{db, DatabaseConfig, PhoneNumberData, PhoneNumberService, PhoneNumbersConfig};

#[tokio::test]
async fn file_database_uses_wal_and_keeps_rows() -> anyhow::Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let config = DatabaseConfig {
        url: format!("sqlite://{}", dir.path().join("phones.db").display()),
        max_connections: 4,
    };
    assert!(!config.is_in_memory());

    let pool = db::establish_connection_pool(&config).await?;
    assert_eq!(pool.options().get_max_connections(), 4);

    let journal_mode: String = sqlx::query_scalar("PRAGMA journal_mode")
        .fetch_one(&pool)
        .await?;
    assert_eq!(journal_mode.to_lowercase(), "wal");

    let service = PhoneNumberService::new(pool.clone(), PhoneNumbersConfig::default());
    let phone = service
        .store(&facility(1), PhoneNumberData::new("+1", "5551234567").primary())
        .await?;
    pool.close().await;

    // migrations are idempotent on reopen
    let reopened = db::establish_connection_pool(&config).await?;
    let service = PhoneNumberService::new(reopened, PhoneNumbersConfig::default());
    let stored = service.find_for_owner(&facility(1), phone.id).await?;
    assert_eq!(stored.number, "5551234567");
    assert!(stored.is_primary);
    Ok(())
}
