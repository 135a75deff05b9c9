#![allow(dead_code)]

use phone_numbers::{db, DatabaseConfig, OwnerRef, PhoneNumberService, PhoneNumbersConfig};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub async fn service() -> anyhow::Result<PhoneNumberService> {
    service_with(PhoneNumbersConfig::default()).await
}

pub async fn service_with(config: PhoneNumbersConfig) -> anyhow::Result<PhoneNumberService> {
    init_tracing();
    let pool = db::establish_connection_pool(&DatabaseConfig::new("sqlite::memory:")).await?;
    Ok(PhoneNumberService::new(pool, config))
}

pub fn facility(id: i64) -> OwnerRef {
    OwnerRef::new("facility", id)
}

pub fn person(id: i64) -> OwnerRef {
    OwnerRef::new("person", id)
}

pub async fn primary_count(service: &PhoneNumberService, owner: &OwnerRef) -> anyhow::Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM phone_numbers WHERE owner_type = ? AND owner_id = ? AND is_primary = 1",
    )
    .bind(owner.kind.as_str())
    .bind(owner.id)
    .fetch_one(service.pool())
    .await?;
    Ok(count)
}
