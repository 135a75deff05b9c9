use std::collections::HashSet;
use std::sync::Arc;

use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, instrument};

use crate::config::PhoneNumbersConfig;
use crate::data::{PhoneNumberData, PhoneNumberPayload, ValidationErrors};
use crate::error::{Error, Result};
use crate::model::PhoneNumber;
use crate::owner::{OwnerRef, OwnerResolver};
use crate::repository::{self, Scope};

/// Phone number operations for any owner.
///
/// Cheap to clone; every clone shares the pool and configuration.
#[derive(Clone)]
pub struct PhoneNumberService {
    pool: SqlitePool,
    config: Arc<PhoneNumbersConfig>,
    resolver: Option<Arc<dyn OwnerResolver>>,
}

impl PhoneNumberService {
    pub fn new(pool: SqlitePool, config: PhoneNumbersConfig) -> Self {
        Self {
            pool,
            config: Arc::new(config),
            resolver: None,
        }
    }

    pub fn with_owner_resolver(mut self, resolver: Arc<dyn OwnerResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn config(&self) -> &PhoneNumbersConfig {
        &self.config
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn for_owner(&self, owner: OwnerRef) -> OwnerPhoneNumbers<'_> {
        OwnerPhoneNumbers {
            service: self,
            owner,
        }
    }

    /// Inserts a number for `owner`. A primary number takes the flag from its siblings.
    #[instrument(skip_all, fields(owner = %owner))]
    pub async fn store(&self, owner: &OwnerRef, data: PhoneNumberData) -> Result<PhoneNumber> {
        let data = data.resolve(&self.config)?;
        self.ensure_owner(owner).await?;

        let mut tx = self.pool.begin().await?;
        let phone = store_in(&mut *tx, owner, &data).await?;
        tx.commit().await?;

        Ok(phone)
    }

    /// Overwrites `phone` with `data`. Becoming primary clears the flag on siblings.
    #[instrument(skip_all, fields(id = phone.id, owner = %phone.owner))]
    pub async fn update(&self, phone: &PhoneNumber, data: PhoneNumberData) -> Result<PhoneNumber> {
        let data = data.resolve(&self.config)?;

        let mut tx = self.pool.begin().await?;
        let current = repository::find(&mut *tx, phone.id)
            .await?
            .ok_or(Error::PhoneNumberNotFound { id: phone.id })?;
        let updated = update_in(&mut *tx, &current, &data).await?;
        tx.commit().await?;

        Ok(updated)
    }

    /// Returns whether a row was removed.
    #[instrument(skip_all, fields(id = phone.id, owner = %phone.owner))]
    pub async fn delete(&self, phone: &PhoneNumber) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        let deleted = repository::delete(&mut *conn, phone.id).await?;
        debug!(deleted, "deleted phone number");
        Ok(deleted)
    }

    /// Makes `phone` the owner's only primary number.
    #[instrument(skip_all, fields(id = phone.id, owner = %phone.owner))]
    pub async fn mark_as_primary(&self, phone: &PhoneNumber) -> Result<PhoneNumber> {
        let mut tx = self.pool.begin().await?;
        let unset =
            repository::unset_primary_for_owner(&mut *tx, &phone.owner, Some(phone.id)).await?;
        let marked = repository::set_primary(&mut *tx, phone.id)
            .await?
            .ok_or(Error::PhoneNumberNotFound { id: phone.id })?;
        tx.commit().await?;

        debug!(unset, "marked phone number primary");
        Ok(marked)
    }

    pub async fn find(&self, id: i64) -> Result<PhoneNumber> {
        let mut conn = self.pool.acquire().await?;
        repository::find(&mut *conn, id)
            .await?
            .ok_or(Error::PhoneNumberNotFound { id })
    }

    /// Numbers of another owner are reported as not found.
    pub async fn find_for_owner(&self, owner: &OwnerRef, id: i64) -> Result<PhoneNumber> {
        let mut conn = self.pool.acquire().await?;
        repository::find_for_owner(&mut *conn, owner, id)
            .await?
            .ok_or(Error::PhoneNumberNotFound { id })
    }

    /// All numbers of `owner`, primary first, then by type.
    pub async fn list_for_owner(&self, owner: &OwnerRef) -> Result<Vec<PhoneNumber>> {
        self.list_scoped(owner, Scope::All).await
    }

    async fn list_scoped(&self, owner: &OwnerRef, scope: Scope<'_>) -> Result<Vec<PhoneNumber>> {
        let mut conn = self.pool.acquire().await?;
        Ok(repository::list_for_owner(&mut *conn, owner, scope).await?)
    }

    /// Reconciles the owner's numbers with `payloads`.
    ///
    /// A payload whose `id` names one of the owner's numbers updates it, any
    /// other payload inserts a new number. Numbers not matched by a payload
    /// are deleted, unless `payloads` is empty, in which case nothing changes.
    /// Runs in one transaction and returns the owner's full list.
    #[instrument(skip_all, fields(owner = %owner, payloads = payloads.len()))]
    pub async fn sync(
        &self,
        owner: &OwnerRef,
        payloads: &[PhoneNumberPayload],
    ) -> Result<Vec<PhoneNumber>> {
        let planned = self.validate_all(payloads)?;
        if planned.is_empty() {
            debug!("empty sync payload, leaving numbers untouched");
            return self.list_for_owner(owner).await;
        }
        self.ensure_owner(owner).await?;

        let mut tx = self.pool.begin().await?;
        let mut kept = Vec::with_capacity(planned.len());
        let (mut updated, mut inserted) = (0usize, 0usize);

        for (id, data) in &planned {
            let existing = match id {
                Some(id) => repository::find_for_owner(&mut *tx, owner, *id).await?,
                None => None,
            };

            let phone = match existing {
                Some(current) => {
                    updated += 1;
                    update_in(&mut *tx, &current, data).await?
                }
                None => {
                    inserted += 1;
                    store_in(&mut *tx, owner, data).await?
                }
            };
            kept.push(phone.id);
        }

        let kept: Vec<i64> = kept
            .into_iter()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let deleted = repository::delete_for_owner_except(&mut *tx, owner, &kept).await?;
        let phones = repository::list_for_owner(&mut *tx, owner, Scope::All).await?;
        tx.commit().await?;

        debug!(updated, inserted, deleted, "synced phone numbers");
        Ok(phones)
    }

    fn validate_all(
        &self,
        payloads: &[PhoneNumberPayload],
    ) -> Result<Vec<(Option<i64>, PhoneNumberData)>> {
        let mut errors = ValidationErrors::default();
        let mut planned = Vec::with_capacity(payloads.len());

        for (index, payload) in payloads.iter().enumerate() {
            match payload.clone().into_data(&self.config) {
                Ok(data) => planned.push((payload.id, data)),
                Err(err) => {
                    errors.merge_prefixed(&format!("{}.{index}", self.config.sync_field), err)
                }
            }
        }

        Ok(errors.into_result(planned)?)
    }

    async fn ensure_owner(&self, owner: &OwnerRef) -> Result<()> {
        if owner.kind.as_str().trim().is_empty() {
            let mut errors = ValidationErrors::default();
            errors.add("owner_type", "must not be empty");
            return Err(errors.into());
        }
        if let Some(resolver) = &self.resolver {
            if !resolver.exists(owner).await? {
                return Err(Error::OwnerNotFound(owner.clone()));
            }
        }
        Ok(())
    }
}

async fn store_in(
    conn: &mut SqliteConnection,
    owner: &OwnerRef,
    data: &PhoneNumberData,
) -> Result<PhoneNumber> {
    if data.is_primary {
        let unset = repository::unset_primary_for_owner(conn, owner, None).await?;
        debug!(unset, "cleared primary flag on siblings");
    }

    let phone = repository::insert(conn, owner, data).await?;
    debug!(id = phone.id, "stored phone number");
    Ok(phone)
}

async fn update_in(
    conn: &mut SqliteConnection,
    current: &PhoneNumber,
    data: &PhoneNumberData,
) -> Result<PhoneNumber> {
    if data.is_primary && !current.is_primary {
        let unset =
            repository::unset_primary_for_owner(conn, &current.owner, Some(current.id)).await?;
        debug!(unset, "cleared primary flag on siblings");
    }

    let phone = repository::update(conn, current.id, data)
        .await?
        .ok_or(Error::PhoneNumberNotFound { id: current.id })?;
    debug!(id = phone.id, "updated phone number");
    Ok(phone)
}

/// Phone numbers of a single owner.
#[derive(Clone)]
pub struct OwnerPhoneNumbers<'a> {
    service: &'a PhoneNumberService,
    owner: OwnerRef,
}

impl OwnerPhoneNumbers<'_> {
    pub fn owner(&self) -> &OwnerRef {
        &self.owner
    }

    pub async fn all(&self) -> Result<Vec<PhoneNumber>> {
        self.service.list_for_owner(&self.owner).await
    }

    pub async fn primary(&self) -> Result<Option<PhoneNumber>> {
        let mut phones = self.service.list_scoped(&self.owner, Scope::Primary).await?;
        Ok(phones.pop())
    }

    pub async fn of_type(&self, phone_type: &str) -> Result<Vec<PhoneNumber>> {
        self.service
            .list_scoped(&self.owner, Scope::OfType(phone_type))
            .await
    }

    pub async fn verified(&self) -> Result<Vec<PhoneNumber>> {
        self.service.list_scoped(&self.owner, Scope::Verified).await
    }

    pub async fn get(&self, id: i64) -> Result<PhoneNumber> {
        self.service.find_for_owner(&self.owner, id).await
    }

    pub async fn create(&self, data: PhoneNumberData) -> Result<PhoneNumber> {
        self.service.store(&self.owner, data).await
    }

    pub async fn update(&self, id: i64, data: PhoneNumberData) -> Result<PhoneNumber> {
        let phone = self.get(id).await?;
        self.service.update(&phone, data).await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let phone = self.get(id).await?;
        if self.service.delete(&phone).await? {
            Ok(())
        } else {
            Err(Error::PhoneNumberNotFound { id })
        }
    }

    pub async fn mark_as_primary(&self, id: i64) -> Result<PhoneNumber> {
        let phone = self.get(id).await?;
        self.service.mark_as_primary(&phone).await
    }

    pub async fn sync(&self, payloads: &[PhoneNumberPayload]) -> Result<Vec<PhoneNumber>> {
        self.service.sync(&self.owner, payloads).await
    }
}
