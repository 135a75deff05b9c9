//! Row operations on the `phone_numbers` table.
//!
//! Every function takes a bare connection so the service can run several of
//! them inside one transaction.

use chrono::Utc;
use sqlx::types::Json;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::data::PhoneNumberData;
use crate::model::PhoneNumber;
use crate::owner::OwnerRef;

/// Subset of an owner's numbers to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope<'a> {
    All,
    Primary,
    OfType(&'a str),
    Verified,
}

/// `data` must already be resolved against the configuration.
pub async fn insert(
    conn: &mut SqliteConnection,
    owner: &OwnerRef,
    data: &PhoneNumberData,
) -> sqlx::Result<PhoneNumber> {
    let now = Utc::now();

    sqlx::query_as::<_, PhoneNumber>(
        r#"INSERT INTO phone_numbers (
            owner_type, owner_id, type, is_primary, country_code, number,
            extension, formatted, is_verified, metadata, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING *"#,
    )
    .bind(owner.kind.as_str())
    .bind(owner.id)
    .bind(&data.phone_type)
    .bind(data.is_primary)
    .bind(&data.country_code)
    .bind(&data.number)
    .bind(&data.extension)
    .bind(&data.formatted)
    .bind(data.is_verified)
    .bind(data.metadata.as_ref().map(Json))
    .bind(now)
    .bind(now)
    .fetch_one(&mut *conn)
    .await
}

/// Overwrites every payload field of row `id`. `None` when the row is gone.
pub async fn update(
    conn: &mut SqliteConnection,
    id: i64,
    data: &PhoneNumberData,
) -> sqlx::Result<Option<PhoneNumber>> {
    sqlx::query_as::<_, PhoneNumber>(
        r#"UPDATE phone_numbers SET
            type = ?, is_primary = ?, country_code = ?, number = ?,
            extension = ?, formatted = ?, is_verified = ?, metadata = ?,
            updated_at = ?
        WHERE id = ?
        RETURNING *"#,
    )
    .bind(&data.phone_type)
    .bind(data.is_primary)
    .bind(&data.country_code)
    .bind(&data.number)
    .bind(&data.extension)
    .bind(&data.formatted)
    .bind(data.is_verified)
    .bind(data.metadata.as_ref().map(Json))
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
}

pub async fn set_primary(
    conn: &mut SqliteConnection,
    id: i64,
) -> sqlx::Result<Option<PhoneNumber>> {
    sqlx::query_as::<_, PhoneNumber>(
        "UPDATE phone_numbers SET is_primary = 1, updated_at = ? WHERE id = ? RETURNING *",
    )
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
}

pub async fn delete(conn: &mut SqliteConnection, id: i64) -> sqlx::Result<bool> {
    let result = sqlx::query("DELETE FROM phone_numbers WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn find(conn: &mut SqliteConnection, id: i64) -> sqlx::Result<Option<PhoneNumber>> {
    sqlx::query_as::<_, PhoneNumber>("SELECT * FROM phone_numbers WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
}

/// Row `id` only if it belongs to `owner`.
pub async fn find_for_owner(
    conn: &mut SqliteConnection,
    owner: &OwnerRef,
    id: i64,
) -> sqlx::Result<Option<PhoneNumber>> {
    sqlx::query_as::<_, PhoneNumber>(
        "SELECT * FROM phone_numbers WHERE id = ? AND owner_type = ? AND owner_id = ?",
    )
    .bind(id)
    .bind(owner.kind.as_str())
    .bind(owner.id)
    .fetch_optional(&mut *conn)
    .await
}

/// Primary first, then by type.
pub async fn list_for_owner(
    conn: &mut SqliteConnection,
    owner: &OwnerRef,
    scope: Scope<'_>,
) -> sqlx::Result<Vec<PhoneNumber>> {
    let mut query = owner_query("SELECT * FROM phone_numbers", owner);

    match scope {
        Scope::All => {}
        Scope::Primary => {
            query.push(" AND is_primary = 1");
        }
        Scope::OfType(phone_type) => {
            query.push(" AND type = ").push_bind(phone_type);
        }
        Scope::Verified => {
            query.push(" AND is_verified = 1");
        }
    }

    query.push(" ORDER BY is_primary DESC, type ASC, id ASC");

    query
        .build_query_as::<PhoneNumber>()
        .fetch_all(&mut *conn)
        .await
}

/// Clears the primary flag on the owner's rows, keeping `except` untouched.
pub async fn unset_primary_for_owner(
    conn: &mut SqliteConnection,
    owner: &OwnerRef,
    except: Option<i64>,
) -> sqlx::Result<u64> {
    let mut query = owner_query("UPDATE phone_numbers SET is_primary = 0", owner);
    query.push(" AND is_primary = 1");
    if let Some(id) = except {
        query.push(" AND id <> ").push_bind(id);
    }

    let result = query.build().execute(&mut *conn).await?;
    Ok(result.rows_affected())
}

/// Deletes the owner's rows whose id is not in `keep`.
pub async fn delete_for_owner_except(
    conn: &mut SqliteConnection,
    owner: &OwnerRef,
    keep: &[i64],
) -> sqlx::Result<u64> {
    let mut query = owner_query("DELETE FROM phone_numbers", owner);
    if !keep.is_empty() {
        query.push(" AND id NOT IN (");
        let mut ids = query.separated(", ");
        for id in keep {
            ids.push_bind(*id);
        }
        ids.push_unseparated(")");
    }

    let result = query.build().execute(&mut *conn).await?;
    Ok(result.rows_affected())
}

fn owner_query<'a>(head: &str, owner: &'a OwnerRef) -> QueryBuilder<'a, Sqlite> {
    let mut query = QueryBuilder::new(head);
    query
        .push(" WHERE owner_type = ")
        .push_bind(owner.kind.as_str())
        .push(" AND owner_id = ")
        .push_bind(owner.id);
    query
}
