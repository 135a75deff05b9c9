use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::types::Json;
use sqlx::{FromRow, Row};

use crate::owner::{OwnerKind, OwnerRef};

pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// A stored phone number row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhoneNumber {
    pub id: i64,
    pub owner: OwnerRef,
    #[serde(rename = "type")]
    pub phone_type: String,
    pub is_primary: bool,
    /// Dial code, optionally followed by `:` and an ISO country, e.g. `+1:US`.
    pub country_code: String,
    pub number: String,
    pub extension: Option<String>,
    pub formatted: Option<String>,
    pub is_verified: bool,
    pub metadata: Option<Metadata>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PhoneNumber {
    /// Dial code portion of the country code (`+1` for `+1:US`).
    pub fn dial_code(&self) -> &str {
        dial_code(&self.country_code)
    }

    /// ISO country portion of a compound country code (`US` for `+1:US`).
    pub fn iso_country_code(&self) -> Option<&str> {
        self.country_code
            .split_once(':')
            .map(|(_, iso)| iso)
            .filter(|iso| !iso.is_empty())
    }

    pub fn e164(&self) -> String {
        e164(&self.country_code, &self.number)
    }

    /// `formatted` when present, otherwise the E.164 form, with ` ext. N`
    /// appended when there is an extension.
    pub fn full_number(&self) -> String {
        let base = match self.formatted.as_deref() {
            Some(formatted) if !formatted.is_empty() => formatted.to_string(),
            _ => self.e164(),
        };

        match self.extension.as_deref() {
            Some(ext) if !ext.is_empty() => format!("{base} ext. {ext}"),
            _ => base,
        }
    }
}

pub fn dial_code(country_code: &str) -> &str {
    match country_code.split_once(':') {
        Some((dial, _)) => dial,
        None => country_code,
    }
}

/// `+` followed by the dial code digits and the number. Any `:ISO` suffix
/// and leading `+` signs on the country code are dropped.
pub fn e164(country_code: &str, number: &str) -> String {
    let code = dial_code(country_code).trim_start_matches('+');
    format!("+{code}{number}")
}

impl FromRow<'_, SqliteRow> for PhoneNumber {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        let owner_type: String = row.try_get("owner_type")?;
        let metadata: Option<Json<Metadata>> = row.try_get("metadata")?;

        Ok(Self {
            id: row.try_get("id")?,
            owner: OwnerRef {
                kind: OwnerKind::new(owner_type),
                id: row.try_get("owner_id")?,
            },
            phone_type: row.try_get("type")?,
            is_primary: row.try_get("is_primary")?,
            country_code: row.try_get("country_code")?,
            number: row.try_get("number")?,
            extension: row.try_get("extension")?,
            formatted: row.try_get("formatted")?,
            is_verified: row.try_get("is_verified")?,
            metadata: metadata.map(|Json(map)| map),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}
