//! Phone number payloads and their validation.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::PhoneNumbersConfig;
use crate::model::Metadata;

const MAX_TYPE_LEN: usize = 50;
const MAX_COUNTRY_CODE_LEN: usize = 5;
const MAX_NUMBER_LEN: usize = 20;
const MAX_EXTENSION_LEN: usize = 10;
const MAX_FORMATTED_LEN: usize = 30;

/// Raw phone number input as submitted by a caller. `id` targets an existing
/// record during sync.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhoneNumberPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, rename = "type")]
    pub phone_type: Option<String>,
    #[serde(default)]
    pub is_primary: Option<bool>,
    #[serde(default)]
    pub is_verified: Option<bool>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub extension: Option<String>,
    #[serde(default)]
    pub formatted: Option<String>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

impl PhoneNumberPayload {
    pub fn new(country_code: impl Into<String>, number: impl Into<String>) -> Self {
        Self {
            country_code: Some(country_code.into()),
            number: Some(number.into()),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_type(mut self, phone_type: impl Into<String>) -> Self {
        self.phone_type = Some(phone_type.into());
        self
    }

    pub fn primary(mut self) -> Self {
        self.is_primary = Some(true);
        self
    }

    /// Applies defaults from `config` and checks every field.
    pub fn into_data(self, config: &PhoneNumbersConfig) -> Result<PhoneNumberData, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let country_code = required(&mut errors, "country_code", self.country_code);
        let number = required(&mut errors, "number", self.number);

        let data = PhoneNumberData {
            phone_type: Some(
                self.phone_type
                    .unwrap_or_else(|| config.default_type.clone()),
            ),
            country_code: country_code.unwrap_or_default(),
            number: number.unwrap_or_default(),
            extension: non_blank(self.extension),
            formatted: non_blank(self.formatted),
            is_primary: self.is_primary.unwrap_or(false),
            is_verified: self.is_verified.unwrap_or(false),
            metadata: self.metadata,
        };

        data.check_into(config, &mut errors);
        errors.into_result(data)
    }
}

/// A phone number to be written. Checked against the service's
/// configuration before every write.
#[derive(Debug, Clone, PartialEq)]
pub struct PhoneNumberData {
    /// `None` takes the configured default type.
    pub phone_type: Option<String>,
    pub country_code: String,
    pub number: String,
    pub extension: Option<String>,
    pub formatted: Option<String>,
    pub is_primary: bool,
    pub is_verified: bool,
    pub metadata: Option<Metadata>,
}

impl PhoneNumberData {
    /// Non-primary, unverified number of the configured default type.
    pub fn new(country_code: impl Into<String>, number: impl Into<String>) -> Self {
        Self {
            phone_type: None,
            country_code: country_code.into(),
            number: number.into(),
            extension: None,
            formatted: None,
            is_primary: false,
            is_verified: false,
            metadata: None,
        }
    }

    pub fn with_type(mut self, phone_type: impl Into<String>) -> Self {
        self.phone_type = Some(phone_type.into());
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }

    pub fn with_formatted(mut self, formatted: impl Into<String>) -> Self {
        self.formatted = Some(formatted.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        self
    }

    pub fn verified(mut self) -> Self {
        self.is_verified = true;
        self
    }

    pub fn validate(&self, config: &PhoneNumbersConfig) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        self.check_into(config, &mut errors);
        errors.into_result(())
    }

    /// Fills in the default type and checks every field.
    pub fn resolve(mut self, config: &PhoneNumbersConfig) -> Result<Self, ValidationErrors> {
        if self.phone_type.is_none() {
            self.phone_type = Some(config.default_type.clone());
        }
        self.validate(config)?;
        Ok(self)
    }

    fn check_into(&self, config: &PhoneNumbersConfig, errors: &mut ValidationErrors) {
        let phone_type = self
            .phone_type
            .as_deref()
            .unwrap_or(config.default_type.as_str());
        if phone_type.trim().is_empty() {
            errors.add("type", "must not be empty");
        } else if !config.allow_custom_types && !config.is_listed_type(phone_type) {
            errors.add(
                "type",
                format!("must be one of: {}", config.types.join(", ")),
            );
        }
        max_len(errors, "type", phone_type, MAX_TYPE_LEN);

        if self.country_code.trim().is_empty() {
            errors.add_once("country_code", "is required");
        }
        max_len(errors, "country_code", &self.country_code, MAX_COUNTRY_CODE_LEN);

        if self.number.trim().is_empty() {
            errors.add_once("number", "is required");
        }
        max_len(errors, "number", &self.number, MAX_NUMBER_LEN);

        if let Some(extension) = &self.extension {
            max_len(errors, "extension", extension, MAX_EXTENSION_LEN);
        }
        if let Some(formatted) = &self.formatted {
            max_len(errors, "formatted", formatted, MAX_FORMATTED_LEN);
        }
    }
}

/// Pulls the bulk-sync list out of a host request body.
///
/// `Ok(None)` when the field is absent, null or an empty list: callers must
/// then leave stored numbers untouched.
pub fn payloads_from_body(
    body: &Value,
    config: &PhoneNumbersConfig,
) -> Result<Option<Vec<PhoneNumberPayload>>, ValidationErrors> {
    let field = config.sync_field.as_str();

    let items = match body.get(field) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Array(items)) if items.is_empty() => return Ok(None),
        Some(Value::Array(items)) => items,
        Some(_) => {
            let mut errors = ValidationErrors::default();
            errors.add(field, "must be a list");
            return Err(errors);
        }
    };

    let mut errors = ValidationErrors::default();
    let mut payloads = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        match PhoneNumberPayload::deserialize(item) {
            Ok(payload) => payloads.push(payload),
            Err(err) => errors.add(format!("{field}.{index}"), err.to_string()),
        }
    }

    errors.into_result(Some(payloads))
}

/// Field name to messages. Keys are dotted paths such as `phone_numbers.1.number`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.fields.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub(crate) fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    fn add_once(&mut self, field: &str, message: &str) {
        let messages = self.fields.entry(field.to_string()).or_default();
        if !messages.iter().any(|m| m == message) {
            messages.push(message.to_string());
        }
    }

    /// Moves every error under `prefix.`.
    pub(crate) fn merge_prefixed(&mut self, prefix: &str, other: ValidationErrors) {
        for (field, messages) in other.fields {
            self.fields
                .entry(format!("{prefix}.{field}"))
                .or_default()
                .extend(messages);
        }
    }

    pub(crate) fn into_result<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.fields {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field} {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

fn required(errors: &mut ValidationErrors, field: &str, value: Option<String>) -> Option<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Some(v),
        _ => {
            errors.add_once(field, "is required");
            None
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn max_len(errors: &mut ValidationErrors, field: &str, value: &str, max: usize) {
    if value.chars().count() > max {
        errors.add(field, format!("may not be longer than {max} characters"));
    }
}
