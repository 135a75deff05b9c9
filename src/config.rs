use std::env;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Rules applied to every phone number payload.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PhoneNumbersConfig {
    /// Known phone number types.
    pub types: Vec<String>,
    /// Type assigned when a payload leaves it out.
    pub default_type: String,
    /// When false, only `types` are accepted.
    pub allow_custom_types: bool,
    /// Field of a host request body that carries the list for bulk sync.
    pub sync_field: String,
}

impl Default for PhoneNumbersConfig {
    fn default() -> Self {
        Self {
            types: ["mobile", "home", "work", "fax", "other"]
                .into_iter()
                .map(String::from)
                .collect(),
            default_type: "mobile".to_string(),
            allow_custom_types: true,
            sync_field: "phone_numbers".to_string(),
        }
    }
}

impl PhoneNumbersConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(types) = lookup("PHONE_NUMBERS_TYPES") {
            config.types = types
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(default_type) = lookup("PHONE_NUMBERS_DEFAULT_TYPE") {
            config.default_type = default_type.trim().to_string();
        }
        if let Some(allow) = lookup("PHONE_NUMBERS_ALLOW_CUSTOM_TYPES") {
            config.allow_custom_types = parse_flag("PHONE_NUMBERS_ALLOW_CUSTOM_TYPES", &allow)?;
        }
        if let Some(field) = lookup("PHONE_NUMBERS_SYNC_FIELD") {
            config.sync_field = field.trim().to_string();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_type.is_empty() {
            return Err(Error::InvalidConfig {
                key: "default_type",
                reason: "must not be empty".to_string(),
            });
        }
        if !self.allow_custom_types && !self.is_listed_type(&self.default_type) {
            return Err(Error::InvalidConfig {
                key: "default_type",
                reason: format!(
                    "{:?} is not one of the allowed types while custom types are disabled",
                    self.default_type
                ),
            });
        }
        if self.sync_field.is_empty() {
            return Err(Error::InvalidConfig {
                key: "sync_field",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn is_listed_type(&self, phone_type: &str) -> bool {
        self.types.iter().any(|t| t == phone_type)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    num_cpus::get() as u32
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: default_max_connections(),
        }
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let url = lookup("DATABASE_URL").ok_or(Error::InvalidConfig {
            key: "DATABASE_URL",
            reason: "must be set".to_string(),
        })?;

        let max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(Error::InvalidConfig {
                        key: "DATABASE_MAX_CONNECTIONS",
                        reason: format!("expected a positive integer, got {raw:?}"),
                    })
                }
            },
            None => default_max_connections(),
        };

        Ok(Self {
            url,
            max_connections,
        })
    }

    pub fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }
}

fn parse_flag(key: &'static str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::InvalidConfig {
            key,
            reason: format!("expected a boolean, got {raw:?}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_the_stock_type_list() {
        let config = PhoneNumbersConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, PhoneNumbersConfig::default());
        assert_eq!(config.default_type, "mobile");
        assert!(config.allow_custom_types);
        assert!(config.is_listed_type("fax"));
        assert_eq!(config.sync_field, "phone_numbers");
    }

    #[test]
    fn reads_overrides_from_env() {
        let config = PhoneNumbersConfig::from_lookup(lookup(&[
            ("PHONE_NUMBERS_TYPES", "work, pager ,"),
            ("PHONE_NUMBERS_DEFAULT_TYPE", "work"),
            ("PHONE_NUMBERS_ALLOW_CUSTOM_TYPES", "false"),
            ("PHONE_NUMBERS_SYNC_FIELD", "contact_phones"),
        ]))
        .unwrap();

        assert_eq!(config.types, vec!["work".to_string(), "pager".to_string()]);
        assert_eq!(config.default_type, "work");
        assert!(!config.allow_custom_types);
        assert_eq!(config.sync_field, "contact_phones");
    }

    #[test]
    fn rejects_default_type_outside_closed_list() {
        let err = PhoneNumbersConfig::from_lookup(lookup(&[
            ("PHONE_NUMBERS_TYPES", "home"),
            ("PHONE_NUMBERS_ALLOW_CUSTOM_TYPES", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { key: "default_type", .. }));
    }

    #[test]
    fn rejects_garbled_flag() {
        let err = PhoneNumbersConfig::from_lookup(lookup(&[(
            "PHONE_NUMBERS_ALLOW_CUSTOM_TYPES",
            "maybe",
        )]))
        .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
    }

    #[test]
    fn database_url_is_required() {
        let err = DatabaseConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { key: "DATABASE_URL", .. }));
    }

    #[test]
    fn database_pool_size() {
        let config = DatabaseConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("DATABASE_MAX_CONNECTIONS", "4"),
        ]))
        .unwrap();
        assert_eq!(config.max_connections, 4);
        assert!(config.is_in_memory());

        let err = DatabaseConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "sqlite://phones.db"),
            ("DATABASE_MAX_CONNECTIONS", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { key: "DATABASE_MAX_CONNECTIONS", .. }));
    }

    #[test]
    fn deserializes_partial_config() {
        let config: PhoneNumbersConfig =
            serde_json::from_str(r#"{ "allow_custom_types": false }"#).unwrap();
        assert!(!config.allow_custom_types);
        assert_eq!(config.default_type, "mobile");
    }
}
