use std::borrow::Cow;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::service::{OwnerPhoneNumbers, PhoneNumberService};

/// Tag naming the kind of entity that owns phone numbers, e.g. `"facility"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerKind(Cow<'static, str>);

impl OwnerKind {
    pub const fn from_static(tag: &'static str) -> Self {
        Self(Cow::Borrowed(tag))
    }

    pub fn new(tag: impl Into<String>) -> Self {
        Self(Cow::Owned(tag.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for OwnerKind {
    fn from(tag: &'static str) -> Self {
        Self::from_static(tag)
    }
}

/// Polymorphic owner of a phone number: kind tag plus the owner's id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerRef {
    pub kind: OwnerKind,
    pub id: i64,
}

impl OwnerRef {
    pub fn new(kind: impl Into<OwnerKind>, id: i64) -> Self {
        Self {
            kind: kind.into(),
            id,
        }
    }
}

impl fmt::Display for OwnerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind, self.id)
    }
}

/// Implemented by host entities that carry phone numbers.
///
/// ```ignore
/// struct Facility { id: i64 }
///
/// impl HasPhoneNumbers for Facility {
///     fn owner_ref(&self) -> OwnerRef {
///         OwnerRef::new("facility", self.id)
///     }
/// }
///
/// let primary = facility.phone_numbers(&service).primary().await?;
/// ```
pub trait HasPhoneNumbers {
    fn owner_ref(&self) -> OwnerRef;

    fn phone_numbers<'a>(&self, service: &'a PhoneNumberService) -> OwnerPhoneNumbers<'a> {
        service.for_owner(self.owner_ref())
    }
}

impl HasPhoneNumbers for OwnerRef {
    fn owner_ref(&self) -> OwnerRef {
        self.clone()
    }
}

/// Owner-side lookup. When installed on the service, writes for owners it
/// does not know fail with `Error::OwnerNotFound`.
#[async_trait]
pub trait OwnerResolver: Send + Sync {
    async fn exists(&self, owner: &OwnerRef) -> Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    const FACILITY: OwnerKind = OwnerKind::from_static("facility");

    #[test]
    fn static_and_owned_kinds_compare_equal() {
        assert_eq!(FACILITY, OwnerKind::new("facility"));
        assert_eq!(OwnerRef::new(FACILITY, 7), OwnerRef::new("facility", 7));
        assert_ne!(OwnerRef::new("facility", 7), OwnerRef::new("person", 7));
    }

    #[test]
    fn displays_as_kind_and_id() {
        assert_eq!(OwnerRef::new("person", 42).to_string(), "person#42");
    }

    #[test]
    fn serializes_kind_as_plain_string() {
        let json = serde_json::to_value(OwnerRef::new("person", 3)).unwrap();
        assert_eq!(json, serde_json::json!({ "kind": "person", "id": 3 }));
    }
}
