//! Phone numbers attached to arbitrary owner entities.
//!
//! Owners are identified by an [`OwnerRef`] (kind tag plus id). Each owner
//! has at most one primary number; storing or updating a number as primary
//! clears the flag on its siblings in the same transaction.

pub mod config;
pub mod data;
pub mod db;
pub mod error;
pub mod model;
pub mod owner;
pub mod repository;
pub mod service;

pub use config::{DatabaseConfig, PhoneNumbersConfig};
pub use data::{payloads_from_body, PhoneNumberData, PhoneNumberPayload, ValidationErrors};
pub use error::{Error, ErrorKind, Result};
pub use model::{Metadata, PhoneNumber};
pub use owner::{HasPhoneNumbers, OwnerKind, OwnerRef, OwnerResolver};
pub use service::{OwnerPhoneNumbers, PhoneNumberService};
