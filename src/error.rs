use thiserror::Error;

use crate::data::ValidationErrors;
use crate::owner::OwnerRef;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("phone number {id} not found")]
    PhoneNumberNotFound { id: i64 },

    #[error("owner {0} not found")]
    OwnerNotFound(OwnerRef),

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("invalid configuration for {key}: {reason}")]
    InvalidConfig { key: &'static str, reason: String },

    #[error("database error")]
    Storage(#[from] sqlx::Error),

    #[error("migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Coarse classification callers use to pick a transport status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing record or owner. Records of other owners are reported the same way.
    NotFound,
    Validation,
    ConstraintViolation,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::PhoneNumberNotFound { .. } | Error::OwnerNotFound(_) => ErrorKind::NotFound,
            Error::Validation(_) | Error::InvalidConfig { .. } => ErrorKind::Validation,
            Error::Storage(_) | Error::Migration(_) => ErrorKind::ConstraintViolation,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}
