//! Contact service error types.

use thiserror::Error;

use contact_manager_core::{AddressId, ContactId};

use crate::db::RepositoryError;

/// Errors that can occur during contact operations.
#[derive(Debug, Error)]
pub enum ContactError {
    /// No contact with this ID.
    #[error("contact {0} not found")]
    ContactNotFound(ContactId),

    /// No address with this ID.
    #[error("address {0} not found")]
    AddressNotFound(AddressId),

    /// Another contact already has this first and last name.
    #[error("a contact named {first_name} {last_name} already exists")]
    DuplicateContact {
        /// Requested first name.
        first_name: String,
        /// Requested last name.
        last_name: String,
    },

    /// The data changed underneath the save; the caller should reload and retry.
    #[error("the contact was changed by another request")]
    ConcurrencyConflict,

    /// The store failed or could not be reached.
    #[error("store unavailable: {0}")]
    StoreUnavailable(RepositoryError),
}

impl ContactError {
    /// Whether this error means the requested record does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::ContactNotFound(_) | Self::AddressNotFound(_))
    }
}

impl From<RepositoryError> for ContactError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::ConcurrentUpdate(_) => Self::ConcurrencyConflict,
            other => Self::StoreUnavailable(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concurrent_update_maps_to_conflict() {
        let err = ContactError::from(RepositoryError::ConcurrentUpdate("40001".to_owned()));
        assert!(matches!(err, ContactError::ConcurrencyConflict));
    }

    #[test]
    fn test_other_repository_errors_are_unavailable() {
        let err = ContactError::from(RepositoryError::DataCorruption("bad row".to_owned()));
        assert!(matches!(err, ContactError::StoreUnavailable(_)));
        assert!(!err.is_not_found());
    }
}
