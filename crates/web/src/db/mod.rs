//! Storage gateway for contacts and addresses.
//!
//! # Tables
//!
//! - `contacts` - `id`, `first_name`, `last_name` (unique name pair)
//! - `addresses` - `id`, `street`, `city`, `state`, `postal_code`,
//!   `contact_id NOT NULL REFERENCES contacts(id) ON DELETE CASCADE`
//!
//! # Backends
//!
//! - [`PgContactStore`] - `PostgreSQL` via sqlx (production)
//! - [`InMemoryContactStore`] - process-local store with the same transactional
//!   semantics (tests and demos)
//!
//! Reads go through [`ContactStore`] directly. Writes open a
//! [`StoreTransaction`]; dropping it without calling `commit` rolls back.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/web/migrations/` and run via:
//! ```bash
//! cargo run -p contact-manager-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use contact_manager_core::{AddressId, ContactId, PersonName, PostalAddress};

use crate::models::{Address, Contact, ContactRecord};

pub use memory::InMemoryContactStore;
pub use postgres::PgContactStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Constraint violation (e.g., unique contact name).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// The store aborted the transaction because of a concurrent write
    /// (serialization failure or deadlock).
    #[error("concurrent update: {0}")]
    ConcurrentUpdate(String),
}

/// Read access to contacts and addresses, plus the entry point for writes.
#[async_trait]
pub trait ContactStore: Send + Sync {
    /// List contacts with their addresses, optionally filtered.
    ///
    /// The filter is a case-insensitive substring matched against first name,
    /// last name and every owned address's street, city, state and postal
    /// code. Results are ordered by last name, first name, then ID.
    async fn list_contacts(&self, filter: Option<&str>) -> Result<Vec<Contact>, RepositoryError>;

    /// Get a contact with its addresses.
    async fn get_contact(&self, id: ContactId) -> Result<Option<Contact>, RepositoryError>;

    /// List every stored address, ordered by ID.
    async fn list_addresses(&self) -> Result<Vec<Address>, RepositoryError>;

    /// Get a single address.
    async fn get_address(&self, id: AddressId) -> Result<Option<Address>, RepositoryError>;

    /// Start a unit of work.
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, RepositoryError>;

    /// Check that the store is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// A unit of work against the store.
///
/// Every write for one service operation goes through a single transaction.
/// Nothing is visible to other readers until [`StoreTransaction::commit`];
/// dropping the transaction discards all of its writes.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Find a contact with exactly this first and last name.
    async fn find_contact_by_name(
        &mut self,
        name: &PersonName,
    ) -> Result<Option<ContactId>, RepositoryError>;

    /// Load a contact row and hold it against concurrent writers until the
    /// transaction ends.
    async fn lock_contact(
        &mut self,
        id: ContactId,
    ) -> Result<Option<ContactRecord>, RepositoryError>;

    /// Addresses owned by a contact, ordered by ID.
    async fn contact_addresses(
        &mut self,
        contact_id: ContactId,
    ) -> Result<Vec<Address>, RepositoryError>;

    /// Insert a contact row.
    ///
    /// Returns `RepositoryError::Conflict` if the name is already taken.
    async fn insert_contact(&mut self, name: &PersonName)
    -> Result<ContactRecord, RepositoryError>;

    /// Rename a contact. Returns `false` if the contact does not exist.
    async fn update_contact(
        &mut self,
        id: ContactId,
        name: &PersonName,
    ) -> Result<bool, RepositoryError>;

    /// Delete a contact and, by cascade, its addresses.
    ///
    /// Returns `false` if the contact did not exist.
    async fn delete_contact(&mut self, id: ContactId) -> Result<bool, RepositoryError>;

    /// Insert an address owned by `contact_id`.
    async fn insert_address(
        &mut self,
        contact_id: ContactId,
        postal: &PostalAddress,
    ) -> Result<Address, RepositoryError>;

    /// Overwrite an address's fields. Returns `false` if it does not exist.
    async fn update_address(
        &mut self,
        id: AddressId,
        postal: &PostalAddress,
    ) -> Result<bool, RepositoryError>;

    /// Delete an address. Returns `false` if it did not exist.
    async fn delete_address(&mut self, id: AddressId) -> Result<bool, RepositoryError>;

    /// Make every write in this transaction durable.
    async fn commit(self: Box<Self>) -> Result<(), RepositoryError>;
}

/// Normalize a search filter: blank or whitespace-only means "no filter".
pub(crate) fn normalize_filter(filter: Option<&str>) -> Option<&str> {
    filter.map(str::trim).filter(|f| !f.is_empty())
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
/// * `max_connections` - Upper bound on pooled connections
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(
    database_url: &secrecy::SecretString,
    max_connections: u32,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_filter() {
        assert_eq!(normalize_filter(None), None);
        assert_eq!(normalize_filter(Some("")), None);
        assert_eq!(normalize_filter(Some("   ")), None);
        assert_eq!(normalize_filter(Some(" town ")), Some("town"));
    }
}
