//! `PostgreSQL` implementation of the contact store.
//!
//! Queries are runtime-checked (`query_as::<_, Row>`) so the crate builds
//! without a live database or an offline query cache.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, instrument};

use contact_manager_core::{AddressId, ContactId, PersonName, PostalAddress};

use super::{ContactStore, RepositoryError, StoreTransaction, normalize_filter};
use crate::models::{Address, Contact, ContactRecord};

/// `SQLSTATE` for a serialization failure.
const SERIALIZATION_FAILURE: &str = "40001";
/// `SQLSTATE` for a detected deadlock.
const DEADLOCK_DETECTED: &str = "40P01";

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ContactRow {
    id: i32,
    first_name: String,
    last_name: String,
}

impl From<ContactRow> for ContactRecord {
    fn from(row: ContactRow) -> Self {
        Self {
            id: ContactId::new(row.id),
            name: PersonName::from_trusted(row.first_name, row.last_name),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AddressRow {
    id: i32,
    contact_id: i32,
    street: String,
    city: String,
    state: String,
    postal_code: String,
}

impl From<AddressRow> for Address {
    fn from(row: AddressRow) -> Self {
        Self {
            id: AddressId::new(row.id),
            contact_id: ContactId::new(row.contact_id),
            postal: PostalAddress::from_trusted(row.street, row.city, row.state, row.postal_code),
        }
    }
}

/// Map driver errors onto repository errors the service can act on.
fn map_db_error(err: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.is_unique_violation() {
            return RepositoryError::Conflict("contact name already exists".to_owned());
        }
        if db_err.is_foreign_key_violation() {
            return RepositoryError::ConcurrentUpdate(
                "owning contact no longer exists".to_owned(),
            );
        }
        if let Some(code) = db_err.code()
            && (code == SERIALIZATION_FAILURE || code == DEADLOCK_DETECTED)
        {
            return RepositoryError::ConcurrentUpdate(db_err.message().to_owned());
        }
    }
    RepositoryError::Database(err)
}

/// Load addresses for a set of contacts in one query, grouped by owner.
async fn load_addresses_for<'e, E>(
    executor: E,
    contact_ids: &[i32],
) -> Result<HashMap<ContactId, Vec<Address>>, RepositoryError>
where
    E: sqlx::PgExecutor<'e>,
{
    if contact_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query_as::<_, AddressRow>(
        r"
        SELECT id, contact_id, street, city, state, postal_code
        FROM addresses
        WHERE contact_id = ANY($1)
        ORDER BY id
        ",
    )
    .bind(contact_ids)
    .fetch_all(executor)
    .await
    .map_err(map_db_error)?;

    let mut grouped: HashMap<ContactId, Vec<Address>> = HashMap::new();
    for row in rows {
        let address = Address::from(row);
        grouped.entry(address.contact_id).or_default().push(address);
    }
    Ok(grouped)
}

// =============================================================================
// Store
// =============================================================================

/// Contact store backed by a `PostgreSQL` pool.
#[derive(Debug, Clone)]
pub struct PgContactStore {
    pool: PgPool,
}

impl PgContactStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ContactStore for PgContactStore {
    #[instrument(skip(self))]
    async fn list_contacts(&self, filter: Option<&str>) -> Result<Vec<Contact>, RepositoryError> {
        let filter = normalize_filter(filter);

        // strpos instead of ILIKE so `%` and `_` in the filter match literally
        let rows = sqlx::query_as::<_, ContactRow>(
            r"
            SELECT c.id, c.first_name, c.last_name
            FROM contacts c
            WHERE $1::text IS NULL
               OR strpos(lower(c.first_name), lower($1)) > 0
               OR strpos(lower(c.last_name), lower($1)) > 0
               OR EXISTS (
                    SELECT 1
                    FROM addresses a
                    WHERE a.contact_id = c.id
                      AND (strpos(lower(a.street), lower($1)) > 0
                        OR strpos(lower(a.city), lower($1)) > 0
                        OR strpos(lower(a.state), lower($1)) > 0
                        OR strpos(lower(a.postal_code), lower($1)) > 0)
               )
            ORDER BY c.last_name, c.first_name, c.id
            ",
        )
        .bind(filter)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        let ids: Vec<i32> = rows.iter().map(|r| r.id).collect();
        let mut addresses = load_addresses_for(&self.pool, &ids).await?;

        let contacts: Vec<Contact> = rows
            .into_iter()
            .map(|row| {
                let record = ContactRecord::from(row);
                let owned = addresses.remove(&record.id).unwrap_or_default();
                record.with_addresses(owned)
            })
            .collect();

        debug!(count = contacts.len(), "Listed contacts");
        Ok(contacts)
    }

    #[instrument(skip(self), fields(contact_id = %id))]
    async fn get_contact(&self, id: ContactId) -> Result<Option<Contact>, RepositoryError> {
        let row = sqlx::query_as::<_, ContactRow>(
            r"
            SELECT id, first_name, last_name
            FROM contacts
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut addresses = load_addresses_for(&self.pool, &[row.id]).await?;
        let record = ContactRecord::from(row);
        let owned = addresses.remove(&record.id).unwrap_or_default();
        Ok(Some(record.with_addresses(owned)))
    }

    async fn list_addresses(&self) -> Result<Vec<Address>, RepositoryError> {
        let rows = sqlx::query_as::<_, AddressRow>(
            r"
            SELECT id, contact_id, street, city, state, postal_code
            FROM addresses
            ORDER BY id
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get_address(&self, id: AddressId) -> Result<Option<Address>, RepositoryError> {
        let row = sqlx::query_as::<_, AddressRow>(
            r"
            SELECT id, contact_id, street, city, state, postal_code
            FROM addresses
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(row.map(Into::into))
    }

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, RepositoryError> {
        let tx = self.pool.begin().await.map_err(map_db_error)?;
        Ok(Box::new(PgStoreTransaction { tx }))
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(())
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// A `PostgreSQL` transaction. Rolled back by sqlx when dropped uncommitted.
struct PgStoreTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTransaction for PgStoreTransaction {
    async fn find_contact_by_name(
        &mut self,
        name: &PersonName,
    ) -> Result<Option<ContactId>, RepositoryError> {
        let id = sqlx::query_scalar::<_, i32>(
            r"
            SELECT id
            FROM contacts
            WHERE first_name = $1 AND last_name = $2
            ",
        )
        .bind(name.first_name())
        .bind(name.last_name())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_db_error)?;

        Ok(id.map(ContactId::new))
    }

    async fn lock_contact(
        &mut self,
        id: ContactId,
    ) -> Result<Option<ContactRecord>, RepositoryError> {
        let row = sqlx::query_as::<_, ContactRow>(
            r"
            SELECT id, first_name, last_name
            FROM contacts
            WHERE id = $1
            FOR UPDATE
            ",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_db_error)?;

        Ok(row.map(Into::into))
    }

    async fn contact_addresses(
        &mut self,
        contact_id: ContactId,
    ) -> Result<Vec<Address>, RepositoryError> {
        let mut grouped = load_addresses_for(&mut *self.tx, &[contact_id.as_i32()]).await?;
        Ok(grouped.remove(&contact_id).unwrap_or_default())
    }

    async fn insert_contact(
        &mut self,
        name: &PersonName,
    ) -> Result<ContactRecord, RepositoryError> {
        let row = sqlx::query_as::<_, ContactRow>(
            r"
            INSERT INTO contacts (first_name, last_name)
            VALUES ($1, $2)
            RETURNING id, first_name, last_name
            ",
        )
        .bind(name.first_name())
        .bind(name.last_name())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_db_error)?;

        Ok(row.into())
    }

    async fn update_contact(
        &mut self,
        id: ContactId,
        name: &PersonName,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE contacts
            SET first_name = $1, last_name = $2
            WHERE id = $3
            ",
        )
        .bind(name.first_name())
        .bind(name.last_name())
        .bind(id)
        .execute(&mut *self.tx)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_contact(&mut self, id: ContactId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM contacts WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_address(
        &mut self,
        contact_id: ContactId,
        postal: &PostalAddress,
    ) -> Result<Address, RepositoryError> {
        let row = sqlx::query_as::<_, AddressRow>(
            r"
            INSERT INTO addresses (street, city, state, postal_code, contact_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, contact_id, street, city, state, postal_code
            ",
        )
        .bind(postal.street())
        .bind(postal.city())
        .bind(postal.state())
        .bind(postal.postal_code())
        .bind(contact_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_db_error)?;

        Ok(row.into())
    }

    async fn update_address(
        &mut self,
        id: AddressId,
        postal: &PostalAddress,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE addresses
            SET street = $1, city = $2, state = $3, postal_code = $4
            WHERE id = $5
            ",
        )
        .bind(postal.street())
        .bind(postal.city())
        .bind(postal.state())
        .bind(postal.postal_code())
        .bind(id)
        .execute(&mut *self.tx)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_address(&mut self, id: AddressId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM addresses WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        self.tx.commit().await.map_err(map_db_error)
    }
}
