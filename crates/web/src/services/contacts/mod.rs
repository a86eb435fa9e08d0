//! Contact service.
//!
//! Every write operation opens one store transaction, performs all of its
//! row changes inside it, and commits once. Any error drops the transaction,
//! which rolls back everything written so far.

mod error;

pub use error::ContactError;

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use contact_manager_core::{AddressId, ContactId, PersonName, PostalAddress};

use crate::db::{ContactStore, RepositoryError};
use crate::models::{Address, AddressEdit, Contact};
use crate::services::reconciler::plan_inserts;

/// Contact service.
///
/// Cheap to clone; all clones share the same store.
#[derive(Clone)]
pub struct ContactService {
    store: Arc<dyn ContactStore>,
}

impl std::fmt::Debug for ContactService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContactService").finish_non_exhaustive()
    }
}

impl ContactService {
    /// Create a service over a store.
    #[must_use]
    pub fn new(store: Arc<dyn ContactStore>) -> Self {
        Self { store }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// List contacts with their addresses, optionally filtered by `search`.
    ///
    /// # Errors
    ///
    /// Returns `ContactError::StoreUnavailable` if the store fails.
    #[instrument(skip(self))]
    pub async fn list_contacts(&self, search: Option<&str>) -> Result<Vec<Contact>, ContactError> {
        Ok(self.store.list_contacts(search).await?)
    }

    /// Get a contact with its addresses.
    ///
    /// # Errors
    ///
    /// Returns `ContactError::ContactNotFound` if no contact has this ID.
    #[instrument(skip(self), fields(contact_id = %id))]
    pub async fn get_contact(&self, id: ContactId) -> Result<Contact, ContactError> {
        self.store
            .get_contact(id)
            .await?
            .ok_or(ContactError::ContactNotFound(id))
    }

    /// List every stored address.
    ///
    /// # Errors
    ///
    /// Returns `ContactError::StoreUnavailable` if the store fails.
    pub async fn list_addresses(&self) -> Result<Vec<Address>, ContactError> {
        Ok(self.store.list_addresses().await?)
    }

    /// Get a single address.
    ///
    /// # Errors
    ///
    /// Returns `ContactError::AddressNotFound` if no address has this ID.
    pub async fn get_address(&self, id: AddressId) -> Result<Address, ContactError> {
        self.store
            .get_address(id)
            .await?
            .ok_or(ContactError::AddressNotFound(id))
    }

    // =========================================================================
    // Contact Writes
    // =========================================================================

    /// Create a contact with its initial addresses.
    ///
    /// Repeated addresses in `addresses` are stored once.
    ///
    /// # Errors
    ///
    /// Returns `ContactError::DuplicateContact` if the name is taken. Nothing
    /// is written in that case.
    #[instrument(skip(self, addresses), fields(name = %name, address_count = addresses.len()))]
    pub async fn create_contact(
        &self,
        name: PersonName,
        addresses: Vec<PostalAddress>,
    ) -> Result<Contact, ContactError> {
        let mut tx = self.store.begin().await?;

        if tx.find_contact_by_name(&name).await?.is_some() {
            return Err(duplicate(&name));
        }

        let record = tx
            .insert_contact(&name)
            .await
            .map_err(|e| name_conflict(e, &name))?;

        let plan = plan_inserts(addresses, &[]);
        let mut stored = Vec::with_capacity(plan.inserts.len());
        for postal in &plan.inserts {
            stored.push(tx.insert_address(record.id, postal).await?);
        }

        tx.commit().await?;

        info!(contact_id = %record.id, addresses = stored.len(), "Contact created");
        Ok(record.with_addresses(stored))
    }

    /// Rename a contact and apply address edits.
    ///
    /// Edits run as removals, then updates, then additions. Removing an
    /// address the contact no longer owns is a no-op. Additions are
    /// reconciled against the addresses the contact still owns after the
    /// removals and updates.
    ///
    /// # Errors
    ///
    /// Returns `ContactError::ContactNotFound` if the contact does not exist.
    /// Returns `ContactError::DuplicateContact` if another contact has the name.
    /// Returns `ContactError::ConcurrencyConflict` if an updated address is
    /// not owned by this contact, or the store reports a concurrent write.
    #[instrument(skip(self, edits), fields(contact_id = %id, name = %name, edit_count = edits.len()))]
    pub async fn edit_contact(
        &self,
        id: ContactId,
        name: PersonName,
        edits: Vec<AddressEdit>,
    ) -> Result<Contact, ContactError> {
        match self.apply_edit(id, &name, edits).await {
            Err(ContactError::ConcurrencyConflict) => {
                // The transaction is gone; a plain read shows the committed state.
                if self.store.get_contact(id).await?.is_none() {
                    return Err(ContactError::ContactNotFound(id));
                }
                warn!("Edit hit a concurrent change");
                Err(ContactError::ConcurrencyConflict)
            }
            other => other,
        }
    }

    async fn apply_edit(
        &self,
        id: ContactId,
        name: &PersonName,
        edits: Vec<AddressEdit>,
    ) -> Result<Contact, ContactError> {
        let mut tx = self.store.begin().await?;

        let Some(record) = tx.lock_contact(id).await? else {
            return Err(ContactError::ContactNotFound(id));
        };

        if let Some(other) = tx.find_contact_by_name(name).await?
            && other != id
        {
            return Err(duplicate(name));
        }

        if record.name != *name
            && !tx
                .update_contact(id, name)
                .await
                .map_err(|e| name_conflict(e, name))?
        {
            return Err(ContactError::ContactNotFound(id));
        }

        let mut removals = Vec::new();
        let mut updates = Vec::new();
        let mut additions = Vec::new();
        for edit in edits {
            match edit {
                AddressEdit::Remove(address_id) => removals.push(address_id),
                AddressEdit::Update { id, postal } => updates.push((id, postal)),
                AddressEdit::Add(postal) => additions.push(postal),
            }
        }

        let owned: HashSet<AddressId> = tx
            .contact_addresses(id)
            .await?
            .iter()
            .map(|a| a.id)
            .collect();

        for address_id in removals {
            if owned.contains(&address_id) {
                tx.delete_address(address_id).await?;
            } else {
                debug!(address_id = %address_id, "Address already gone, skipping removal");
            }
        }

        for (address_id, postal) in updates {
            if !owned.contains(&address_id) || !tx.update_address(address_id, &postal).await? {
                return Err(ContactError::ConcurrencyConflict);
            }
        }

        if !additions.is_empty() {
            let scope = tx.contact_addresses(id).await?;
            let plan = plan_inserts(additions, &scope);
            for postal in &plan.inserts {
                tx.insert_address(id, postal).await?;
            }
        }

        let addresses = tx.contact_addresses(id).await?;
        tx.commit().await?;

        info!(addresses = addresses.len(), "Contact updated");
        Ok(Contact {
            id,
            name: name.clone(),
            addresses,
        })
    }

    /// Delete a contact and its addresses.
    ///
    /// Deleting a contact that does not exist is not an error. Returns whether
    /// a contact was removed.
    ///
    /// # Errors
    ///
    /// Returns `ContactError::StoreUnavailable` if the store fails.
    #[instrument(skip(self), fields(contact_id = %id))]
    pub async fn delete_contact(&self, id: ContactId) -> Result<bool, ContactError> {
        let mut tx = self.store.begin().await?;
        let removed = tx.delete_contact(id).await?;
        tx.commit().await?;

        if removed {
            info!("Contact deleted");
        } else {
            debug!("Contact already absent");
        }
        Ok(removed)
    }

    // =========================================================================
    // Address Writes
    // =========================================================================

    /// Delete a single address.
    ///
    /// # Errors
    ///
    /// Returns `ContactError::AddressNotFound` if no address has this ID.
    #[instrument(skip(self), fields(address_id = %id))]
    pub async fn delete_address(&self, id: AddressId) -> Result<(), ContactError> {
        let mut tx = self.store.begin().await?;
        if !tx.delete_address(id).await? {
            return Err(ContactError::AddressNotFound(id));
        }
        tx.commit().await?;

        info!("Address deleted");
        Ok(())
    }

    /// Overwrite a single address's fields.
    ///
    /// # Errors
    ///
    /// Returns `ContactError::AddressNotFound` if no address has this ID.
    #[instrument(skip(self, postal), fields(address_id = %id))]
    pub async fn update_address_fields(
        &self,
        id: AddressId,
        postal: PostalAddress,
    ) -> Result<(), ContactError> {
        let mut tx = self.store.begin().await?;
        if !tx.update_address(id, &postal).await? {
            return Err(ContactError::AddressNotFound(id));
        }
        tx.commit().await?;

        info!("Address updated");
        Ok(())
    }
}

fn duplicate(name: &PersonName) -> ContactError {
    ContactError::DuplicateContact {
        first_name: name.first_name().to_owned(),
        last_name: name.last_name().to_owned(),
    }
}

/// A unique violation on write means another request took the name first.
fn name_conflict(err: RepositoryError, name: &PersonName) -> ContactError {
    match err {
        RepositoryError::Conflict(_) => duplicate(name),
        other => other.into(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::InMemoryContactStore;

    fn name(first: &str, last: &str) -> PersonName {
        PersonName::parse(first, last).unwrap()
    }

    fn postal(street: &str, city: &str, state: &str, postal_code: &str) -> PostalAddress {
        PostalAddress::parse(street, city, state, postal_code).unwrap()
    }

    fn main_st() -> PostalAddress {
        postal("123 Main St", "Anytown", "AN", "12345")
    }

    fn pine_st() -> PostalAddress {
        postal("789 Pine St", "Sometown", "ST", "11223")
    }

    fn oak_st() -> PostalAddress {
        postal("456 Oak St", "Othertown", "OT", "67890")
    }

    fn service() -> (ContactService, InMemoryContactStore) {
        let store = InMemoryContactStore::new();
        (ContactService::new(Arc::new(store.clone())), store)
    }

    #[tokio::test]
    async fn test_create_with_new_address_links_rows() {
        let (service, _) = service();
        let contact = service
            .create_contact(name("Sayed", "Ghoneim"), vec![main_st()])
            .await
            .unwrap();

        assert_eq!(contact.addresses.len(), 1);
        assert_eq!(contact.addresses[0].contact_id, contact.id);
        assert_eq!(service.list_contacts(None).await.unwrap().len(), 1);
        assert_eq!(service.list_addresses().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_identical_address_on_two_contacts_gives_two_rows() {
        let (service, _) = service();
        service
            .create_contact(name("Sayed", "Ghoneim"), vec![main_st()])
            .await
            .unwrap();
        service
            .create_contact(name("Mohamed", "Ghoneim"), vec![main_st()])
            .await
            .unwrap();

        assert_eq!(service.list_contacts(None).await.unwrap().len(), 2);
        assert_eq!(service.list_addresses().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_same_address_twice_for_one_contact_gives_one_row() {
        let (service, _) = service();
        let contact = service
            .create_contact(name("Sayed", "Ghoneim"), vec![main_st(), main_st()])
            .await
            .unwrap();

        assert_eq!(contact.addresses.len(), 1);
        assert_eq!(service.list_addresses().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_duplicate_name_writes_nothing() {
        let (service, _) = service();
        service
            .create_contact(name("Sayed", "Ghoneim"), vec![main_st()])
            .await
            .unwrap();

        let err = service
            .create_contact(name("Sayed", "Ghoneim"), vec![oak_st()])
            .await
            .unwrap_err();

        assert!(matches!(err, ContactError::DuplicateContact { .. }));
        assert_eq!(service.list_contacts(None).await.unwrap().len(), 1);
        assert_eq!(service.list_addresses().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_failure_midway_leaves_no_rows() {
        let (service, store) = service();
        store.fail_address_insert_after(1).await;

        let result = service
            .create_contact(name("Sayed", "Ghoneim"), vec![main_st(), pine_st()])
            .await;

        assert!(matches!(result, Err(ContactError::StoreUnavailable(_))));
        assert!(service.list_contacts(None).await.unwrap().is_empty());
        assert!(service.list_addresses().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rename_into_existing_name_is_rejected() {
        let (service, _) = service();
        service
            .create_contact(name("Sayed", "Ghoneim"), vec![])
            .await
            .unwrap();
        let mohamed = service
            .create_contact(name("Mohamed", "Ghoneim"), vec![])
            .await
            .unwrap();

        let err = service
            .edit_contact(mohamed.id, name("Sayed", "Ghoneim"), vec![])
            .await
            .unwrap_err();

        assert!(matches!(err, ContactError::DuplicateContact { .. }));
        let unchanged = service.get_contact(mohamed.id).await.unwrap();
        assert_eq!(unchanged.first_name(), "Mohamed");
    }

    #[tokio::test]
    async fn test_edit_keeping_own_name_is_allowed() {
        let (service, _) = service();
        let contact = service
            .create_contact(name("Sayed", "Ghoneim"), vec![main_st()])
            .await
            .unwrap();

        let edited = service
            .edit_contact(contact.id, name("Sayed", "Ghoneim"), vec![AddressEdit::Add(oak_st())])
            .await
            .unwrap();

        assert_eq!(edited.addresses.len(), 2);
    }

    #[tokio::test]
    async fn test_edit_missing_contact_is_not_found() {
        let (service, _) = service();
        let err = service
            .edit_contact(ContactId::new(42), name("Sayed", "Ghoneim"), vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, ContactError::ContactNotFound(id) if id == ContactId::new(42)));
    }

    #[tokio::test]
    async fn test_edit_removes_one_address_and_keeps_siblings() {
        let (service, _) = service();
        let contact = service
            .create_contact(name("Sayed", "Ghoneim"), vec![main_st(), pine_st()])
            .await
            .unwrap();
        let removed = contact.addresses[0].id;
        let kept = contact.addresses[1].id;

        let edited = service
            .edit_contact(contact.id, name("Sayed", "Ghoneim"), vec![AddressEdit::Remove(removed)])
            .await
            .unwrap();

        assert_eq!(edited.addresses.len(), 1);
        assert_eq!(edited.addresses[0].id, kept);
        assert!(service.get_address(removed).await.unwrap_err().is_not_found());
        assert!(service.get_contact(contact.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_edit_removing_absent_address_is_noop() {
        let (service, _) = service();
        let contact = service
            .create_contact(name("Sayed", "Ghoneim"), vec![main_st()])
            .await
            .unwrap();

        let edited = service
            .edit_contact(
                contact.id,
                name("Sayed", "Ghoneim"),
                vec![AddressEdit::Remove(AddressId::new(999))],
            )
            .await
            .unwrap();

        assert_eq!(edited.addresses.len(), 1);
    }

    #[tokio::test]
    async fn test_edit_cannot_remove_another_contacts_address() {
        let (service, _) = service();
        let sayed = service
            .create_contact(name("Sayed", "Ghoneim"), vec![main_st()])
            .await
            .unwrap();
        let mohamed = service
            .create_contact(name("Mohamed", "Ghoneim"), vec![oak_st()])
            .await
            .unwrap();

        service
            .edit_contact(
                sayed.id,
                name("Sayed", "Ghoneim"),
                vec![AddressEdit::Remove(mohamed.addresses[0].id)],
            )
            .await
            .unwrap();

        assert!(service.get_address(mohamed.addresses[0].id).await.is_ok());
    }

    #[tokio::test]
    async fn test_edit_updates_owned_address() {
        let (service, _) = service();
        let contact = service
            .create_contact(name("Sayed", "Ghoneim"), vec![main_st()])
            .await
            .unwrap();
        let address_id = contact.addresses[0].id;

        let edited = service
            .edit_contact(
                contact.id,
                name("Sayed", "Ghoneim"),
                vec![AddressEdit::Update {
                    id: address_id,
                    postal: oak_st(),
                }],
            )
            .await
            .unwrap();

        assert_eq!(edited.addresses[0].id, address_id);
        assert_eq!(edited.addresses[0].postal, oak_st());
    }

    #[tokio::test]
    async fn test_edit_updating_foreign_address_conflicts_and_rolls_back() {
        let (service, _) = service();
        let sayed = service
            .create_contact(name("Sayed", "Ghoneim"), vec![main_st()])
            .await
            .unwrap();
        let mohamed = service
            .create_contact(name("Mohamed", "Ghoneim"), vec![oak_st()])
            .await
            .unwrap();

        let err = service
            .edit_contact(
                sayed.id,
                name("Sayed", "Renamed"),
                vec![AddressEdit::Update {
                    id: mohamed.addresses[0].id,
                    postal: pine_st(),
                }],
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ContactError::ConcurrencyConflict));
        let sayed = service.get_contact(sayed.id).await.unwrap();
        assert_eq!(sayed.last_name(), "Ghoneim");
        let foreign = service.get_address(mohamed.addresses[0].id).await.unwrap();
        assert_eq!(foreign.postal, oak_st());
    }

    #[tokio::test]
    async fn test_edit_failure_midway_rolls_back_every_change() {
        let (service, store) = service();
        let contact = service
            .create_contact(name("Sayed", "Ghoneim"), vec![main_st(), pine_st()])
            .await
            .unwrap();
        store.fail_address_insert_after(0).await;

        let result = service
            .edit_contact(
                contact.id,
                name("Sayed", "Renamed"),
                vec![
                    AddressEdit::Remove(contact.addresses[0].id),
                    AddressEdit::Update {
                        id: contact.addresses[1].id,
                        postal: postal("1 Elm St", "Anytown", "AN", "12345"),
                    },
                    AddressEdit::Add(oak_st()),
                ],
            )
            .await;

        assert!(matches!(result, Err(ContactError::StoreUnavailable(_))));
        let after = service.get_contact(contact.id).await.unwrap();
        assert_eq!(after, contact);
    }

    #[tokio::test]
    async fn test_edit_conflict_with_deleted_contact_is_not_found() {
        let (service, store) = service();
        let contact = service
            .create_contact(name("Sayed", "Ghoneim"), vec![main_st()])
            .await
            .unwrap();
        store.delete_before_next_commit(contact.id).await;

        let err = service
            .edit_contact(
                contact.id,
                name("Sayed", "Renamed"),
                vec![AddressEdit::Add(pine_st())],
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ContactError::ContactNotFound(id) if id == contact.id));
    }

    #[tokio::test]
    async fn test_edit_additions_reconcile_against_remaining_addresses() {
        let (service, _) = service();
        let contact = service
            .create_contact(name("Sayed", "Ghoneim"), vec![main_st()])
            .await
            .unwrap();

        let edited = service
            .edit_contact(
                contact.id,
                name("Sayed", "Ghoneim"),
                vec![
                    AddressEdit::Add(main_st()),
                    AddressEdit::Add(pine_st()),
                    AddressEdit::Add(pine_st()),
                ],
            )
            .await
            .unwrap();

        assert_eq!(edited.addresses.len(), 2);
        assert_eq!(edited.addresses[0].id, contact.addresses[0].id);
    }

    #[tokio::test]
    async fn test_delete_contact_removes_addresses() {
        let (service, _) = service();
        let contact = service
            .create_contact(name("Sayed", "Ghoneim"), vec![main_st(), pine_st()])
            .await
            .unwrap();

        assert!(service.delete_contact(contact.id).await.unwrap());

        for address in &contact.addresses {
            let err = service.get_address(address.id).await.unwrap_err();
            assert!(matches!(err, ContactError::AddressNotFound(_)));
        }
        assert!(service.get_contact(contact.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_delete_absent_contact_is_noop() {
        let (service, _) = service();
        assert!(!service.delete_contact(ContactId::new(7)).await.unwrap());
    }

    #[tokio::test]
    async fn test_search_by_city_substring() {
        let (service, _) = service();
        service
            .create_contact(name("Sayed", "Ghoneim"), vec![main_st(), pine_st()])
            .await
            .unwrap();
        service
            .create_contact(name("Mohamed", "Ghoneim"), vec![oak_st()])
            .await
            .unwrap();

        let found = service.list_contacts(Some("othert")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].first_name(), "Mohamed");

        let found = service.list_contacts(Some("SOMETOWN")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].first_name(), "Sayed");
    }

    #[tokio::test]
    async fn test_address_direct_operations() {
        let (service, _) = service();
        let contact = service
            .create_contact(name("Sayed", "Ghoneim"), vec![main_st()])
            .await
            .unwrap();
        let address_id = contact.addresses[0].id;

        service
            .update_address_fields(address_id, pine_st())
            .await
            .unwrap();
        assert_eq!(service.get_address(address_id).await.unwrap().postal, pine_st());

        service.delete_address(address_id).await.unwrap();
        let err = service.delete_address(address_id).await.unwrap_err();
        assert!(matches!(err, ContactError::AddressNotFound(_)));

        let err = service
            .update_address_fields(address_id, oak_st())
            .await
            .unwrap_err();
        assert!(matches!(err, ContactError::AddressNotFound(_)));
    }
}
