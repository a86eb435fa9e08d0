//! In-memory implementation of the contact store.
//!
//! Holds the whole data set behind one async mutex. A transaction takes the
//! lock for its lifetime, writes to a private copy, and swaps the copy in on
//! commit, so writers are serialized and an abandoned transaction leaves no
//! trace. Readers wait while a transaction is open.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use contact_manager_core::{AddressId, ContactId, PersonName, PostalAddress};

use super::{ContactStore, RepositoryError, StoreTransaction, normalize_filter};
use crate::models::{Address, Contact, ContactRecord};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    contacts: BTreeMap<ContactId, PersonName>,
    addresses: BTreeMap<AddressId, Address>,
    last_contact_id: i32,
    last_address_id: i32,
    /// Remaining address inserts before an injected failure.
    #[cfg(test)]
    address_insert_budget: Option<usize>,
    /// Contact deleted by a simulated competing writer at the next commit.
    #[cfg(test)]
    deleted_before_commit: Option<ContactId>,
}

impl MemoryState {
    fn addresses_of(&self, contact_id: ContactId) -> Vec<Address> {
        self.addresses
            .values()
            .filter(|a| a.contact_id == contact_id)
            .cloned()
            .collect()
    }

    fn contact(&self, id: ContactId) -> Option<Contact> {
        let name = self.contacts.get(&id)?;
        Some(Contact {
            id,
            name: name.clone(),
            addresses: self.addresses_of(id),
        })
    }

    fn remove_contact(&mut self, id: ContactId) -> bool {
        if self.contacts.remove(&id).is_none() {
            return false;
        }
        self.addresses.retain(|_, a| a.contact_id != id);
        true
    }

    fn matches(&self, id: ContactId, name: &PersonName, needle: &str) -> bool {
        name.first_name().to_lowercase().contains(needle)
            || name.last_name().to_lowercase().contains(needle)
            || self
                .addresses
                .values()
                .any(|a| a.contact_id == id && a.postal.contains_lowercase(needle))
    }
}

/// Contact store kept in process memory.
///
/// Cloning shares the underlying data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryContactStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryContactStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Let `n` more address inserts succeed, then fail the next one.
    #[cfg(test)]
    pub(crate) async fn fail_address_insert_after(&self, n: usize) {
        self.state.lock().await.address_insert_budget = Some(n);
    }

    /// Make the next commit lose to a writer that deleted `id`: the contact
    /// is removed and the commit fails with a concurrent update.
    #[cfg(test)]
    pub(crate) async fn delete_before_next_commit(&self, id: ContactId) {
        self.state.lock().await.deleted_before_commit = Some(id);
    }
}

#[async_trait]
impl ContactStore for InMemoryContactStore {
    async fn list_contacts(&self, filter: Option<&str>) -> Result<Vec<Contact>, RepositoryError> {
        let needle = normalize_filter(filter).map(str::to_lowercase);
        let state = self.state.lock().await;

        let mut contacts: Vec<Contact> = state
            .contacts
            .iter()
            .filter(|(id, name)| {
                needle
                    .as_deref()
                    .is_none_or(|needle| state.matches(**id, name, needle))
            })
            .filter_map(|(id, _)| state.contact(*id))
            .collect();

        contacts.sort_by(|a, b| {
            (a.last_name(), a.first_name(), a.id).cmp(&(b.last_name(), b.first_name(), b.id))
        });
        Ok(contacts)
    }

    async fn get_contact(&self, id: ContactId) -> Result<Option<Contact>, RepositoryError> {
        Ok(self.state.lock().await.contact(id))
    }

    async fn list_addresses(&self) -> Result<Vec<Address>, RepositoryError> {
        Ok(self.state.lock().await.addresses.values().cloned().collect())
    }

    async fn get_address(&self, id: AddressId) -> Result<Option<Address>, RepositoryError> {
        Ok(self.state.lock().await.addresses.get(&id).cloned())
    }

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, RepositoryError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTransaction { guard, working }))
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

/// Exclusive access to the store plus the uncommitted copy being edited.
struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn find_contact_by_name(
        &mut self,
        name: &PersonName,
    ) -> Result<Option<ContactId>, RepositoryError> {
        Ok(self
            .working
            .contacts
            .iter()
            .find(|(_, existing)| *existing == name)
            .map(|(id, _)| *id))
    }

    async fn lock_contact(
        &mut self,
        id: ContactId,
    ) -> Result<Option<ContactRecord>, RepositoryError> {
        Ok(self.working.contacts.get(&id).map(|name| ContactRecord {
            id,
            name: name.clone(),
        }))
    }

    async fn contact_addresses(
        &mut self,
        contact_id: ContactId,
    ) -> Result<Vec<Address>, RepositoryError> {
        Ok(self.working.addresses_of(contact_id))
    }

    async fn insert_contact(
        &mut self,
        name: &PersonName,
    ) -> Result<ContactRecord, RepositoryError> {
        if self.working.contacts.values().any(|existing| existing == name) {
            return Err(RepositoryError::Conflict(
                "contact name already exists".to_owned(),
            ));
        }

        self.working.last_contact_id += 1;
        let id = ContactId::new(self.working.last_contact_id);
        self.working.contacts.insert(id, name.clone());
        Ok(ContactRecord {
            id,
            name: name.clone(),
        })
    }

    async fn update_contact(
        &mut self,
        id: ContactId,
        name: &PersonName,
    ) -> Result<bool, RepositoryError> {
        if self
            .working
            .contacts
            .iter()
            .any(|(other, existing)| *other != id && existing == name)
        {
            return Err(RepositoryError::Conflict(
                "contact name already exists".to_owned(),
            ));
        }

        match self.working.contacts.get_mut(&id) {
            Some(existing) => {
                *existing = name.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_contact(&mut self, id: ContactId) -> Result<bool, RepositoryError> {
        Ok(self.working.remove_contact(id))
    }

    async fn insert_address(
        &mut self,
        contact_id: ContactId,
        postal: &PostalAddress,
    ) -> Result<Address, RepositoryError> {
        if !self.working.contacts.contains_key(&contact_id) {
            return Err(RepositoryError::ConcurrentUpdate(
                "owning contact no longer exists".to_owned(),
            ));
        }

        #[cfg(test)]
        match self.working.address_insert_budget {
            Some(0) => {
                return Err(RepositoryError::DataCorruption(
                    "injected address insert failure".to_owned(),
                ));
            }
            Some(ref mut remaining) => *remaining -= 1,
            None => {}
        }

        self.working.last_address_id += 1;
        let address = Address {
            id: AddressId::new(self.working.last_address_id),
            contact_id,
            postal: postal.clone(),
        };
        self.working.addresses.insert(address.id, address.clone());
        Ok(address)
    }

    async fn update_address(
        &mut self,
        id: AddressId,
        postal: &PostalAddress,
    ) -> Result<bool, RepositoryError> {
        match self.working.addresses.get_mut(&id) {
            Some(existing) => {
                existing.postal = postal.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_address(&mut self, id: AddressId) -> Result<bool, RepositoryError> {
        Ok(self.working.addresses.remove(&id).is_some())
    }

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        let Self { mut guard, working } = *self;

        #[cfg(test)]
        if let Some(id) = guard.deleted_before_commit.take() {
            guard.remove_contact(id);
            return Err(RepositoryError::ConcurrentUpdate(
                "contact deleted by another writer".to_owned(),
            ));
        }

        *guard = working;
        Ok(())
    }
}
