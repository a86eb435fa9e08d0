//! Contact and address domain types.
//!
//! These types represent validated domain objects separate from database row types.

use serde::Serialize;

use contact_manager_core::{AddressId, ContactId, PersonName, PostalAddress};

/// A contact with its addresses loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Contact {
    /// Unique contact ID.
    pub id: ContactId,
    /// First and last name.
    #[serde(flatten)]
    pub name: PersonName,
    /// Addresses owned by this contact, ordered by ID.
    pub addresses: Vec<Address>,
}

impl Contact {
    /// Returns the first name.
    #[must_use]
    pub fn first_name(&self) -> &str {
        self.name.first_name()
    }

    /// Returns the last name.
    #[must_use]
    pub fn last_name(&self) -> &str {
        self.name.last_name()
    }
}

/// A contact row without its addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactRecord {
    /// Unique contact ID.
    pub id: ContactId,
    /// First and last name.
    pub name: PersonName,
}

impl ContactRecord {
    /// Attach loaded addresses to produce a full [`Contact`].
    #[must_use]
    pub fn with_addresses(self, addresses: Vec<Address>) -> Contact {
        Contact {
            id: self.id,
            name: self.name,
            addresses,
        }
    }
}

/// A stored address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Address {
    /// Unique address ID.
    pub id: AddressId,
    /// Contact that owns this address.
    pub contact_id: ContactId,
    /// Street, city, state and postal code.
    #[serde(flatten)]
    pub postal: PostalAddress,
}

/// One requested change to a contact's addresses during an edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressEdit {
    /// Add a new address (reconciled against the contact's existing ones).
    Add(PostalAddress),
    /// Overwrite the fields of an address the contact already owns.
    Update {
        /// Address being edited.
        id: AddressId,
        /// New field values.
        postal: PostalAddress,
    },
    /// Remove an address the contact owns.
    Remove(AddressId),
}
