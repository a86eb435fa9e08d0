//! Demo data.
//!
//! Seeding only runs against an empty store, so it is safe to invoke on every
//! startup or repeatedly from the CLI.

use tracing::{info, instrument};

use contact_manager_core::{PersonName, PostalAddress};

use super::{ContactError, ContactService};

/// One demo contact: first name, last name, addresses.
type DemoContact = (&'static str, &'static str, &'static [DemoAddress]);
/// Street, city, state, postal code.
type DemoAddress = (&'static str, &'static str, &'static str, &'static str);

const DEMO_CONTACTS: &[DemoContact] = &[
    (
        "Sayed",
        "Ghoneim",
        &[
            ("123 Main St", "Anytown", "AN", "12345"),
            ("789 Pine St", "Sometown", "ST", "11223"),
        ],
    ),
    (
        "Mohamed",
        "Ghoneim",
        &[("456 Oak St", "Othertown", "OT", "67890")],
    ),
];

/// What a seeding run did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    /// Contacts inserted.
    pub contacts_created: usize,
    /// Addresses inserted.
    pub addresses_created: usize,
    /// The store already held contacts, so nothing was inserted.
    pub skipped: bool,
}

/// Insert the demo contacts if the store has no contacts yet.
///
/// # Errors
///
/// Returns `ContactError` if the store fails.
#[instrument(skip(contacts))]
pub async fn seed_demo_data(contacts: &ContactService) -> Result<SeedSummary, ContactError> {
    if !contacts.list_contacts(None).await?.is_empty() {
        info!("Store already has contacts, skipping demo data");
        return Ok(SeedSummary {
            skipped: true,
            ..SeedSummary::default()
        });
    }

    let mut summary = SeedSummary::default();
    for (first_name, last_name, addresses) in DEMO_CONTACTS {
        let name = PersonName::from_trusted((*first_name).to_owned(), (*last_name).to_owned());
        let addresses = addresses
            .iter()
            .map(|(street, city, state, postal_code)| {
                PostalAddress::from_trusted(
                    (*street).to_owned(),
                    (*city).to_owned(),
                    (*state).to_owned(),
                    (*postal_code).to_owned(),
                )
            })
            .collect();

        match contacts.create_contact(name, addresses).await {
            Ok(contact) => {
                summary.contacts_created += 1;
                summary.addresses_created += contact.addresses.len();
            }
            // Lost a race with a concurrent seed; the row is there either way.
            Err(ContactError::DuplicateContact { .. }) => {}
            Err(e) => return Err(e),
        }
    }

    info!(
        contacts = summary.contacts_created,
        addresses = summary.addresses_created,
        "Seeded demo data"
    );
    Ok(summary)
}
