//! Store and service tests against a real `PostgreSQL` database.
//!
//! These tests require:
//! - A running `PostgreSQL` database
//! - `CONTACTS_TEST_DATABASE_URL` pointing at it (migrations are applied)
//!
//! Run with: cargo test -p contact-manager-integration-tests -- --ignored

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use contact_manager_integration_tests::{test_address, test_name, test_pool, unique_tag};
use contact_manager_web::db::{ContactStore, PgContactStore};
use contact_manager_web::models::AddressEdit;
use contact_manager_web::services::{ContactError, ContactService};

async fn service() -> (ContactService, Arc<PgContactStore>) {
    let pool = test_pool().await.expect("Failed to connect to test database");
    let store = Arc::new(PgContactStore::new(pool));
    (ContactService::new(store.clone()), store)
}

// ============================================================================
// Create
// ============================================================================

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_create_contact_stores_addresses_once() {
    let (contacts, _) = service().await;
    let tag = unique_tag();

    let created = contacts
        .create_contact(
            test_name("Ada", &tag),
            vec![
                test_address("1 Main St", &tag),
                test_address("1 Main St", &tag),
                test_address("2 Oak St", &tag),
            ],
        )
        .await
        .unwrap();

    assert_eq!(created.addresses.len(), 2);
    assert!(created.addresses.iter().all(|a| a.contact_id == created.id));

    let fetched = contacts.get_contact(created.id).await.unwrap();
    assert_eq!(fetched, created);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_duplicate_name_is_rejected_without_writes() {
    let (contacts, _) = service().await;
    let tag = unique_tag();

    contacts
        .create_contact(test_name("Grace", &tag), vec![])
        .await
        .unwrap();

    let err = contacts
        .create_contact(
            test_name("Grace", &tag),
            vec![test_address("9 Elm St", &tag)],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ContactError::DuplicateContact { .. }));

    let listed = contacts.list_contacts(Some(&tag)).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert!(listed[0].addresses.is_empty());
}

// ============================================================================
// Search
// ============================================================================

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_search_matches_names_and_address_fields_case_insensitively() {
    let (contacts, _) = service().await;
    let tag = unique_tag();

    let with_address = contacts
        .create_contact(
            test_name("Linus", &tag),
            vec![test_address("77 Harbor Rd", &tag)],
        )
        .await
        .unwrap();
    contacts
        .create_contact(test_name("Margaret", &tag), vec![])
        .await
        .unwrap();

    let by_tag = contacts.list_contacts(Some(&tag.to_uppercase())).await.unwrap();
    assert_eq!(by_tag.len(), 2);

    let by_street = contacts
        .list_contacts(Some(&format!("harbor rd {tag}")))
        .await
        .unwrap();
    assert_eq!(by_street.len(), 1);
    assert_eq!(by_street[0].id, with_address.id);
    assert_eq!(by_street[0].addresses.len(), 1);
}

// ============================================================================
// Edit
// ============================================================================

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_edit_contact_applies_removals_updates_and_additions() {
    let (contacts, _) = service().await;
    let tag = unique_tag();

    let created = contacts
        .create_contact(
            test_name("Barbara", &tag),
            vec![test_address("1 Keep St", &tag), test_address("2 Drop St", &tag)],
        )
        .await
        .unwrap();
    let keep = created.addresses[0].id;
    let drop = created.addresses[1].id;

    let edited = contacts
        .edit_contact(
            created.id,
            test_name("Barb", &tag),
            vec![
                AddressEdit::Remove(drop),
                AddressEdit::Update {
                    id: keep,
                    postal: test_address("1 Kept St", &tag),
                },
                AddressEdit::Add(test_address("3 New St", &tag)),
                AddressEdit::Add(test_address("1 Kept St", &tag)),
            ],
        )
        .await
        .unwrap();

    assert_eq!(edited.first_name(), "Barb");
    assert_eq!(edited.addresses.len(), 2);
    assert_eq!(edited.addresses[0].id, keep);
    assert!(edited.addresses[0].postal.street().starts_with("1 Kept St"));
    assert!(edited.addresses[1].postal.street().starts_with("3 New St"));

    assert!(matches!(
        contacts.get_address(drop).await,
        Err(ContactError::AddressNotFound(_))
    ));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_edit_with_foreign_address_conflicts_and_rolls_back() {
    let (contacts, _) = service().await;
    let tag = unique_tag();

    let owner = contacts
        .create_contact(test_name("Owner", &tag), vec![test_address("5 Own St", &tag)])
        .await
        .unwrap();
    let other = contacts
        .create_contact(test_name("Other", &tag), vec![])
        .await
        .unwrap();

    let err = contacts
        .edit_contact(
            other.id,
            test_name("Renamed", &tag),
            vec![AddressEdit::Update {
                id: owner.addresses[0].id,
                postal: test_address("6 Stolen St", &tag),
            }],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ContactError::ConcurrencyConflict));

    let other_after = contacts.get_contact(other.id).await.unwrap();
    assert_eq!(other_after.first_name(), "Other");
    let owner_after = contacts.get_contact(owner.id).await.unwrap();
    assert_eq!(owner_after, owner);
}

// ============================================================================
// Delete
// ============================================================================

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_delete_contact_cascades_to_addresses() {
    let (contacts, store) = service().await;
    let tag = unique_tag();

    let created = contacts
        .create_contact(test_name("Temp", &tag), vec![test_address("8 Gone St", &tag)])
        .await
        .unwrap();
    let address_id = created.addresses[0].id;

    assert!(contacts.delete_contact(created.id).await.unwrap());
    assert!(!contacts.delete_contact(created.id).await.unwrap());

    assert!(store.get_address(address_id).await.unwrap().is_none());
    assert!(matches!(
        contacts.get_contact(created.id).await,
        Err(ContactError::ContactNotFound(_))
    ));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_update_and_delete_single_address() {
    let (contacts, _) = service().await;
    let tag = unique_tag();

    let created = contacts
        .create_contact(test_name("Single", &tag), vec![test_address("10 First St", &tag)])
        .await
        .unwrap();
    let id = created.addresses[0].id;

    contacts
        .update_address_fields(id, test_address("11 Second St", &tag))
        .await
        .unwrap();
    let updated = contacts.get_address(id).await.unwrap();
    assert!(updated.postal.street().starts_with("11 Second St"));
    assert_eq!(updated.contact_id, created.id);

    contacts.delete_address(id).await.unwrap();
    assert!(matches!(
        contacts.delete_address(id).await,
        Err(ContactError::AddressNotFound(_))
    ));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_store_ping() {
    let (_, store) = service().await;
    store.ping().await.unwrap();
}
