//! Integration tests for Contact Manager.
//!
//! # Running Tests
//!
//! ```bash
//! # Database tests (migrations are applied automatically)
//! CONTACTS_TEST_DATABASE_URL=postgres://localhost/contacts_test \
//!     cargo test -p contact-manager-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `store_postgres` - `PgContactStore` and `ContactService` against a real database
//! - `http_contacts` - HTML and JSON endpoints against a running server
//!
//! Each test uses names made unique with a UUID, so tests can share one
//! database and run in parallel.

use contact_manager_core::{PersonName, PostalAddress};
use secrecy::SecretString;
use sqlx::PgPool;
use uuid::Uuid;

/// Base URL of a running contact manager (default `http://localhost:3000`).
#[must_use]
pub fn base_url() -> String {
    dotenvy::dotenv().ok();
    std::env::var("CONTACTS_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// Connect to the test database and apply migrations.
///
/// Reads `CONTACTS_TEST_DATABASE_URL`, falling back to `DATABASE_URL`.
///
/// # Errors
///
/// Returns an error if the URL is unset, the database is unreachable, or a
/// migration fails.
pub async fn test_pool() -> Result<PgPool, Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let url = std::env::var("CONTACTS_TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| "CONTACTS_TEST_DATABASE_URL is not set")?;

    let pool = contact_manager_web::db::create_pool(&SecretString::from(url), 5).await?;
    sqlx::migrate!("../web/migrations").run(&pool).await?;
    Ok(pool)
}

/// A short random tag for building names no other test uses.
#[must_use]
pub fn unique_tag() -> String {
    Uuid::new_v4().simple().to_string().chars().take(12).collect()
}

/// A valid name whose last name carries `tag`.
///
/// # Panics
///
/// Panics if the generated name fails validation.
#[must_use]
#[allow(clippy::expect_used)]
pub fn test_name(first: &str, tag: &str) -> PersonName {
    PersonName::parse(first, &format!("Tester-{tag}")).expect("test name is valid")
}

/// A valid address whose street carries `tag`.
///
/// # Panics
///
/// Panics if the generated address fails validation.
#[must_use]
#[allow(clippy::expect_used)]
pub fn test_address(street: &str, tag: &str) -> PostalAddress {
    PostalAddress::parse(&format!("{street} {tag}"), "Anytown", "AN", "12345")
        .expect("test address is valid")
}
