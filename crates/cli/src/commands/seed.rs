//! Seed the database with demo contacts.
//!
//! Does nothing if any contact already exists, so it is safe to run more than
//! once.

use std::sync::Arc;

use contact_manager_web::db::{PgContactStore, create_pool};
use contact_manager_web::services::ContactService;
use contact_manager_web::services::seed::{SeedSummary, seed_demo_data};

use super::migrate::database_url;

/// Insert the demo contacts into an empty database.
///
/// # Errors
///
/// Returns an error if the database URL is missing, the connection fails,
/// or an insert fails.
pub async fn demo_data() -> Result<SeedSummary, Box<dyn std::error::Error>> {
    let database_url = database_url()?;

    tracing::info!("Connecting to database...");
    let pool = create_pool(&database_url, 2).await?;
    let contacts = ContactService::new(Arc::new(PgContactStore::new(pool)));

    let summary = seed_demo_data(&contacts).await?;
    if summary.skipped {
        tracing::info!("Database already has contacts; nothing to seed");
    } else {
        tracing::info!(
            contacts = summary.contacts_created,
            addresses = summary.addresses_created,
            "Demo data inserted"
        );
    }
    Ok(summary)
}
