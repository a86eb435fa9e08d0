//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                          - Redirect to /contacts
//! GET  /health                    - Liveness check
//! GET  /health/ready              - Readiness check (store ping)
//! *    (anything else)            - 404 error page
//!
//! # Contacts (HTML)
//! GET  /contacts?q=               - Contact list, optionally filtered
//! GET  /contacts/new              - New contact form
//! POST /contacts                  - Create contact
//! GET  /contacts/{id}             - Contact detail
//! GET  /contacts/{id}/edit        - Edit form
//! POST /contacts/{id}             - Save edit
//! GET  /contacts/{id}/delete      - Delete confirmation
//! POST /contacts/{id}/delete      - Delete contact
//!
//! # Addresses (JSON)
//! GET  /addresses                 - All addresses
//! POST /addresses/{id}            - Update address fields
//! POST /addresses/{id}/delete     - Delete address
//! ```

pub mod addresses;
pub mod contacts;
pub mod extract;
pub mod forms;

use axum::{
    Router,
    extract::State,
    http::{StatusCode, Uri},
    routing::{get, post},
};

use crate::error::AppError;
use crate::state::AppState;

/// Create the contact page routes router.
pub fn contact_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(contacts::index).post(contacts::create))
        .route("/new", get(contacts::new_page))
        .route("/{id}", get(contacts::show).post(contacts::update))
        .route("/{id}/edit", get(contacts::edit_page))
        .route(
            "/{id}/delete",
            get(contacts::delete_page).post(contacts::destroy),
        )
}

/// Create the address API routes router.
pub fn address_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(addresses::index))
        .route("/{id}", post(addresses::update))
        .route("/{id}/delete", post(addresses::delete))
}

/// Create all routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(contacts::root))
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/contacts", contact_routes())
        .nest("/addresses", address_routes())
}

/// Fallback for paths no route matches.
pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(uri.path().to_owned())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.store().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
