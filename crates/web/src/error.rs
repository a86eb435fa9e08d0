//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. HTML route handlers return `Result<T, AppError>`;
//! the JSON address endpoints build their own bodies from [`ContactError`].

use askama::Template;
use axum::{
    extract::rejection::PathRejection,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

use crate::services::ContactError;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Contact service operation failed.
    #[error("Contact error: {0}")]
    Contact(#[from] ContactError),

    /// No route matches the requested path.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed request, such as a non-numeric ID in the path.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Error page.
#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub status: u16,
    pub title: String,
    pub message: String,
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Contact(err) => contact_error_status(err),
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Message safe to show to clients.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Contact(err) => contact_error_message(err),
            Self::NotFound(_) | Self::BadRequest(_) => self.to_string(),
        }
    }
}

/// HTTP status for a contact service error.
#[must_use]
pub const fn contact_error_status(err: &ContactError) -> StatusCode {
    match err {
        ContactError::ContactNotFound(_) | ContactError::AddressNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        ContactError::DuplicateContact { .. } | ContactError::ConcurrencyConflict => {
            StatusCode::CONFLICT
        }
        ContactError::StoreUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Client-facing message for a contact service error.
///
/// Store failures are reported generically; details stay in the logs.
#[must_use]
pub fn contact_error_message(err: &ContactError) -> String {
    match err {
        ContactError::ContactNotFound(_) => "Contact not found".to_string(),
        ContactError::AddressNotFound(_) => "Address not found".to_string(),
        ContactError::DuplicateContact { .. } => DUPLICATE_CONTACT_MESSAGE.to_string(),
        ContactError::ConcurrencyConflict => CONCURRENCY_CONFLICT_MESSAGE.to_string(),
        ContactError::StoreUnavailable(_) => "Internal server error".to_string(),
    }
}

/// Shown when a create or rename collides with an existing contact.
pub const DUPLICATE_CONTACT_MESSAGE: &str = "A contact with the same name already exists.";

/// Shown when an edit raced with another request.
pub const CONCURRENCY_CONFLICT_MESSAGE: &str =
    "This contact was changed by another request. Review the current details and try again.";

/// Log a server-side error and send it to Sentry.
pub fn capture_server_error(err: &(dyn std::error::Error + 'static)) {
    let event_id = sentry::capture_error(err);
    tracing::error!(
        error = %err,
        sentry_event_id = %event_id,
        "Request error"
    );
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            capture_server_error(&self);
        }

        let page = ErrorTemplate {
            status: status.as_u16(),
            title: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.public_message(),
        };

        match page.render() {
            Ok(html) => (status, Html(html)).into_response(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to render error page");
                (status, page.message).into_response()
            }
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
