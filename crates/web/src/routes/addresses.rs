//! Address JSON endpoints.
//!
//! `GET /addresses` returns a plain array. Every other response body,
//! including rejected IDs and bodies, has the shape
//! `{"success": bool, "errors": [{"field": ..., "message": ...}]}`, with
//! `errors` omitted on success.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::instrument;

use contact_manager_core::{AddressId, FieldError, ValidationErrors};

use super::extract::ApiPath;
use super::forms::AddressPayload;
use crate::error::{capture_server_error, contact_error_message, contact_error_status};
use crate::services::ContactError;
use crate::state::AppState;

/// Response for address operations.
#[derive(Debug, Serialize)]
pub struct AddressResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
}

impl AddressResponse {
    fn ok() -> Response {
        (
            StatusCode::OK,
            Json(Self {
                success: true,
                errors: Vec::new(),
            }),
        )
            .into_response()
    }

    /// `400` for a request that could not be read at all.
    pub(crate) fn rejected(field: &str, message: &str) -> Response {
        Self::failure(StatusCode::BAD_REQUEST, vec![FieldError::new(field, message)])
    }

    fn failure(status: StatusCode, errors: Vec<FieldError>) -> Response {
        (
            status,
            Json(Self {
                success: false,
                errors,
            }),
        )
            .into_response()
    }

    fn invalid(errors: ValidationErrors) -> Response {
        Self::failure(StatusCode::BAD_REQUEST, errors.into_iter().collect())
    }

    fn from_service(err: &ContactError) -> Response {
        let status = contact_error_status(err);
        if status.is_server_error() {
            capture_server_error(err);
        }
        let field = match err {
            ContactError::AddressNotFound(_) => "id",
            _ => "",
        };
        Self::failure(status, vec![FieldError::new(field, contact_error_message(err))])
    }
}

/// List every stored address.
///
/// GET /addresses
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Response {
    match state.contacts().list_addresses().await {
        Ok(addresses) => Json(addresses).into_response(),
        Err(e) => AddressResponse::from_service(&e),
    }
}

/// Delete a single address.
///
/// POST /addresses/{id}/delete
#[instrument(skip(state), fields(address_id = %id))]
pub async fn delete(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<AddressId>,
) -> Response {
    match state.contacts().delete_address(id).await {
        Ok(()) => AddressResponse::ok(),
        Err(e) => AddressResponse::from_service(&e),
    }
}

/// Overwrite a single address's fields.
///
/// POST /addresses/{id}
#[instrument(skip(state, payload), fields(address_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<AddressId>,
    payload: Result<Json<AddressPayload>, JsonRejection>,
) -> Response {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return AddressResponse::rejected("", &rejection.body_text()),
    };

    let postal = match payload.validate() {
        Ok(postal) => postal,
        Err(errors) => return AddressResponse::invalid(errors),
    };

    match state.contacts().update_address_fields(id, postal).await {
        Ok(()) => AddressResponse::ok(),
        Err(e) => AddressResponse::from_service(&e),
    }
}
