//! Contact page route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::instrument;

use contact_manager_core::{ContactId, ValidationErrors};

use super::extract::PagePath;
use super::forms::{ADDRESSES_FIELD, AddressForm, ContactForm};
use crate::error::{CONCURRENCY_CONFLICT_MESSAGE, DUPLICATE_CONTACT_MESSAGE, Result};
use crate::models::Contact;
use crate::services::ContactError;
use crate::state::AppState;

// =============================================================================
// View Models
// =============================================================================

/// One input of an address row.
#[derive(Debug, Clone)]
pub struct FieldView {
    /// Field name without the row prefix, e.g. `city`.
    pub name: &'static str,
    pub label: &'static str,
    pub value: String,
    pub error: Option<String>,
}

/// One address row of the contact form.
#[derive(Debug, Clone)]
pub struct AddressRowView {
    pub index: usize,
    /// Empty for a new row.
    pub id: String,
    pub fields: Vec<FieldView>,
    pub delete: bool,
    pub id_error: Option<String>,
}

impl AddressRowView {
    fn from_form(row: &AddressForm, errors: &ValidationErrors) -> Self {
        let message = |field: &str| {
            errors
                .message_for(&format!("addresses[{}].{field}", row.index))
                .map(str::to_owned)
        };
        let field = |name: &'static str, label: &'static str, value: &str| FieldView {
            name,
            label,
            value: value.to_owned(),
            error: message(name),
        };

        Self {
            index: row.index,
            id: row.id.trim().to_owned(),
            fields: vec![
                field("street", "Street", &row.street),
                field("city", "City", &row.city),
                field("state", "State", &row.state),
                field("postal_code", "Postal code", &row.postal_code),
            ],
            delete: row.delete,
            id_error: message("id"),
        }
    }

    /// Whether this row is a new address rather than a stored one.
    #[must_use]
    pub fn is_new(&self) -> bool {
        self.id.is_empty()
    }
}

/// Everything the create and edit forms render.
#[derive(Debug, Clone)]
pub struct ContactFormView {
    pub first_name: String,
    pub last_name: String,
    pub first_name_error: Option<String>,
    pub last_name_error: Option<String>,
    pub rows: Vec<AddressRowView>,
    /// Problem with the address list as a whole (too many rows).
    pub addresses_error: Option<String>,
    /// Message for the whole form (duplicate name, concurrent change).
    pub form_error: Option<String>,
}

impl ContactFormView {
    /// Build the view, appending one empty row for a new address while the
    /// contact is below the address limit.
    #[must_use]
    pub fn new(form: &ContactForm, errors: &ValidationErrors) -> Self {
        let mut rows: Vec<AddressRowView> = form
            .addresses
            .iter()
            .filter(|row| !row.is_blank())
            .map(|row| AddressRowView::from_form(row, errors))
            .collect();

        if form.has_room() {
            let blank = AddressForm {
                index: form.next_index(),
                ..AddressForm::default()
            };
            rows.push(AddressRowView::from_form(&blank, errors));
        }

        Self {
            first_name: form.first_name.clone(),
            last_name: form.last_name.clone(),
            first_name_error: errors.message_for("first_name").map(str::to_owned),
            last_name_error: errors.message_for("last_name").map(str::to_owned),
            rows,
            addresses_error: errors.message_for(ADDRESSES_FIELD).map(str::to_owned),
            form_error: None,
        }
    }

    #[must_use]
    fn with_form_error(mut self, message: &str) -> Self {
        self.form_error = Some(message.to_owned());
        self
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Contact list page template.
#[derive(Template, WebTemplate)]
#[template(path = "contacts/index.html")]
pub struct ContactsIndexTemplate {
    pub contacts: Vec<Contact>,
    pub q: String,
}

/// Contact detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "contacts/show.html")]
pub struct ContactShowTemplate {
    pub contact: Contact,
}

/// New contact form template.
#[derive(Template, WebTemplate)]
#[template(path = "contacts/new.html")]
pub struct ContactNewTemplate {
    pub form: ContactFormView,
}

/// Edit contact form template.
#[derive(Template, WebTemplate)]
#[template(path = "contacts/edit.html")]
pub struct ContactEditTemplate {
    pub id: ContactId,
    pub form: ContactFormView,
}

/// Delete confirmation page template.
#[derive(Template, WebTemplate)]
#[template(path = "contacts/delete.html")]
pub struct ContactDeleteTemplate {
    pub contact: Contact,
}

// =============================================================================
// Handlers
// =============================================================================

/// Search query parameters.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

/// `302 Found` to `location`.
fn found(location: String) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

/// Redirect the site root to the contact list.
pub async fn root() -> Response {
    found("/contacts".to_string())
}

/// Display the contact list, optionally filtered by `?q=`.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<ContactsIndexTemplate> {
    let q = query.q.unwrap_or_default();
    let contacts = state.contacts().list_contacts(Some(&q)).await?;

    Ok(ContactsIndexTemplate {
        contacts,
        q: q.trim().to_owned(),
    })
}

/// Display a contact.
#[instrument(skip(state), fields(contact_id = %id))]
pub async fn show(
    State(state): State<AppState>,
    PagePath(id): PagePath<ContactId>,
) -> Result<ContactShowTemplate> {
    let contact = state.contacts().get_contact(id).await?;
    Ok(ContactShowTemplate { contact })
}

/// Display the new contact form.
pub async fn new_page() -> ContactNewTemplate {
    ContactNewTemplate {
        form: ContactFormView::new(&ContactForm::default(), &ValidationErrors::new()),
    }
}

/// Handle the new contact form.
///
/// Redirects to the list on success. Re-renders the form with `422` when a
/// field is invalid or the name is already taken.
#[instrument(skip(state, pairs))]
pub async fn create(
    State(state): State<AppState>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response> {
    let form = ContactForm::from_pairs(pairs);

    let (name, addresses) = match form.validate_new() {
        Ok(valid) => valid,
        Err(errors) => {
            let view = ContactFormView::new(&form, &errors);
            return Ok(unprocessable(ContactNewTemplate { form: view }));
        }
    };

    match state.contacts().create_contact(name, addresses).await {
        Ok(contact) => {
            tracing::info!(contact_id = %contact.id, "Created contact via form");
            Ok(found("/contacts".to_string()))
        }
        Err(ContactError::DuplicateContact { .. }) => {
            let view = ContactFormView::new(&form, &ValidationErrors::new())
                .with_form_error(DUPLICATE_CONTACT_MESSAGE);
            Ok(unprocessable(ContactNewTemplate { form: view }))
        }
        Err(e) => Err(e.into()),
    }
}

/// Display the edit form for a contact.
#[instrument(skip(state), fields(contact_id = %id))]
pub async fn edit_page(
    State(state): State<AppState>,
    PagePath(id): PagePath<ContactId>,
) -> Result<ContactEditTemplate> {
    let contact = state.contacts().get_contact(id).await?;
    let form = ContactForm::from_contact(&contact);

    Ok(ContactEditTemplate {
        id,
        form: ContactFormView::new(&form, &ValidationErrors::new()),
    })
}

/// Handle the edit form.
///
/// Redirects to the list on success. Re-renders with `422` for invalid
/// input or a taken name, and with `409` and freshly loaded data when the
/// contact changed underneath the edit.
#[instrument(skip(state, pairs), fields(contact_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    PagePath(id): PagePath<ContactId>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response> {
    let form = ContactForm::from_pairs(pairs);

    let (name, edits) = match form.validate_edit() {
        Ok(valid) => valid,
        Err(errors) => {
            let view = ContactFormView::new(&form, &errors);
            return Ok(unprocessable(ContactEditTemplate { id, form: view }));
        }
    };

    match state.contacts().edit_contact(id, name, edits).await {
        Ok(_) => Ok(found("/contacts".to_string())),
        Err(ContactError::DuplicateContact { .. }) => {
            let view = ContactFormView::new(&form, &ValidationErrors::new())
                .with_form_error(DUPLICATE_CONTACT_MESSAGE);
            Ok(unprocessable(ContactEditTemplate { id, form: view }))
        }
        Err(ContactError::ConcurrencyConflict) => {
            let fresh = state.contacts().get_contact(id).await?;
            let view =
                ContactFormView::new(&ContactForm::from_contact(&fresh), &ValidationErrors::new())
                    .with_form_error(CONCURRENCY_CONFLICT_MESSAGE);
            Ok((StatusCode::CONFLICT, ContactEditTemplate { id, form: view }).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// Display the delete confirmation page.
#[instrument(skip(state), fields(contact_id = %id))]
pub async fn delete_page(
    State(state): State<AppState>,
    PagePath(id): PagePath<ContactId>,
) -> Result<ContactDeleteTemplate> {
    let contact = state.contacts().get_contact(id).await?;
    Ok(ContactDeleteTemplate { contact })
}

/// Delete a contact and redirect to the list.
///
/// Deleting a contact that is already gone still redirects.
#[instrument(skip(state), fields(contact_id = %id))]
pub async fn destroy(
    State(state): State<AppState>,
    PagePath(id): PagePath<ContactId>,
) -> Result<Response> {
    state.contacts().delete_contact(id).await?;
    Ok(found("/contacts".to_string()))
}

fn unprocessable(page: impl IntoResponse) -> Response {
    (StatusCode::UNPROCESSABLE_ENTITY, page).into_response()
}
