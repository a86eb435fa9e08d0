//! Form and JSON request bodies, validated into domain types.
//!
//! HTML forms post flat `application/x-www-form-urlencoded` pairs. Address
//! rows use indexed keys:
//!
//! ```text
//! first_name=Sayed
//! last_name=Ghoneim
//! addresses[0].id=3
//! addresses[0].street=123 Main St
//! addresses[0].city=Anytown
//! addresses[0].state=AN
//! addresses[0].postal_code=12345
//! addresses[0].delete=true
//! ```

use std::collections::BTreeMap;

use serde::Deserialize;

use contact_manager_core::{AddressId, PersonName, PostalAddress, ValidationErrors};

use crate::models::{AddressEdit, Contact};

/// Upper bound on addresses one contact form can save.
pub const MAX_ADDRESS_ROWS: usize = 50;

/// Error key for problems with the address list as a whole.
pub const ADDRESSES_FIELD: &str = "addresses";

/// A submitted contact form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactForm {
    pub first_name: String,
    pub last_name: String,
    /// Address rows, ordered by their submitted index.
    pub addresses: Vec<AddressForm>,
}

/// One address row of a contact form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressForm {
    /// Index used in the submitted field names.
    pub index: usize,
    /// Raw `id` value; empty for a new row.
    pub id: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub delete: bool,
}

impl AddressForm {
    /// A new row with nothing typed into it.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.id.trim().is_empty()
            && [&self.street, &self.city, &self.state, &self.postal_code]
                .iter()
                .all(|v| v.trim().is_empty())
    }

    fn prefix(&self) -> String {
        format!("addresses[{}]", self.index)
    }

    fn parse_id(&self, errors: &mut ValidationErrors) -> Option<AddressId> {
        let raw = self.id.trim();
        if raw.is_empty() {
            return None;
        }
        match raw.parse::<i32>() {
            Ok(id) if id > 0 => Some(AddressId::new(id)),
            _ => {
                errors.push(format!("{}.id", self.prefix()), "Invalid address ID");
                None
            }
        }
    }

    fn parse_postal(&self, errors: &mut ValidationErrors) -> Option<PostalAddress> {
        match PostalAddress::parse(&self.street, &self.city, &self.state, &self.postal_code) {
            Ok(postal) => Some(postal),
            Err(e) => {
                errors.extend_prefixed(&self.prefix(), e);
                None
            }
        }
    }
}

impl ContactForm {
    /// Build a form from submitted key/value pairs.
    ///
    /// Unknown keys are ignored. A checkbox may be posted alongside a hidden
    /// fallback value, so `delete` is set if any of its values is truthy.
    /// Rows keep their submitted order but are renumbered from zero, so
    /// gaps in the indexes do not matter.
    #[must_use]
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut form = Self::default();
        let mut rows: BTreeMap<usize, AddressForm> = BTreeMap::new();

        for (key, value) in pairs {
            match key.as_str() {
                "first_name" => form.first_name = value,
                "last_name" => form.last_name = value,
                _ => {
                    let Some((index, field)) = parse_address_key(&key) else {
                        continue;
                    };
                    let row = rows.entry(index).or_insert_with(|| AddressForm {
                        index,
                        ..AddressForm::default()
                    });
                    match field {
                        "id" => row.id = value,
                        "street" => row.street = value,
                        "city" => row.city = value,
                        "state" => row.state = value,
                        "postal_code" => row.postal_code = value,
                        "delete" => row.delete |= is_truthy(&value),
                        _ => {}
                    }
                }
            }
        }

        form.addresses = rows
            .into_values()
            .enumerate()
            .map(|(index, row)| AddressForm { index, ..row })
            .collect();
        form
    }

    /// Pre-fill the edit form from a stored contact.
    #[must_use]
    pub fn from_contact(contact: &Contact) -> Self {
        Self {
            first_name: contact.first_name().to_owned(),
            last_name: contact.last_name().to_owned(),
            addresses: contact
                .addresses
                .iter()
                .enumerate()
                .map(|(index, address)| AddressForm {
                    index,
                    id: address.id.to_string(),
                    street: address.postal.street().to_owned(),
                    city: address.postal.city().to_owned(),
                    state: address.postal.state().to_owned(),
                    postal_code: address.postal.postal_code().to_owned(),
                    delete: false,
                })
                .collect(),
        }
    }

    /// Index for an extra empty row after the submitted ones.
    #[must_use]
    pub fn next_index(&self) -> usize {
        self.addresses.last().map_or(0, |row| row.index + 1)
    }

    /// Number of rows the contact will own after saving: rows that are
    /// neither blank nor marked for deletion.
    #[must_use]
    pub fn kept_row_count(&self) -> usize {
        self.addresses
            .iter()
            .filter(|row| !row.delete && !row.is_blank())
            .count()
    }

    /// Whether another address row may be offered.
    #[must_use]
    pub fn has_room(&self) -> bool {
        self.kept_row_count() < MAX_ADDRESS_ROWS
    }

    fn check_row_limit(&self, errors: &mut ValidationErrors) {
        if self.kept_row_count() > MAX_ADDRESS_ROWS {
            errors.push(
                ADDRESSES_FIELD,
                format!("A contact can have at most {MAX_ADDRESS_ROWS} addresses"),
            );
        }
    }

    /// Validate for creating a contact.
    ///
    /// Blank rows and rows marked for deletion are skipped. Row IDs are
    /// ignored since a new contact owns nothing yet. More than
    /// [`MAX_ADDRESS_ROWS`] remaining rows is an error.
    ///
    /// # Errors
    ///
    /// Returns every failing field, keyed by its form name.
    pub fn validate_new(&self) -> Result<(PersonName, Vec<PostalAddress>), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let name = self.parse_name(&mut errors);
        self.check_row_limit(&mut errors);

        let addresses: Vec<PostalAddress> = self
            .addresses
            .iter()
            .filter(|row| !row.delete && !row.is_blank())
            .filter_map(|row| row.parse_postal(&mut errors))
            .collect();

        match name {
            Some(name) => errors.into_result((name, addresses)),
            None => Err(errors),
        }
    }

    /// Validate for editing a contact.
    ///
    /// - row with an ID and `delete` set: remove it (fields not checked)
    /// - row with an ID: update it
    /// - row without an ID: add it, unless blank or marked for deletion
    ///
    /// More than [`MAX_ADDRESS_ROWS`] remaining rows is an error.
    ///
    /// # Errors
    ///
    /// Returns every failing field, keyed by its form name.
    pub fn validate_edit(&self) -> Result<(PersonName, Vec<AddressEdit>), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let name = self.parse_name(&mut errors);
        self.check_row_limit(&mut errors);

        let mut edits = Vec::with_capacity(self.addresses.len());
        for row in &self.addresses {
            let id = row.parse_id(&mut errors);
            match (id, row.delete) {
                (Some(id), true) => edits.push(AddressEdit::Remove(id)),
                (Some(id), false) => {
                    if let Some(postal) = row.parse_postal(&mut errors) {
                        edits.push(AddressEdit::Update { id, postal });
                    }
                }
                (None, true) => {}
                (None, false) => {
                    if row.is_blank() {
                        continue;
                    }
                    if let Some(postal) = row.parse_postal(&mut errors) {
                        edits.push(AddressEdit::Add(postal));
                    }
                }
            }
        }

        match name {
            Some(name) => errors.into_result((name, edits)),
            None => Err(errors),
        }
    }

    fn parse_name(&self, errors: &mut ValidationErrors) -> Option<PersonName> {
        match PersonName::parse(&self.first_name, &self.last_name) {
            Ok(name) => Some(name),
            Err(e) => {
                for error in e {
                    errors.push(error.field, error.message);
                }
                None
            }
        }
    }
}

/// JSON body for `POST /addresses/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddressPayload {
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub postal_code: String,
}

impl AddressPayload {
    /// Validate into a postal address.
    ///
    /// # Errors
    ///
    /// Returns errors keyed `street`, `city`, `state`, `postal_code`.
    pub fn validate(&self) -> Result<PostalAddress, ValidationErrors> {
        PostalAddress::parse(&self.street, &self.city, &self.state, &self.postal_code)
    }
}

/// Split `addresses[3].city` into `(3, "city")`.
fn parse_address_key(key: &str) -> Option<(usize, &str)> {
    let rest = key.strip_prefix("addresses[")?;
    let (index, field) = rest.split_once("].")?;
    Some((index.parse().ok()?, field))
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "on" | "1" | "yes"
    )
}
