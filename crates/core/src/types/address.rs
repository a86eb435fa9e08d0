//! Postal address value type.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::validation::{ValidationErrors, required_text};

/// The four text fields of a postal address, without identity or owner.
///
/// Equality compares all four fields exactly (case-sensitive). This is the
/// equality used to decide whether an incoming address matches one already
/// stored.
///
/// ## Examples
///
/// ```
/// use contact_manager_core::PostalAddress;
///
/// let a = PostalAddress::parse("123 Main St", "Anytown", "AN", "12345").unwrap();
/// let b = PostalAddress::parse("123 Main St ", "Anytown", "AN", "12345").unwrap();
/// assert_eq!(a, b); // trimmed before comparison
///
/// assert!(PostalAddress::parse("123 Main St", "", "AN", "12345").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawPostalAddress")]
pub struct PostalAddress {
    street: String,
    city: String,
    state: String,
    postal_code: String,
}

impl PostalAddress {
    /// Maximum length of any single field.
    pub const MAX_LENGTH: usize = 200;

    /// Parse and validate an address.
    ///
    /// # Errors
    ///
    /// Returns errors keyed `street`, `city`, `state`, `postal_code` for each
    /// field that is blank or too long.
    pub fn parse(
        street: &str,
        city: &str,
        state: &str,
        postal_code: &str,
    ) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let max = Self::MAX_LENGTH;
        let street = required_text(&mut errors, "street", "Street", street, max);
        let city = required_text(&mut errors, "city", "City", city, max);
        let state = required_text(&mut errors, "state", "State", state, max);
        let postal_code =
            required_text(&mut errors, "postal_code", "Postal code", postal_code, max);
        errors.into_result(Self {
            street,
            city,
            state,
            postal_code,
        })
    }

    /// Build an address from values already validated by the store.
    #[must_use]
    pub const fn from_trusted(
        street: String,
        city: String,
        state: String,
        postal_code: String,
    ) -> Self {
        Self {
            street,
            city,
            state,
            postal_code,
        }
    }

    /// Returns the street line.
    #[must_use]
    pub fn street(&self) -> &str {
        &self.street
    }

    /// Returns the city.
    #[must_use]
    pub fn city(&self) -> &str {
        &self.city
    }

    /// Returns the state or region.
    #[must_use]
    pub fn state(&self) -> &str {
        &self.state
    }

    /// Returns the postal code.
    #[must_use]
    pub fn postal_code(&self) -> &str {
        &self.postal_code
    }

    /// Returns `true` if any field contains `needle_lower` (already lowercased).
    #[must_use]
    pub fn contains_lowercase(&self, needle_lower: &str) -> bool {
        [&self.street, &self.city, &self.state, &self.postal_code]
            .iter()
            .any(|field| field.to_lowercase().contains(needle_lower))
    }
}

/// Unvalidated address as it arrives in a request body.
#[derive(Deserialize)]
struct RawPostalAddress {
    #[serde(default)]
    street: String,
    #[serde(default)]
    city: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    postal_code: String,
}

impl TryFrom<RawPostalAddress> for PostalAddress {
    type Error = ValidationErrors;

    fn try_from(raw: RawPostalAddress) -> Result<Self, Self::Error> {
        Self::parse(&raw.street, &raw.city, &raw.state, &raw.postal_code)
    }
}

impl fmt::Display for PostalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}, {} {}",
            self.street, self.city, self.state, self.postal_code
        )
    }
}
