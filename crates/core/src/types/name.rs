//! Contact person name.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::validation::{ValidationErrors, required_text};

/// A contact's first and last name.
///
/// Both parts are required and stored trimmed. Two contacts with exactly the
/// same first and last name (case-sensitive) are considered duplicates.
///
/// ## Examples
///
/// ```
/// use contact_manager_core::PersonName;
///
/// let name = PersonName::parse("  Sayed ", "Ghoneim").unwrap();
/// assert_eq!(name.first_name(), "Sayed");
///
/// assert!(PersonName::parse("", "Ghoneim").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawName")]
pub struct PersonName {
    first_name: String,
    last_name: String,
}

impl PersonName {
    /// Maximum length of each name part.
    pub const MAX_LENGTH: usize = 100;

    /// Parse and validate a name.
    ///
    /// # Errors
    ///
    /// Returns errors keyed `first_name` / `last_name` when a part is blank
    /// or longer than [`Self::MAX_LENGTH`] characters.
    pub fn parse(first_name: &str, last_name: &str) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let first_name = required_text(
            &mut errors,
            "first_name",
            "First name",
            first_name,
            Self::MAX_LENGTH,
        );
        let last_name = required_text(
            &mut errors,
            "last_name",
            "Last name",
            last_name,
            Self::MAX_LENGTH,
        );
        errors.into_result(Self {
            first_name,
            last_name,
        })
    }

    /// Build a name from values already validated by the store.
    #[must_use]
    pub const fn from_trusted(first_name: String, last_name: String) -> Self {
        Self {
            first_name,
            last_name,
        }
    }

    /// Returns the first name.
    #[must_use]
    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    /// Returns the last name.
    #[must_use]
    pub fn last_name(&self) -> &str {
        &self.last_name
    }
}

/// Unvalidated name as it arrives in a request body.
#[derive(Deserialize)]
struct RawName {
    first_name: String,
    last_name: String,
}

impl TryFrom<RawName> for PersonName {
    type Error = ValidationErrors;

    fn try_from(raw: RawName) -> Result<Self, Self::Error> {
        Self::parse(&raw.first_name, &raw.last_name)
    }
}

impl fmt::Display for PersonName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.first_name, self.last_name)
    }
}
