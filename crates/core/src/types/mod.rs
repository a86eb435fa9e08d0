//! Core types for Contact Manager.
//!
//! This module provides type-safe wrappers for the contact domain.

pub mod address;
pub mod id;
pub mod name;
pub mod validation;

pub use address::PostalAddress;
pub use id::*;
pub use name::PersonName;
pub use validation::{FieldError, ValidationErrors};
