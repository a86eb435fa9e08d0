//! Business logic services.
//!
//! # Services
//!
//! - `contacts` - Contact create/edit/delete, each as one store transaction
//! - `reconciler` - Decides whether a submitted address reuses a stored row
//! - `seed` - Idempotent demo data

pub mod contacts;
pub mod reconciler;
pub mod seed;

pub use contacts::{ContactError, ContactService};
