//! Application state shared across handlers.

use std::sync::Arc;

use crate::db::ContactStore;
use crate::services::ContactService;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the contact store and the service built on it.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    store: Arc<dyn ContactStore>,
    contacts: ContactService,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `store` - Contact store (`PostgreSQL` in production)
    #[must_use]
    pub fn new(store: Arc<dyn ContactStore>) -> Self {
        let contacts = ContactService::new(Arc::clone(&store));

        Self {
            inner: Arc::new(AppStateInner {
                store,
                contacts,
            }),
        }
    }

    /// Get a reference to the contact store.
    #[must_use]
    pub fn store(&self) -> &dyn ContactStore {
        self.inner.store.as_ref()
    }

    /// Get a reference to the contact service.
    #[must_use]
    pub fn contacts(&self) -> &ContactService {
        &self.inner.contacts
    }
}
