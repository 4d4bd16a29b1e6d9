//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use common::ServiceError;

use crate::crypto::FieldCipher;
use crate::persistence::{DocumentStore, EncryptedRepository, FieldHooks};
use crate::policy::PolicyRegistry;

/// Application state shared across all request handlers.
///
/// All fields are cheaply cloneable (`Arc`-wrapped or already `Arc`-backed) so
/// that Axum can clone the state for each request without copying expensive data.
#[derive(Clone)]
pub struct AppState {
    /// Cipher bound to the process-wide key.
    pub cipher: FieldCipher,
    /// Backing document store. Holds sensitive fields as envelopes only.
    pub store: Arc<dyn DocumentStore>,
    /// Declared sensitive fields per collection.
    pub policies: PolicyRegistry,
    /// Largest request body the ingress filter will buffer.
    pub max_body_bytes: usize,
}

impl AppState {
    /// Create a new [`AppState`].
    pub fn new(
        cipher: FieldCipher,
        store: Arc<dyn DocumentStore>,
        policies: PolicyRegistry,
        max_body_bytes: usize,
    ) -> Self {
        Self {
            cipher,
            store,
            policies,
            max_body_bytes,
        }
    }

    /// Repository for `collection` with its declared field hooks.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] if `collection` has no policy.
    pub fn repository(&self, collection: &str) -> Result<EncryptedRepository, ServiceError> {
        let fields = self.policies.get(collection)?;
        Ok(EncryptedRepository::new(
            self.store.clone(),
            collection,
            FieldHooks::new(self.cipher.clone(), fields),
        ))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::crypto::cipher::tests::test_cipher;
    use crate::persistence::MemoryStore;

    /// State over an empty [`MemoryStore`] with the embedded policy.
    pub(crate) fn test_state() -> AppState {
        AppState::new(
            test_cipher(),
            Arc::new(MemoryStore::new()),
            PolicyRegistry::load(None).unwrap(),
            1024 * 1024,
        )
    }

    #[test]
    fn repository_for_declared_collection() {
        let state = test_state();
        let repo = state.repository("users").unwrap();
        assert_eq!(repo.collection(), "users");
    }

    #[test]
    fn repository_for_unknown_collection_is_not_found() {
        let state = test_state();
        assert!(matches!(state.repository("pets"), Err(ServiceError::NotFound(_))));
    }
}
