//! Document persistence with transparent field encryption.
//!
//! [`EncryptedRepository`] sits between business logic and a
//! [`DocumentStore`]. Sensitive fields, named per collection by the policy
//! registry, are sealed before every write and opened after every read.

pub mod document;
pub mod hooks;
pub mod repository;
pub mod store;

pub use document::Document;
pub use hooks::FieldHooks;
pub use repository::{EncryptedRepository, RepositoryError};
pub use store::{DocumentStore, MemoryStore, StoreError};

use common::ServiceError;

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Store(StoreError::Duplicate(_)) => ServiceError::Conflict(err.to_string()),
            RepositoryError::Store(
                StoreError::InvalidId | StoreError::UnsupportedUpdate(_) | StoreError::ImmutableField(_),
            )
            | RepositoryError::EncryptedFilter(_)
            | RepositoryError::MissingId => ServiceError::BadRequest(err.to_string()),
            RepositoryError::NotFound(_) => ServiceError::NotFound(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_errors_map_to_service_errors() {
        let cases = [
            (RepositoryError::Store(StoreError::Duplicate("u1".into())), 409),
            (RepositoryError::Store(StoreError::InvalidId), 400),
            (RepositoryError::Store(StoreError::UnsupportedUpdate("$inc".into())), 400),
            (RepositoryError::Store(StoreError::ImmutableField("_id".into())), 400),
            (RepositoryError::EncryptedFilter("email".into()), 400),
            (RepositoryError::MissingId, 400),
            (RepositoryError::NotFound("u1".into()), 404),
        ];
        for (err, status) in cases {
            assert_eq!(ServiceError::from(err).http_status(), status);
        }
    }
}
