//! Field-set policy: which fields of a payload are cipher candidates.
//!
//! # Modes
//!
//! - **Allow-list** ([`FieldPolicy::Allow`]): only the named keys are
//!   candidates; their whole subtree is transformed. Used by the persistence
//!   hooks with a collection's declared sensitive fields.
//! - **Skip-list** ([`FieldPolicy::Skip`]): every key is a candidate except the
//!   named ones, at any depth. Used at the HTTP boundary with
//!   [`common::fields::SKIP_FIELDS`].
//! - **All** ([`FieldPolicy::All`]): every string leaf.
//!
//! The per-collection allow-lists are loaded by [`registry::PolicyRegistry`].

pub mod registry;

pub use registry::{PolicyError, PolicyRegistry};

use std::collections::BTreeSet;

use common::{fields::SKIP_FIELDS, ServiceError};

/// A set of field names.
pub type FieldSet = BTreeSet<String>;

/// Selects which map keys a transform descends into.
#[derive(Debug, Clone, Copy)]
pub enum FieldPolicy<'a> {
    /// Every key.
    All,
    /// Only these keys; below them, everything.
    Allow(&'a FieldSet),
    /// Every key except these, at every depth.
    Skip(&'a [&'a str]),
}

impl<'a> FieldPolicy<'a> {
    /// Skip-list mode over the fixed identifier/timestamp exclusion set.
    pub fn skip_list() -> FieldPolicy<'static> {
        FieldPolicy::Skip(SKIP_FIELDS)
    }

    /// The policy to apply to the value under `key`, or `None` to leave that
    /// value untouched.
    pub fn descend(&self, key: &str) -> Option<FieldPolicy<'a>> {
        match *self {
            FieldPolicy::All => Some(FieldPolicy::All),
            FieldPolicy::Allow(fields) => fields.contains(key).then_some(FieldPolicy::All),
            FieldPolicy::Skip(skipped) => (!skipped.contains(&key)).then_some(*self),
        }
    }
}

impl From<PolicyError> for ServiceError {
    fn from(err: PolicyError) -> Self {
        match err {
            PolicyError::UnknownCollection(_) => ServiceError::NotFound(err.to_string()),
            _ => ServiceError::Internal(err.to_string()),
        }
    }
}
