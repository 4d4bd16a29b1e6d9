//! Per-collection sensitive field declarations.
//!
//! Loaded once at startup from a YAML (or JSON) document and never changed
//! afterwards. Lookups clone an `Arc`, so the hot path never copies a field set.

use std::{collections::BTreeMap, sync::Arc};

use common::fields;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use super::FieldSet;

/// Policy shipped with the binary, used when no policy file is configured.
const DEFAULT_POLICY: &str = include_str!("../../policy/default.yaml");

/// Errors from loading or querying the registry.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The policy file could not be read.
    #[error("failed to read field policy file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The policy text is neither valid YAML nor valid JSON.
    #[error("field policy is not valid YAML or JSON")]
    Parse,

    /// A collection declares an identifier or timestamp as sensitive.
    #[error("collection {collection}: {field} is an identifier or timestamp and cannot be encrypted")]
    SkippedField { collection: String, field: String },

    /// A collection declares an empty or operator-like field name.
    #[error("collection {collection}: {field:?} is not a plain field name")]
    InvalidField { collection: String, field: String },

    /// The requested collection has no declaration.
    #[error("unknown collection: {0}")]
    UnknownCollection(String),
}

#[derive(Debug, Deserialize)]
struct PolicyDocument {
    #[serde(default)]
    collections: BTreeMap<String, CollectionPolicy>,
}

#[derive(Debug, Deserialize)]
struct CollectionPolicy {
    #[serde(default)]
    sensitive: Vec<String>,
}

/// Read-only map from collection name to its allow-listed sensitive fields.
#[derive(Debug, Clone, Default)]
pub struct PolicyRegistry {
    collections: Arc<BTreeMap<String, Arc<FieldSet>>>,
}

impl PolicyRegistry {
    /// Load from `path` if given, otherwise from the embedded default policy.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or fails validation.
    pub fn load(path: Option<&str>) -> Result<Self, PolicyError> {
        let registry = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| PolicyError::Io {
                    path: path.to_owned(),
                    source,
                })?;
                Self::parse(&text)?
            }
            None => Self::parse(DEFAULT_POLICY)?,
        };
        info!(
            source = path.unwrap_or("embedded"),
            collections = ?registry.names().collect::<Vec<_>>(),
            "field policy loaded"
        );
        Ok(registry)
    }

    /// Parse and validate a policy document (YAML, falling back to JSON).
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::Parse`] for unparseable text, or a validation
    /// error for a forbidden field name.
    pub fn parse(text: &str) -> Result<Self, PolicyError> {
        let doc: PolicyDocument = if let Ok(parsed) = serde_yaml::from_str(text) {
            parsed
        } else if let Ok(parsed) = serde_json::from_str(text) {
            parsed
        } else {
            return Err(PolicyError::Parse);
        };

        let mut collections = BTreeMap::new();
        for (name, policy) in doc.collections {
            let mut set = FieldSet::new();
            for field in policy.sensitive {
                validate_field(&name, &field)?;
                set.insert(field);
            }
            collections.insert(name, Arc::new(set));
        }
        Ok(Self {
            collections: Arc::new(collections),
        })
    }

    /// Sensitive fields declared for `collection`.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::UnknownCollection`] if `collection` is not declared.
    pub fn get(&self, collection: &str) -> Result<Arc<FieldSet>, PolicyError> {
        self.collections
            .get(collection)
            .cloned()
            .ok_or_else(|| PolicyError::UnknownCollection(collection.to_owned()))
    }

    /// Declared collection names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }

    /// Number of declared collections.
    pub fn len(&self) -> usize {
        self.collections.len()
    }

    /// Returns `true` if no collections are declared.
    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }
}

fn validate_field(collection: &str, field: &str) -> Result<(), PolicyError> {
    if fields::is_skipped(field) {
        return Err(PolicyError::SkippedField {
            collection: collection.to_owned(),
            field: field.to_owned(),
        });
    }
    if field.trim().is_empty() || field.starts_with('$') || field.contains('.') {
        return Err(PolicyError::InvalidField {
            collection: collection.to_owned(),
            field: field.to_owned(),
        });
    }
    Ok(())
}
