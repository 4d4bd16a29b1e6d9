//! Field names that are never encrypted.
//!
//! Identifiers and timestamps are used for lookups, joins, and sort order, so
//! they must survive every transform in plaintext. Both runtimes use this exact
//! set in skip-list mode.

/// Document identifier.
pub const ID: &str = "_id";

/// Creation timestamp.
pub const CREATED_AT: &str = "createdAt";

/// Last-update timestamp.
pub const UPDATED_AT: &str = "updatedAt";

/// The fixed exclusion set applied in skip-list mode.
pub const SKIP_FIELDS: &[&str] = &[ID, "id", CREATED_AT, UPDATED_AT, "__v"];

/// Returns `true` if `field` is in [`SKIP_FIELDS`].
pub fn is_skipped(field: &str) -> bool {
    SKIP_FIELDS.contains(&field)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_and_timestamps_are_skipped() {
        for f in ["_id", "id", "createdAt", "updatedAt", "__v"] {
            assert!(is_skipped(f), "{f} should be skipped");
        }
    }

    #[test]
    fn matching_is_exact() {
        assert!(!is_skipped("name"));
        assert!(!is_skipped("userId"));
        assert!(!is_skipped("ID"));
        assert!(!is_skipped("created_at"));
    }
}
