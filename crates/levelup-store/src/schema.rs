//! `RocksDB` schema definitions.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Namespaced collection blobs, keyed by the full storage key.
    pub const COLLECTIONS: &str = "collections";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![cf::COLLECTIONS]
}
