//! Storage layer for levelup.
//!
//! This crate provides persistence for the gamification records:
//!
//! - [`KeyValueStore`]: the string key/value contract every backend implements
//! - [`RocksStore`]: the persistent backend, one column family for every collection
//! - [`MemoryStore`]: a process-local backend for tests and embedding
//! - [`GamificationRepository`]: the stateless query/command surface that keeps each
//!   collection as one JSON blob under a namespaced key
//!
//! # Example
//!
//! ```
//! use levelup_core::{PointGrant, UserId};
//! use levelup_store::{GamificationRepository, MemoryStore};
//!
//! let repo = GamificationRepository::new(MemoryStore::new());
//! let user = UserId::new("user-1").unwrap();
//!
//! repo.add_points(&user, PointGrant::new(100, "welcome")).unwrap();
//! let balance = repo.load_point_balance(&user).unwrap();
//! assert_eq!(balance.total, 100);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

use std::sync::Arc;

pub mod error;
pub mod keys;
pub mod memory;
pub mod repository;
pub mod rocks;
pub mod schema;

pub use error::{Result, StoreError};
pub use keys::{KeySpace, DEFAULT_NAMESPACE};
pub use memory::MemoryStore;
pub use repository::GamificationRepository;
pub use rocks::RocksStore;

/// The storage contract used by the repository.
///
/// Values are opaque strings. Implementations must be safe to share across threads.
pub trait KeyValueStore: Send + Sync {
    // =========================================================================
    // Read Operations
    // =========================================================================

    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>>;

    // =========================================================================
    // Write Operations
    // =========================================================================

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete `key`. Deleting a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<()>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}
