//! Error types for levelup storage backends.

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// A stored value is not valid UTF-8.
    #[error("invalid stored value for {key}: {message}")]
    Encoding {
        /// Key whose value could not be decoded.
        key: String,
        /// Decoder message.
        message: String,
    },

    /// An in-process lock was poisoned by a panicking writer.
    #[error("storage lock poisoned")]
    Poisoned,
}
