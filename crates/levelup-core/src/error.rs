//! Error types for levelup.

use serde::{Deserialize, Serialize};

use crate::ids::IdError;

/// Result type for levelup operations.
pub type Result<T> = std::result::Result<T, GamificationError>;

/// The fixed failure taxonomy every operation reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Reading from storage failed or the stored value could not be decoded.
    LoadFailed,

    /// Writing to storage failed.
    SaveFailed,

    /// The requested record does not exist for the owner.
    NotFound,

    /// The request conflicts with the record's state or carries invalid input.
    InvalidData,

    /// A composite operation could not be completed.
    OperationFailed,
}

impl ErrorCode {
    /// The wire representation of the code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LoadFailed => "LOAD_FAILED",
            Self::SaveFailed => "SAVE_FAILED",
            Self::NotFound => "NOT_FOUND",
            Self::InvalidData => "INVALID_DATA",
            Self::OperationFailed => "OPERATION_FAILED",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur in levelup operations.
#[derive(Debug, thiserror::Error)]
pub enum GamificationError {
    /// Loading a stored collection failed.
    #[error("failed to load {key}: {message}")]
    LoadFailed {
        /// Storage key that was being read.
        key: String,
        /// Underlying failure.
        message: String,
    },

    /// Persisting a collection failed.
    #[error("failed to save {key}: {message}")]
    SaveFailed {
        /// Storage key that was being written.
        key: String,
        /// Underlying failure.
        message: String,
    },

    /// A record was not found.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of record (e.g. `achievement`).
        entity: &'static str,
        /// Identifier that was looked up.
        id: String,
    },

    /// The operation was rejected because of the record's state or its input.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// A composite operation failed part-way.
    #[error("operation failed: {0}")]
    OperationFailed(String),

    /// An identifier could not be parsed.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),
}

impl GamificationError {
    /// Build a not-found error for the given record kind.
    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// The taxonomy code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::LoadFailed { .. } => ErrorCode::LoadFailed,
            Self::SaveFailed { .. } => ErrorCode::SaveFailed,
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::InvalidData(_) | Self::InvalidId(_) => ErrorCode::InvalidData,
            Self::OperationFailed(_) => ErrorCode::OperationFailed,
        }
    }

    /// Whether the error is a recoverable not-found outcome.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
