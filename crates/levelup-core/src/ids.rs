//! Identifier types for levelup.
//!
//! Every identifier is a validated string. Owner and entity ids come from the host
//! application; ledger and claim ids are generated here as ULIDs so that they sort
//! chronologically.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Separator used between the segments of a storage key.
pub const KEY_SEPARATOR: char = ':';

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Create an identifier from a caller-provided value.
            ///
            /// # Errors
            ///
            /// Returns an error if the value is blank or contains the key separator.
            pub fn new(value: impl Into<String>) -> Result<Self, IdError> {
                let value = value.into();
                validate(&value)?;
                Ok(Self(value))
            }

            /// Generate a fresh, time-ordered identifier.
            #[must_use]
            pub fn generate() -> Self {
                Self(Ulid::new().to_string())
            }

            /// Return the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id! {
    /// The user that owns a storage partition.
    UserId
}

string_id! {
    /// An achievement identifier, unique within a user's achievements.
    AchievementId
}

string_id! {
    /// A point transaction identifier (ULID when generated, so newest sorts last).
    TransactionId
}

string_id! {
    /// A level record identifier.
    LevelId
}

string_id! {
    /// A streak identifier.
    StreakId
}

string_id! {
    /// A leaderboard identifier (e.g. `global`, `weekly`).
    LeaderboardId
}

string_id! {
    /// A leaderboard entry identifier.
    EntryId
}

string_id! {
    /// A reward identifier.
    RewardId
}

string_id! {
    /// A reward claim identifier.
    ClaimId
}

string_id! {
    /// A progress record identifier.
    ProgressId
}

impl UserId {
    /// The identifier of this user's level record (`{user_id}-level`).
    #[must_use]
    pub fn level_id(&self) -> LevelId {
        LevelId(format!("{}-level", self.0))
    }
}

fn validate(value: &str) -> Result<(), IdError> {
    if value.trim().is_empty() {
        return Err(IdError::Empty);
    }
    if value.contains(KEY_SEPARATOR) {
        return Err(IdError::ContainsSeparator(value.to_string()));
    }
    Ok(())
}

/// Errors that can occur when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The input is empty or whitespace only.
    #[error("identifier must not be empty")]
    Empty,

    /// The input contains the storage key separator.
    #[error("identifier must not contain ':': {0}")]
    ContainsSeparator(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_roundtrip() {
        let id = UserId::new("user-42").unwrap();
        let parsed = UserId::from_str(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
        assert_eq!(parsed.as_str(), "user-42");
    }

    #[test]
    fn rejects_blank_and_separator() {
        assert_eq!(UserId::new("   "), Err(IdError::Empty));
        assert!(matches!(
            AchievementId::new("a:b"),
            Err(IdError::ContainsSeparator(_))
        ));
    }

    #[test]
    fn serde_rejects_invalid_ids() {
        let parsed: Result<RewardId, _> = serde_json::from_str("\"\"");
        assert!(parsed.is_err());

        let id: RewardId = serde_json::from_str("\"badge-1\"").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"badge-1\"");
    }

    #[test]
    fn generated_ids_are_time_ordered() {
        let first = TransactionId::generate();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = TransactionId::generate();
        assert!(first < second);
    }
}
