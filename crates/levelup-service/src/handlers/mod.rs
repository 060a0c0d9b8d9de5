//! HTTP request handlers.

pub mod achievements;
pub mod health;
pub mod leaderboards;
pub mod levels;
pub mod points;
pub mod progress;
pub mod rewards;
pub mod snapshot;
pub mod streaks;

use std::str::FromStr;

use levelup_core::IdError;

use crate::error::ApiError;

/// Parse an identifier taken from the request path.
pub(crate) fn parse_id<T>(raw: &str) -> Result<T, ApiError>
where
    T: FromStr<Err = IdError>,
{
    raw.parse::<T>().map_err(ApiError::from)
}
