//! Levelup orchestration and HTTP API.
//!
//! This crate composes the repository into the effect chains a host application
//! needs, and exposes them over HTTP:
//!
//! - **Orchestrator** - unlock-and-award, level-up awards, guarded reward claims
//! - **Session** - per-user snapshot that refreshes after every mutation
//! - **HTTP API** - axum router over a shared [`AppState`]
//!
//! Storage is `RocksDB` by default, with an in-memory backend for ephemeral runs.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod orchestrator;
pub mod routes;
pub mod session;
pub mod state;

pub use config::{ServiceConfig, StorageBackend};
pub use error::ApiError;
pub use orchestrator::{
    GamificationEvent, Orchestrator, OrchestratorConfig, Outcome, ScoreSubmission,
    DEFAULT_LEVEL_UP_POINTS_PER_LEVEL,
};
pub use routes::create_router;
pub use session::{GamificationSession, GamificationSnapshot, RECENT_TRANSACTIONS};
pub use state::{AppState, SharedStore};
