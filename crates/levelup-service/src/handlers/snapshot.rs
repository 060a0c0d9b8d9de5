//! Snapshot handler.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;

use levelup_core::UserId;

use super::parse_id;
use crate::error::ApiError;
use crate::session::{GamificationSession, GamificationSnapshot};
use crate::state::AppState;

/// Load everything shown for one user.
pub async fn get_snapshot(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<GamificationSnapshot>, ApiError> {
    let user_id: UserId = parse_id(&user_id)?;
    let mut session = GamificationSession::new(&state.orchestrator, user_id);
    let snapshot = session.initialize()?.clone();
    Ok(Json(snapshot))
}
