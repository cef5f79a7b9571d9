use super::db_error;
use crate::state::ApiState;
use axum::extract::{Path, State};
use axum::Json;
use databrook_app::domain::OutcomePlaylist;
use databrook_errors::AppError;

/// Outcome with its videos, most upvoted first. The first video is the default selection.
pub async fn outcome_playlist(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<Json<OutcomePlaylist>, AppError> {
    state
        .app
        .outcome_repo
        .find_playlist(id, &state.app.video_repo)
        .await
        .map_err(db_error)?
        .map(Json)
        .ok_or(AppError::NotFound)
}
