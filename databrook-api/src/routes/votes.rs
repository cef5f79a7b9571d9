use super::session::{authorize, session_viewer};
use crate::state::ApiState;
use axum::extract::{Path, State};
use axum::Json;
use databrook_app::domain::{TallyPush, VideoId, ViewerId, VoteMark};
use databrook_errors::AppError;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct MarkBody {
    pub mark: Option<VoteMark>,
}

#[derive(Debug, Deserialize)]
pub struct UpsertBody {
    pub mark: VoteMark,
}

pub async fn read_mark(
    State(state): State<ApiState>,
    session: Session,
    Path((viewer, video)): Path<(Uuid, i64)>,
) -> Result<Json<MarkBody>, AppError> {
    let viewer = authorize(session_viewer(&session).await?, ViewerId(viewer))?;
    let mark = state.app.vote_store.read_mark(viewer, VideoId(video)).await?;
    Ok(Json(MarkBody { mark }))
}

pub async fn upsert_mark(
    State(state): State<ApiState>,
    session: Session,
    Path((viewer, video)): Path<(Uuid, i64)>,
    Json(body): Json<UpsertBody>,
) -> Result<Json<TallyPush>, AppError> {
    let viewer = authorize(session_viewer(&session).await?, ViewerId(viewer))?;
    let push = state
        .app
        .vote_store
        .upsert_mark(viewer, VideoId(video), body.mark)
        .await
        .inspect_err(|e| tracing::warn!(viewer = %viewer, video_id = video, error = %e, "vote upsert failed"))?;
    tracing::info!(viewer = %viewer, video_id = video, mark = ?body.mark, revision = push.revision, "vote recorded");
    Ok(Json(push))
}

pub async fn delete_mark(
    State(state): State<ApiState>,
    session: Session,
    Path((viewer, video)): Path<(Uuid, i64)>,
) -> Result<Json<TallyPush>, AppError> {
    let viewer = authorize(session_viewer(&session).await?, ViewerId(viewer))?;
    let push = state
        .app
        .vote_store
        .delete_mark(viewer, VideoId(video))
        .await
        .inspect_err(|e| tracing::warn!(viewer = %viewer, video_id = video, error = %e, "vote delete failed"))?;
    tracing::info!(viewer = %viewer, video_id = video, revision = push.revision, "vote removed");
    Ok(Json(push))
}
