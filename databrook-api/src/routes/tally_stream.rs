use super::db_error;
use crate::state::ApiState;
use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use databrook_app::domain::VideoId;
use databrook_errors::AppError;
use futures::{future, stream, Stream, StreamExt};

/// Server-sent events of tally changes for one video.
///
/// The current tally is sent first so a fresh subscriber starts from truth;
/// the subscription is opened before it is read, so nothing falls in between.
pub async fn tally_stream(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, AppError> {
    let video_id = VideoId(id);
    let updates = state.app.tally_hub.stream(video_id);

    let current = state
        .app
        .video_repo
        .find_by_id(id)
        .await
        .map_err(db_error)?
        .ok_or(AppError::NotFound)?
        .tally_push();

    tracing::debug!(video_id = %video_id, "tally stream opened");

    let events = stream::once(future::ready(current))
        .chain(updates)
        .map(|push| Event::default().event("tally").json_data(push));

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
