mod auth;
mod playlist;
mod session;
mod tally_stream;
mod votes;

use crate::state::ApiState;
use axum::routing::{get, post};
use axum::Router;
use databrook_errors::AppError;

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/outcomes/{id}", get(playlist::outcome_playlist))
        .route(
            "/api/viewers/{viewer}/votes/{video}",
            get(votes::read_mark)
                .put(votes::upsert_mark)
                .delete(votes::delete_mark),
        )
        .route("/api/videos/{id}/tally/stream", get(tally_stream::tally_stream))
        .route("/auth/login", get(auth::login))
        .route("/auth/callback", get(auth::callback))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .with_state(state)
}

fn db_error(e: sea_orm::DbErr) -> AppError {
    tracing::error!("Database error: {}", e);
    AppError::Database(e.to_string())
}
