use super::db_error;
use super::session::{session_error, session_viewer, USER_ID_KEY};
use crate::state::ApiState;
use axum::extract::{Query, State};
use axum::response::Redirect;
use axum::Json;
use databrook_app::domain::User;
use databrook_errors::AppError;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

const CSRF_KEY: &str = "oauth_csrf";
const PKCE_KEY: &str = "oauth_pkce";

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    code: String,
    state: String,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    authenticated: bool,
    user: Option<User>,
}

pub async fn login(State(state): State<ApiState>, session: Session) -> Result<Redirect, AppError> {
    let oauth = state.oauth.as_ref().ok_or(AppError::NotFound)?;
    let request = oauth.begin_sign_in();

    session
        .insert(CSRF_KEY, &request.csrf_state)
        .await
        .map_err(session_error)?;
    session
        .insert(PKCE_KEY, &request.pkce_verifier)
        .await
        .map_err(session_error)?;

    Ok(Redirect::to(&request.auth_url))
}

pub async fn callback(
    State(state): State<ApiState>,
    session: Session,
    Query(query): Query<CallbackQuery>,
) -> Result<Redirect, AppError> {
    let oauth = state.oauth.as_ref().ok_or(AppError::NotFound)?;

    let expected: Option<String> = session.remove(CSRF_KEY).await.map_err(session_error)?;
    let verifier: Option<String> = session.remove(PKCE_KEY).await.map_err(session_error)?;
    let (Some(expected), Some(verifier)) = (expected, verifier) else {
        return Err(AppError::InvalidInput("sign-in was not started".to_string()));
    };
    if expected != query.state {
        tracing::warn!("OAuth state mismatch");
        return Err(AppError::Forbidden);
    }

    let profile = oauth.complete_sign_in(&query.code, verifier).await?;
    let user = state
        .app
        .user_repo
        .upsert(&profile.into_user())
        .await
        .map_err(db_error)?;

    let viewer = user.viewer_id();
    session.cycle_id().await.map_err(session_error)?;
    session
        .insert(USER_ID_KEY, viewer)
        .await
        .map_err(session_error)?;
    tracing::info!(viewer = %viewer, "viewer signed in");

    Ok(Redirect::to("/"))
}

pub async fn logout(session: Session) -> Result<Redirect, AppError> {
    if let Some(viewer) = session_viewer(&session).await? {
        tracing::info!(viewer = %viewer, "viewer signed out");
    }
    session.flush().await.map_err(session_error)?;
    Ok(Redirect::to("/"))
}

pub async fn me(State(state): State<ApiState>, session: Session) -> Result<Json<MeResponse>, AppError> {
    let user = match session_viewer(&session).await? {
        Some(viewer) => state.app.user_repo.find_by_id(viewer.0).await.map_err(db_error)?,
        None => None,
    };
    Ok(Json(MeResponse {
        authenticated: user.is_some(),
        user,
    }))
}
