use databrook_app::domain::ViewerId;
use databrook_errors::AppError;
use tower_sessions::Session;
use uuid::Uuid;

pub const USER_ID_KEY: &str = "user_id";

pub fn session_error(e: tower_sessions::session::Error) -> AppError {
    tracing::error!("Session store error: {}", e);
    AppError::Internal(e.to_string())
}

pub async fn session_viewer(session: &Session) -> Result<Option<ViewerId>, AppError> {
    let user_id: Option<Uuid> = session.get(USER_ID_KEY).await.map_err(session_error)?;
    Ok(user_id.map(ViewerId))
}

/// Votes may only be read or written by the viewer they belong to.
pub fn authorize(signed_in: Option<ViewerId>, requested: ViewerId) -> Result<ViewerId, AppError> {
    match signed_in {
        None => Err(AppError::NotAuthenticated),
        Some(viewer) if viewer == requested => Ok(viewer),
        Some(_) => Err(AppError::Forbidden),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorize() {
        let me = ViewerId(Uuid::from_u128(1));
        let other = ViewerId(Uuid::from_u128(2));

        assert_eq!(authorize(None, me), Err(AppError::NotAuthenticated));
        assert_eq!(authorize(Some(me), other), Err(AppError::Forbidden));
        assert_eq!(authorize(Some(me), me), Ok(me));
    }
}
