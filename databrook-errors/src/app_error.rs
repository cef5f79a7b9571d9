use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum AppError {
    #[error("sign-in required")]
    NotAuthenticated,

    #[error("a vote on this video is still settling")]
    AlreadyPending,

    #[error("failed to persist vote: {0}")]
    RemotePersistFailure(String),

    #[error("failed to read vote: {0}")]
    RemoteReadFailure(String),

    #[error("video {0} is not selected")]
    VideoNotSelected(i64),

    #[error("viewer does not match the signed-in session")]
    Forbidden,

    #[error("not found")]
    NotFound,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn user_message(&self) -> &str {
        match self {
            Self::NotAuthenticated => "Please sign in to vote.",
            Self::AlreadyPending => "Your previous vote is still being saved.",
            Self::RemotePersistFailure(_) => "Your vote could not be saved. Please try again.",
            Self::RemoteReadFailure(_) => "Could not load your vote.",
            Self::VideoNotSelected(_) => "Select a video before voting.",
            Self::Forbidden => "You can only change your own votes.",
            Self::NotFound => "Not found.",
            Self::InvalidInput(_) => "The request was not understood.",
            Self::Database(_) | Self::Internal(_) => "Something went wrong on our side. Please try again later.",
        }
    }

    /// Duplicate clicks are swallowed; everything else is reported to the viewer.
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, Self::AlreadyPending)
    }

    /// Stable machine-readable identifier, used in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotAuthenticated => "not_authenticated",
            Self::AlreadyPending => "already_pending",
            Self::RemotePersistFailure(_) => "remote_persist_failure",
            Self::RemoteReadFailure(_) => "remote_read_failure",
            Self::VideoNotSelected(_) => "video_not_selected",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
            Self::InvalidInput(_) => "invalid_input",
            Self::Database(_) => "database",
            Self::Internal(_) => "internal",
        }
    }
}

#[cfg(feature = "server")]
mod server_impl {
    use super::AppError;
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use axum::Json;

    #[derive(serde::Serialize)]
    struct ErrorResponse {
        code: &'static str,
        message: String,
    }

    impl AppError {
        pub fn status_code(&self) -> StatusCode {
            match self {
                AppError::NotAuthenticated => StatusCode::UNAUTHORIZED,
                AppError::AlreadyPending => StatusCode::CONFLICT,
                AppError::RemotePersistFailure(_) | AppError::RemoteReadFailure(_) => {
                    StatusCode::BAD_GATEWAY
                }
                AppError::VideoNotSelected(_) | AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                AppError::Forbidden => StatusCode::FORBIDDEN,
                AppError::NotFound => StatusCode::NOT_FOUND,
                AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            }
        }
    }

    impl IntoResponse for AppError {
        fn into_response(self) -> Response {
            let status = self.status_code();
            let message = match &self {
                // Storage details stay in the logs.
                AppError::Database(_) | AppError::Internal(_) => self.user_message().to_string(),
                _ => self.to_string(),
            };
            (status, Json(ErrorResponse { code: self.code(), message })).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_is_silent() {
        assert!(!AppError::AlreadyPending.is_user_visible());
        assert!(AppError::NotAuthenticated.is_user_visible());
        assert!(AppError::RemotePersistFailure("timeout".into()).is_user_visible());
    }

    #[test]
    fn test_sign_in_prompt() {
        assert_eq!(AppError::NotAuthenticated.user_message(), "Please sign in to vote.");
    }

    #[test]
    fn test_codes_are_distinct_for_read_and_persist() {
        assert_ne!(
            AppError::RemoteReadFailure(String::new()).code(),
            AppError::RemotePersistFailure(String::new()).code()
        );
    }
}
