use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use marquee_reserve::ReserveError;
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    AuthorizationError(String),
    ValidationError(String),
    NotFoundError(String),
    ConflictError(String),
    GoneError(String),
    ServiceUnavailableError(String),
    InternalServerError(String),
    Anyhow(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::AuthorizationError(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::ConflictError(msg) => (StatusCode::CONFLICT, msg),
            AppError::GoneError(msg) => (StatusCode::GONE, msg),
            AppError::ServiceUnavailableError(msg) => {
                tracing::error!("Service unavailable: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, "Service temporarily unavailable".to_string())
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::Anyhow(err.into())
    }
}

/// Map engine results onto HTTP semantics. Business rejections keep their
/// message; storage problems hide details behind a 503.
pub fn reserve_error(err: ReserveError) -> AppError {
    match err {
        ReserveError::NotFound(what) => AppError::NotFoundError(what),
        ReserveError::InvalidInput(msg) => AppError::ValidationError(msg),
        ReserveError::StorageUnavailable(msg) => AppError::ServiceUnavailableError(msg),
        conflict @ (ReserveError::InsufficientAvailability { .. }
        | ReserveError::AlreadyFinalized
        | ReserveError::InvalidTransition { .. }) => AppError::ConflictError(conflict.to_string()),
        forbidden @ ReserveError::Forbidden => AppError::AuthorizationError(forbidden.to_string()),
        expired @ ReserveError::Expired => AppError::GoneError(expired.to_string()),
    }
}
