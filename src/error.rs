use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::dao::storage::StorageError;

/// Failures produced by the service layer, independent of HTTP.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The storage backend rejected or never received the call.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// No store is installed; the supervisor is still reconnecting.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// Missing or unusable credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Authenticated, but the role does not allow the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// The operation does not apply to the round in its current phase.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// The addressed round or user does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// A guarantee the storage layer should uphold did not hold.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Unavailable { .. } => ServiceError::Unavailable(err),
            StorageError::Conflict { message } => ServiceError::InvalidState(message),
            StorageError::Inconsistent { message } => ServiceError::Internal(message),
        }
    }
}

/// Errors rendered to clients as `{"error": "..."}` with a matching status.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed or invalid request payload.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Credentials are missing or wrong.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Authenticated but not allowed.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// Nothing lives at the addressed resource.
    #[error("not found: {0}")]
    NotFound(String),
    /// The request races the round lifecycle.
    #[error("conflict: {0}")]
    Conflict(String),
    /// The backend cannot persist anything right now.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// An invariant broke; nothing the client can fix.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Degraded => AppError::ServiceUnavailable("degraded mode".into()),
            ServiceError::Unauthorized(message) => AppError::Unauthorized(message),
            ServiceError::Forbidden(message) => AppError::Forbidden(message),
            ServiceError::InvalidState(message) => AppError::Conflict(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::Internal(message) => AppError::Internal(message),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {err}"))
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let body = Json(ErrorBody {
            error: self.to_string(),
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::body;
    use serde_json::Value;

    use super::*;

    #[tokio::test]
    async fn responses_carry_the_error_key() {
        let response = AppError::NotFound("round gone".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["error"], "not found: round gone");
    }

    #[tokio::test]
    async fn degraded_mode_renders_as_service_unavailable() {
        let response = AppError::from(ServiceError::Degraded).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["error"], "service unavailable: degraded mode");
    }
}
