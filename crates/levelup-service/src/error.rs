//! API error types and responses.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use levelup_core::{ErrorCode, GamificationError, IdError};

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A gamification operation failed.
    #[error(transparent)]
    Gamification(#[from] GamificationError),

    /// Bad request - malformed query string.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The JSON body was rejected.
    #[error("invalid body: {0}")]
    Unprocessable(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: ErrorCode,
    message: String,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Gamification(err) => match err.code() {
                ErrorCode::NotFound => StatusCode::NOT_FOUND,
                ErrorCode::InvalidData => StatusCode::BAD_REQUEST,
                ErrorCode::OperationFailed => StatusCode::CONFLICT,
                ErrorCode::LoadFailed | ErrorCode::SaveFailed => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    fn code(&self) -> ErrorCode {
        match self {
            Self::Gamification(err) => err.code(),
            Self::BadRequest(_) | Self::Unprocessable(_) => ErrorCode::InvalidData,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let message = match &self {
            Self::Gamification(
                err @ (GamificationError::LoadFailed { .. } | GamificationError::SaveFailed { .. }),
            ) => {
                tracing::error!(error = %err, "Storage failure");
                match code {
                    ErrorCode::LoadFailed => "Failed to load data".to_string(),
                    _ => "Failed to save data".to_string(),
                }
            }
            Self::Gamification(err) => err.to_string(),
            Self::BadRequest(msg) | Self::Unprocessable(msg) => msg.clone(),
        };

        let body = ErrorResponse {
            error: ErrorBody { code, message },
        };

        (status, Json(body)).into_response()
    }
}

impl From<IdError> for ApiError {
    fn from(err: IdError) -> Self {
        Self::Gamification(err.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Unprocessable(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}
