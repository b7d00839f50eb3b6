use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use qfilter_core::CompileError;
use qfilter_lang::{PaginationError, ParseError, SortingError};
use serde_json::json;

/// API error type, rendered as `{"error": {"type", "message", "statusCode"}}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Compile(CompileError),

    #[error(transparent)]
    Sorting(#[from] SortingError),

    #[error(transparent)]
    Pagination(#[from] PaginationError),
}

impl From<CompileError> for ApiError {
    fn from(err: CompileError) -> Self {
        match err {
            CompileError::UnknownEntity(_) => ApiError::NotFound(err.to_string()),
            other => ApiError::Compile(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "notFound"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "badRequest"),
            ApiError::Parse(_) => (StatusCode::BAD_REQUEST, "parseError"),
            ApiError::Compile(_) => (StatusCode::BAD_REQUEST, "compileError"),
            ApiError::Sorting(_) => (StatusCode::BAD_REQUEST, "invalidSorting"),
            ApiError::Pagination(_) => (StatusCode::BAD_REQUEST, "invalidPagination"),
        };
        tracing::debug!(error_type, error = %self, "request rejected");

        let mut error = json!({
            "type": error_type,
            "message": self.to_string(),
            "statusCode": status.as_u16(),
        });
        if let ApiError::Parse(err) = &self {
            if let Some((line, column)) = err.position() {
                error["line"] = json!(line);
                error["column"] = json!(column);
            }
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}

/// Convenience type alias for route handlers.
pub type ApiResult<T> = Result<T, ApiError>;
