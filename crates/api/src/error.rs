//! Converts domain error enums to axum responses (§7), the way the
//! teacher's `ApiError` wrapper in `src/github.rs` converts `AuthError`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::errors::DomainError;
use serde::Serialize;

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

pub(crate) struct ApiError(DomainError);

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self.0 {
            DomainError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            DomainError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg),
            DomainError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            DomainError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            DomainError::AuthExpired(msg) => (StatusCode::FORBIDDEN, "auth_expired", msg),
            DomainError::ExternalService(msg) => (StatusCode::BAD_GATEWAY, "external_service", msg),
            DomainError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal", msg),
        };

        (status, Json(ErrorBody { error, message })).into_response()
    }
}
