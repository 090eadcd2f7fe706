//! Translation of domain errors into HTTP responses with a `{"detail": ...}` body.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use shared::DetailResponse;
use tracing::error;

use crate::backend::domain::error::LoyaltyError;

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }

    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, detail)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<LoyaltyError> for ApiError {
    fn from(err: LoyaltyError) -> Self {
        let status = match &err {
            LoyaltyError::NotFound(_) => StatusCode::NOT_FOUND,
            LoyaltyError::InvalidCode(_)
            | LoyaltyError::ScopeMismatch
            | LoyaltyError::Forbidden(_) => StatusCode::FORBIDDEN,
            LoyaltyError::InvalidRequest(_) | LoyaltyError::InvalidPolicy(_) => StatusCode::BAD_REQUEST,
            LoyaltyError::Conflict(_) => StatusCode::CONFLICT,
            LoyaltyError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            LoyaltyError::Storage(_) | LoyaltyError::Internal(_) => {
                error!("Request failed: {}", err);
                return Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
            }
        };
        Self::new(status, err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(DetailResponse::new(self.detail))).into_response()
    }
}
