//! HTTP error mapping.

use std::time::Duration;

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use scoreazy_core::admin::AdminError;
use scoreazy_core::intake::IntakeError;
use scoreazy_core::store::StoreError;
use scoreazy_core::validation::FieldViolation;
use serde_json::json;

pub type ApiResult<T> = Result<T, ApiError>;

pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again later.";
pub const RATE_LIMITED: &str =
    "Too many contact form submissions from this IP, please try again later.";
pub const DUPLICATE: &str =
    "You have already submitted a contact form recently. Please wait 24 hours before submitting again.";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("validation failed")]
    Validation(Vec<FieldViolation>),

    #[error("bad request: {0}")]
    BadRequest(&'static str),

    #[error("rate limited")]
    RateLimited { retry_after: Duration },

    #[error("duplicate submission")]
    Duplicate,

    #[error("conflict")]
    Conflict,

    #[error("contact not found")]
    NotFound,

    #[error("unauthorized: {0}")]
    Unauthorized(&'static str),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<IntakeError> for ApiError {
    fn from(err: IntakeError) -> Self {
        match err {
            IntakeError::RateLimited(limited) => Self::RateLimited {
                retry_after: limited.retry_after,
            },
            IntakeError::ValidationFailed(violations) => Self::Validation(violations),
            IntakeError::DuplicateSubmission => Self::Duplicate,
            IntakeError::Conflict => Self::Conflict,
            IntakeError::StorageUnavailable(source) => Self::Internal(source.to_string()),
        }
    }
}

impl From<AdminError> for ApiError {
    fn from(err: AdminError) -> Self {
        match err {
            AdminError::NotFound => Self::NotFound,
            AdminError::ValidationFailed(violations) => Self::Validation(violations),
            AdminError::InvalidStatus => Self::BadRequest("Invalid status value"),
            AdminError::Storage(StoreError::Conflict) => Self::Conflict,
            AdminError::Storage(source) => Self::Internal(source.to_string()),
        }
    }
}

fn failure(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "success": false, "message": message }))).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "success": false,
                    "message": "Validation failed",
                    "errors": errors,
                })),
            )
                .into_response(),
            Self::BadRequest(message) => failure(StatusCode::BAD_REQUEST, message),
            Self::RateLimited { retry_after } => {
                let mut response = failure(StatusCode::TOO_MANY_REQUESTS, RATE_LIMITED);
                // Whole seconds, rounded up.
                let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(secs.max(1)));
                response
            }
            Self::Duplicate => failure(StatusCode::TOO_MANY_REQUESTS, DUPLICATE),
            Self::Conflict => failure(
                StatusCode::CONFLICT,
                "A submission from this email was already received today.",
            ),
            Self::NotFound => failure(StatusCode::NOT_FOUND, "Contact not found"),
            Self::Unauthorized(message) => {
                let mut response =
                    (StatusCode::UNAUTHORIZED, Json(json!({ "message": message }))).into_response();
                response.headers_mut().insert(
                    header::WWW_AUTHENTICATE,
                    HeaderValue::from_static("Basic realm=\"Admin Access\""),
                );
                response
            }
            Self::Internal(detail) => {
                tracing::error!(error = %detail, "Request failed");
                failure(StatusCode::INTERNAL_SERVER_ERROR, GENERIC_FAILURE)
            }
        }
    }
}
