use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

use super::ApiResponse;
use crate::models::appointment::AppointmentStatus;
use crate::services::{AppointmentError, AuthError, MfaError};

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),

    DatabaseError(String),

    ValidationError(String),

    /// Illegal status change. Carries enough diagnostic detail for the
    /// caller to render a helpful message; this is part of the contract.
    InvalidTransition {
        current: AppointmentStatus,
        attempted: AppointmentStatus,
        allowed: Vec<AppointmentStatus>,
    },

    Conflict(String),

    RateLimited { retry_after_seconds: u64 },

    Forbidden(String),

    InternalError(String),

    Unauthorized(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            ApiError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            ApiError::InvalidTransition {
                current, attempted, ..
            } => write!(f, "Cannot transition from {current} to {attempted}"),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::RateLimited {
                retry_after_seconds,
            } => write!(f, "Rate limited, retry after {retry_after_seconds}s"),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::InvalidTransition {
                current,
                attempted,
                allowed,
            } => {
                // Structured rejection: callers need the allowed set.
                let body = serde_json::json!({
                    "success": false,
                    "error": format!("Cannot transition from {current} to {attempted}"),
                    "current_status": current,
                    "attempted_status": attempted,
                    "allowed_transitions": allowed,
                });
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
            ApiError::RateLimited {
                retry_after_seconds,
            } => {
                let body = ApiResponse::<()>::error("Too many requests");
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    [("Retry-After", retry_after_seconds.to_string())],
                    Json(body),
                )
                    .into_response()
            }
            ApiError::NotFound(msg) => simple_response(StatusCode::NOT_FOUND, msg),
            ApiError::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                simple_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A database error occurred".to_string(),
                )
            }
            ApiError::ValidationError(msg) => simple_response(StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => simple_response(StatusCode::CONFLICT, msg),
            ApiError::Forbidden(msg) => simple_response(StatusCode::FORBIDDEN, msg),
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                simple_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
            ApiError::Unauthorized(msg) => simple_response(StatusCode::UNAUTHORIZED, msg),
        }
    }
}

fn simple_response(status: StatusCode, message: String) -> Response {
    let body = ApiResponse::<()>::error(message);
    (status, Json(body)).into_response()
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::InternalError(err.to_string())
    }
}

impl From<AppointmentError> for ApiError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::UnknownStatus(status) => {
                ApiError::ValidationError(format!("Unknown appointment status: {status}"))
            }
            AppointmentError::NotFound => ApiError::NotFound("Appointment not found".to_string()),
            AppointmentError::InvalidTransition {
                current,
                attempted,
                allowed,
            } => ApiError::InvalidTransition {
                current,
                attempted,
                allowed,
            },
            AppointmentError::ConcurrentModification => ApiError::Conflict(
                "Appointment was modified concurrently; retry the request".to_string(),
            ),
            AppointmentError::Validation(msg) => ApiError::ValidationError(msg),
            AppointmentError::Database(msg) => ApiError::DatabaseError(msg),
        }
    }
}

impl From<MfaError> for ApiError {
    fn from(err: MfaError) -> Self {
        match err {
            // Business-rule rejections are 400s, not auth failures.
            MfaError::AlreadyEnabled
            | MfaError::NotInitialized
            | MfaError::NotConfigured
            | MfaError::NotEnabled => ApiError::ValidationError(err.to_string()),
            // Deliberately generic regardless of the internal cause.
            MfaError::InvalidCode => {
                ApiError::ValidationError("Invalid verification code".to_string())
            }
            MfaError::Validation(msg) => ApiError::ValidationError(msg),
            MfaError::Database(msg) => ApiError::DatabaseError(msg),
            MfaError::Internal(msg) => ApiError::InternalError(msg),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials | AuthError::UserNotFound => {
                ApiError::Unauthorized("Invalid credentials".to_string())
            }
            AuthError::MfaRequired => {
                ApiError::Unauthorized("A two-factor code is required".to_string())
            }
            AuthError::Validation(msg) => ApiError::ValidationError(msg),
            AuthError::Database(msg) => ApiError::DatabaseError(msg),
            AuthError::Unauthorized => ApiError::Unauthorized("Not authenticated".to_string()),
            AuthError::Internal(msg) => ApiError::InternalError(msg),
        }
    }
}

impl ApiError {
    pub fn not_found(resource: &str, id: impl fmt::Display) -> Self {
        ApiError::NotFound(format!("{} {} not found", resource, id))
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::ValidationError(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError::InternalError(msg.into())
    }
}
