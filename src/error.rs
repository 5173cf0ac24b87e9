use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Hidden")]
    Hidden,

    #[error("Revoked")]
    Revoked,

    #[error("Expired")]
    Expired,

    #[error("Used up")]
    UsedUp,

    /// Optimistic claim retries exhausted. Retryable at the caller's discretion.
    #[error("Race failed")]
    RaceFailed,

    #[error("No resource bound")]
    NoResourceBound,

    #[error("Resource not found")]
    ResourceNotFound,

    /// The per-platform external-code window is held by another fetch.
    #[error("Busy")]
    Busy,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl AppError {
    /// Stable machine-readable failure code for the response body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not_found",
            AppError::Hidden => "hidden",
            AppError::Revoked => "revoked",
            AppError::Expired => "expired",
            AppError::UsedUp => "used_up",
            AppError::RaceFailed => "race_failed",
            AppError::NoResourceBound => "no_resource_bound",
            AppError::ResourceNotFound => "resource_not_found",
            AppError::Busy => "busy",
            AppError::BadRequest(_) => "bad_request",
            AppError::Unauthorized => "unauthorized",
            AppError::Database(_) | AppError::Pool(_) | AppError::Internal(_) => "internal",
            AppError::Json(_) => "invalid_json",
        }
    }
}

impl From<axum::extract::rejection::JsonRejection> for AppError {
    fn from(rejection: axum::extract::rejection::JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<axum::extract::rejection::QueryRejection> for AppError {
    fn from(rejection: axum::extract::rejection::QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<axum::extract::rejection::PathRejection> for AppError {
    fn from(rejection: axum::extract::rejection::PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, details) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, Some(msg.clone())),
            AppError::Hidden => (StatusCode::NOT_FOUND, None),
            AppError::Revoked | AppError::Expired | AppError::UsedUp => {
                (StatusCode::FORBIDDEN, Some(self.to_string()))
            }
            AppError::RaceFailed => (
                StatusCode::CONFLICT,
                Some("Claim lost a concurrent race; try again".into()),
            ),
            AppError::NoResourceBound | AppError::ResourceNotFound => {
                (StatusCode::CONFLICT, Some(self.to_string()))
            }
            AppError::Busy => (
                StatusCode::TOO_MANY_REQUESTS,
                Some("Another fetch is in flight for this platform".into()),
            ),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, Some(msg.clone())),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, None),
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, None)
            }
            AppError::Pool(e) => {
                tracing::error!("Pool error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, None)
            }
            AppError::Json(e) => {
                tracing::error!("JSON error: {}", e);
                (StatusCode::BAD_REQUEST, Some(e.to_string()))
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, None)
            }
        };

        let body = ErrorResponse {
            error: self.code(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Convert `Option<T>` lookups into `NotFound` failures.
pub trait OptionExt<T> {
    fn or_not_found(self, what: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn or_not_found(self, what: &str) -> Result<T> {
        self.ok_or_else(|| AppError::NotFound(what.to_string()))
    }
}

/// Stable user-facing message constants.
pub mod msg {
    pub const CODE_NOT_FOUND: &str = "Redemption code not found";
    pub const LEASE_NOT_FOUND: &str = "Lease not found";
    pub const SLOT_NOT_FOUND: &str = "Slot not found";
    pub const CREDENTIAL_NOT_FOUND: &str = "Credential not found";
    pub const NO_OTP_SEED: &str = "Bound credential has no one-time-code seed";
    pub const NO_MAIL_ADDRESS: &str = "Bound credential has no mail address";
}
