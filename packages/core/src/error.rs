use std::error::Error;
use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::lifecycle::LifecycleError;

/// Unified application error.
///
/// Every layer (config, database, lifecycle rules, identity) fails through
/// this type, and the HTTP layer turns it into a `{"error": ...}` body.
#[derive(Debug)]
pub enum AppError {
    Config(String),
    Database(String),
    NotFound(String),
    Validation(String),
    Conflict(String),
    Unauthorized(String),
    Unknown(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Config(_) | AppError::Database(_) | AppError::Unknown(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// The message without the category prefix, as sent to clients.
    pub fn message(&self) -> &str {
        match self {
            AppError::Config(msg)
            | AppError::Database(msg)
            | AppError::NotFound(msg)
            | AppError::Validation(msg)
            | AppError::Conflict(msg)
            | AppError::Unauthorized(msg)
            | AppError::Unknown(msg) => msg,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(msg) => write!(f, "Config error: {}", msg),
            AppError::Database(msg) => write!(f, "Database error: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Validation(msg) => write!(f, "Validation error: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::Unknown(msg) => write!(f, "Unknown error: {}", msg),
        }
    }
}

impl Error for AppError {}

impl From<LifecycleError> for AppError {
    fn from(err: LifecycleError) -> Self {
        let message = err.to_string();
        match err {
            LifecycleError::NotFound { .. } => AppError::NotFound(message),
            LifecycleError::Validation { .. } => AppError::Validation(message),
            LifecycleError::Conflict { .. } => AppError::Conflict(message),
            LifecycleError::Storage { .. } => AppError::Database(message),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}", self);
        }
        (status, Json(serde_json::json!({ "error": self.message() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[test]
    fn lifecycle_errors_map_to_http_statuses() {
        let cases = [
            (LifecycleError::not_found("Tool", 7), StatusCode::NOT_FOUND),
            (LifecycleError::validation("bad"), StatusCode::BAD_REQUEST),
            (LifecycleError::conflict("dup"), StatusCode::CONFLICT),
            (LifecycleError::storage("disk"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(AppError::from(err).status(), expected);
        }
    }

    #[test]
    fn display_includes_category_prefix() {
        let err = AppError::Config("DATABASE_URL is required".to_string());
        assert_eq!(err.to_string(), "Config error: DATABASE_URL is required");
    }

    #[tokio::test]
    async fn response_body_carries_error_message() {
        let resp = AppError::Unauthorized("X-User-Id header is required".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["error"], "X-User-Id header is required");
    }
}
