// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::auth::CredentialError;
use crate::config::ConfigError;
use crate::database::DatabaseError;
use crate::employees::{AggregateError, EmployeeParseError};
use crate::storage::StorageError;

/// HTTP API error with a status code and a client-safe message.
///
/// Details of the underlying failure are logged where the conversion
/// happens and never reach the response body.
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 500 Internal Server Error
    InternalServerError(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "error": true,
            "message": self.message(),
            "code": self.error_code()
        })
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn unexpected() -> Self {
        ApiError::internal_server_error("An unexpected error occurred while processing the request.")
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        tracing::error!("Configuration error: {}", err);
        ApiError::internal_server_error("Service configuration is incomplete.")
    }
}

impl From<CredentialError> for ApiError {
    fn from(err: CredentialError) -> Self {
        tracing::error!("Authentication failed: {}", err);
        ApiError::internal_server_error("Authentication with the identity provider failed.")
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Config(e) => e.into(),
            DatabaseError::InvalidTableName(name) => {
                tracing::error!("Invalid employees table name configured: {}", name);
                ApiError::internal_server_error("Service configuration is incomplete.")
            }
            DatabaseError::Timeout(stage) => {
                tracing::error!("SQL warehouse timed out during {}", stage);
                ApiError::internal_server_error(
                    "Database connection failed. Please check the SQL endpoint configuration and ensure the database is accessible.",
                )
            }
            DatabaseError::Aggregate(e) => e.into(),
            DatabaseError::Sqlx(sqlx_err) => {
                // Log the real error but return generic message
                tracing::error!("SQLx error: {}", sqlx_err);
                ApiError::internal_server_error(
                    "Database connection failed. Please check the SQL endpoint configuration and ensure the database is accessible.",
                )
            }
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(path) => {
                tracing::warn!("File not found in object store: {}", path);
                ApiError::not_found("File not found.")
            }
            StorageError::Forbidden(path) => {
                tracing::error!("Access forbidden to object store file: {}", path);
                ApiError::forbidden("Access to the file is forbidden.")
            }
            StorageError::Credential(e) => e.into(),
            StorageError::InvalidUrl(reason) => {
                tracing::error!("Invalid object store URL configured: {}", reason);
                ApiError::internal_server_error("Service configuration is incomplete.")
            }
            other => {
                tracing::error!("Object store request failed: {}", other);
                ApiError::unexpected()
            }
        }
    }
}

impl From<EmployeeParseError> for ApiError {
    fn from(err: EmployeeParseError) -> Self {
        tracing::error!("Error parsing CSV data: {}", err);
        ApiError::unexpected()
    }
}

impl From<AggregateError> for ApiError {
    fn from(err: AggregateError) -> Self {
        tracing::error!("Salary aggregation failed: {}", err);
        ApiError::unexpected()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}
