//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use crate::identity::IdentityResult;
use serde::Serialize;
use thiserror::Error;

/// Startup configuration errors. All of them abort the boot sequence.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("connection string 'DATABASE_URL' not found")]
    MissingConnectionString,
    #[error("missing required setting: {0}")]
    Missing(&'static str),
    #[error("invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("invalid file name: {0}")]
    InvalidName(String),
    #[error("file not found: {0}")]
    NotFound(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("object store: {0}")]
    Remote(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("storage: {0}")]
    Storage(#[from] StorageError),
    #[error("password hashing: {0}")]
    PasswordHash(String),
    #[error("identity: {0}")]
    Identity(IdentityResult),
    #[error("account is locked out")]
    LockedOut,
    #[error("internal: {0}")]
    Internal(String),
}

/// Fatal boot failures (configure and migrate phases).
#[derive(Error, Debug)]
pub enum HostError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("migration {version} ({name}) failed: {source}")]
    Migration {
        version: i64,
        name: &'static str,
        #[source]
        source: sqlx::Error,
    },
    #[error(transparent)]
    App(#[from] AppError),
    #[error("storage: {0}")]
    Storage(#[from] StorageError),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl AppError {
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
            AppError::Db(e) => match e {
                sqlx::Error::RowNotFound => (StatusCode::NOT_FOUND, "not_found"),
                sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "validation_error")
                }
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    (StatusCode::CONFLICT, "conflict")
                }
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            },
            AppError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            AppError::Storage(StorageError::NotFound(_)) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Storage(StorageError::InvalidName(_)) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
            AppError::PasswordHash(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            AppError::Identity(r) if r.has_error("DuplicateUserName") => (StatusCode::CONFLICT, "conflict"),
            AppError::Identity(_) => (StatusCode::UNPROCESSABLE_ENTITY, "identity_error"),
            AppError::LockedOut => (StatusCode::LOCKED, "locked_out"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let details = match &self {
            AppError::Identity(result) => serde_json::to_value(&result.errors).ok(),
            _ => None,
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
                details,
            },
        };
        (status, Json(body)).into_response()
    }
}
