//! Application-wide error types.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Insufficient moderation votes: {recorded} recorded, {required} required")]
    InsufficientVotes { recorded: i64, required: i64 },

    #[error("Dispatch error: {0}")]
    Dispatch(String),

    #[error("Callback decode error: {0}")]
    CallbackDecode(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Stale write on {0}: record changed concurrently")]
    StaleWrite(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, OracleError>;

impl OracleError {
    /// Whether retrying the same operation later can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Dispatch(_) | Self::Http(_) | Self::Persistence(_) | Self::StaleWrite(_)
        )
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::AlreadyExists(_) | Self::StaleWrite(_) => StatusCode::CONFLICT,
            Self::InsufficientVotes { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Dispatch(_) | Self::Http(_) => StatusCode::BAD_GATEWAY,
            Self::CallbackDecode(_) | Self::InvalidRequest(_) | Self::Json(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Persistence(_) | Self::Migrate(_) | Self::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub retryable: bool,
}

impl IntoResponse for OracleError {
    fn into_response(self) -> axum::response::Response {
        (
            self.status_code(),
            Json(ErrorResponse {
                error: self.to_string(),
                retryable: self.is_retryable(),
            }),
        )
            .into_response()
    }
}
