use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::models::pickup::PickupStatus;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid verification code")]
    InvalidCode,
}

/// Expected domain failures of the lifecycle engine. These are ordinary
/// result values; the engine never panics for a wrong status or code.
#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    #[error("pickup {0} not found")]
    NotFound(Uuid),

    #[error("cannot {action} a pickup that is {status}")]
    InvalidTransition {
        action: &'static str,
        status: PickupStatus,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("pickup code does not match")]
    CodeMismatch,

    #[error("actor is not a party to this pickup")]
    Unauthorized,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("corrupt snapshot {path}: {source}")]
    Corrupt {
        path: String,
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("no active session")]
    Unauthenticated,

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Auth(AuthError::InvalidCode) => StatusCode::UNAUTHORIZED,
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Engine(EngineError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Engine(EngineError::InvalidInput(_)) => StatusCode::BAD_REQUEST,
            AppError::Engine(EngineError::InvalidTransition { .. }) => StatusCode::CONFLICT,
            AppError::Engine(EngineError::CodeMismatch) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Engine(EngineError::Unauthorized) => StatusCode::FORBIDDEN,
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}
