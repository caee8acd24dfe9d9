//! Error types for chadsvasc

use std::time::Duration;

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::types::ExceptionMessage;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("{0}")]
    Validation(String),

    #[error("{message}")]
    Rejected { status: StatusCode, message: String },

    #[error("File '{name}' is not valid UTF-8 text")]
    InvalidEncoding { name: String },

    #[error("Operation timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn storage(msg: impl Into<String>) -> Self {
        Error::Storage(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    /// HTTP status this error is reported with
    pub fn status(&self) -> StatusCode {
        match self {
            Error::Validation(_) | Error::InvalidEncoding { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Error::InvalidKey(_) => StatusCode::BAD_REQUEST,
            Error::Rejected { status, .. } => *status,
            Error::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Error::Storage(_) | Error::Serialization(_) | Error::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Cause of a 500 response, attached to the response extensions so the
/// debug layer can surface it.
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub String);

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %message, "API error");
        } else {
            tracing::debug!(status = status.as_u16(), error = %message, "API client error");
        }

        // Server-side causes stay out of the body unless debug mode re-exposes them
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            let body = ExceptionMessage::new("Internal Server Error");
            let mut response = (status, Json(body)).into_response();
            response.extensions_mut().insert(ErrorDetail(message));
            return response;
        }

        (status, Json(ExceptionMessage::new(message))).into_response()
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<MultipartRejection> for Error {
    fn from(rejection: MultipartRejection) -> Self {
        Error::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<MultipartError> for Error {
    fn from(err: MultipartError) -> Self {
        Error::Rejected {
            status: err.status(),
            message: format!("Failed to parse multipart data: {}", err.body_text()),
        }
    }
}
