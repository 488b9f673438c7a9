use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

pub const UNEXPECTED_ERROR_MESSAGE: &str = "Unexpected error occurred.";

/// Failure kinds of a single completion request.
///
/// `Display` renders the message the client sees.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatError {
    #[error("{0}")]
    Validation(String),
    #[error("Error communicating with Flowise: {0}")]
    UpstreamTransport(String),
    #[error("Error parsing Flowise response: {0}")]
    UpstreamParse(String),
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl ChatError {
    pub fn kind(&self) -> &'static str {
        match self {
            ChatError::Validation(_) => "validation",
            ChatError::UpstreamTransport(_) => "upstream_transport",
            ChatError::UpstreamParse(_) => "upstream_parse",
            ChatError::Unexpected(_) => "unexpected",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Classifies a failed sync completion. Unexpected faults never echo their
/// details back to the caller.
impl From<ChatError> for AppError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::Validation(_) => {
                AppError::new(StatusCode::BAD_REQUEST, err.kind(), err.to_string())
            }
            ChatError::UpstreamTransport(_) | ChatError::UpstreamParse(_) => AppError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                err.kind(),
                err.to_string(),
            ),
            ChatError::Unexpected(_) => AppError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                err.kind(),
                UNEXPECTED_ERROR_MESSAGE,
            ),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    detail: String,
    code: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            detail: self.message,
            code: self.code,
        };
        (self.status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
