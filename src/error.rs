use crate::schemas::chat::ErrorBody;
use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LogError {
    #[error("exchange log I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("exchange log row could not be encoded: {0}")]
    Csv(#[from] csv::Error),

    #[error("exchange log writer task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("exchange log lock was poisoned")]
    Poisoned,
}

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("{0}")]
    Validation(String),
}

impl ChatError {
    pub fn status(&self) -> StatusCode {
        match self {
            ChatError::Validation(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
