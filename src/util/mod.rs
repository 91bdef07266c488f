use crate::model::ProcessError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt::Display;

pub mod config;
pub mod log;
pub mod logging;
pub mod middleware;
pub mod naming;
pub mod retention;

/// 接口错误，响应体为 `{"error": "..."}`
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl ToString) -> Self {
        Self {
            status,
            message: message.to_string(),
        }
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.status.as_u16(), self.message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<ProcessError> for ApiError {
    fn from(err: ProcessError) -> Self {
        Self::new(err.status(), err.public_message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::upload::UploadError;

    #[test]
    fn process_errors_map_to_status_and_message() {
        let err = ApiError::from(ProcessError::from(UploadError::NoFiles));
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "No files uploaded");

        let err = ApiError::from(ProcessError::from(UploadError::Io(std::io::Error::other("disk"))));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
