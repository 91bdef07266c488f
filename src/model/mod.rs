use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod document;
pub mod ocr;
pub mod pipeline;
pub mod upload;

use document::AssemblyError;
use ocr::ExtractionError;
use upload::UploadError;

/// `/process-ocr` 的失败类型
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error(transparent)]
    Rejected(#[from] UploadError),

    #[error(transparent)]
    ExtractionFailed(#[from] ExtractionError),

    #[error(transparent)]
    AssemblyFailed(#[from] AssemblyError),
}

impl ProcessError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProcessError::Rejected(e) => e.status(),
            ProcessError::ExtractionFailed(_) | ProcessError::AssemblyFailed(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// 返回给客户端的错误信息，内部细节只写日志
    pub fn public_message(&self) -> String {
        match self {
            ProcessError::Rejected(UploadError::Io(_)) => {
                "Failed to store uploaded files".to_string()
            }
            ProcessError::Rejected(e) => e.to_string(),
            ProcessError::ExtractionFailed(_) => "Error processing OCR".to_string(),
            ProcessError::AssemblyFailed(_) => "Error generating DOCX".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigResponse {
    #[serde(rename = "fileLimit")]
    pub file_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessResponse {
    #[serde(rename = "fileUrl")]
    pub file_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: String,
    #[serde(rename = "ocrEngine")]
    pub ocr_engine: String,
}
