//! 外部OCR引擎连接层
//!
//! 对上层只暴露一个能力：给定图片路径与提示词，返回识别出的文本。
//! 具体引擎（目前为 Ollama 视觉模型）实现 [`OcrEngine`]。

pub mod ollama;
pub mod preprocess;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use ollama::OllamaOcr;

/// 默认OCR提示词
pub const DEFAULT_OCR_SYSTEM_PROMPT: &str = "Act as an OCR assistant. Analyze the provided image and:
1. Recognize all visible text in the image as accurately as possible.
2. Maintain the original structure and formatting of the text.
3. If any words or phrases are unclear, indicate this with [unclear] in your transcription.
Provide only the transcription without any additional comments.";

/// OCR引擎抽象
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// 引擎名称（用于日志）
    fn name(&self) -> &str;

    /// 识别单张图片，可能返回空字符串
    async fn extract(&self, image: &Path, prompt: &str) -> Result<String, OcrError>;
}

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("failed to read image {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("image preprocessing aborted: {0}")]
    Preprocess(String),

    #[error("OCR engine request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("OCR engine returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("OCR engine response could not be decoded: {0}")]
    Decode(String),

    #[error("OCR engine did not answer within {0}s")]
    Timeout(u64),
}

impl OcrError {
    /// 引擎侧错误（区别于本地读图失败）
    pub fn is_engine_error(&self) -> bool {
        matches!(
            self,
            OcrError::Request(_) | OcrError::Api { .. } | OcrError::Decode(_) | OcrError::Timeout(_)
        )
    }
}
