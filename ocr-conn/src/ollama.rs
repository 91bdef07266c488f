use crate::{preprocess, OcrEngine, OcrError};
use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2-vision";

const CONNECT_TIMEOUT_SECS: u64 = 30;
const ERROR_BODY_MAX_LEN: usize = 512;

/// Ollama 视觉模型OCR
///
/// 默认不设置整体请求超时，仅限制建连时间。
#[derive(Clone)]
pub struct OllamaOcr {
    client: Client,
    base_url: String,
    model: String,
    timeout: Option<Duration>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
    images: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: String,
}

impl OllamaOcr {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Result<Self, OcrError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .user_agent(concat!("ocr-conn/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(OcrError::Request)?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            timeout: None,
        })
    }

    /// 单次调用超时（None 表示一直等待）
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }

    fn build_request<'a>(&'a self, prompt: &'a str, image_base64: String) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
                images: vec![image_base64],
            }],
            stream: false,
        }
    }

    async fn load_image(image: &Path) -> Result<String, OcrError> {
        let raw = tokio::fs::read(image).await.map_err(|source| OcrError::Io {
            path: image.to_path_buf(),
            source,
        })?;

        let shown = image.display().to_string();
        let prepared = tokio::task::spawn_blocking(move || {
            match preprocess::prepare_for_vision(&raw) {
                Some(processed) => processed,
                None => {
                    warn!(image = %shown, "图片预处理失败，使用原始字节");
                    raw
                }
            }
        })
        .await
        .map_err(|e| OcrError::Preprocess(e.to_string()))?;

        Ok(base64::engine::general_purpose::STANDARD.encode(prepared))
    }
}

#[async_trait]
impl OcrEngine for OllamaOcr {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn extract(&self, image: &Path, prompt: &str) -> Result<String, OcrError> {
        let image_base64 = Self::load_image(image).await?;
        let body = self.build_request(prompt, image_base64);

        let started = Instant::now();
        let mut request = self.client.post(self.chat_url()).json(&body);
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let timeout_secs = self.timeout.map(|t| t.as_secs()).unwrap_or_default();
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                OcrError::Timeout(timeout_secs)
            } else {
                OcrError::Request(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            body.truncate(ERROR_BODY_MAX_LEN);
            return Err(OcrError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let reply: ChatResponse = response
            .json()
            .await
            .map_err(|e| OcrError::Decode(e.to_string()))?;

        debug!(
            model = %self.model,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Ollama识别完成"
        );

        Ok(reply.message.content.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_carries_prompt_and_single_image() {
        let engine = OllamaOcr::new("http://ollama:11434/", DEFAULT_OLLAMA_MODEL).unwrap();
        let body = engine.build_request("read it", "aGVsbG8=".to_string());
        let value = serde_json::to_value(&body).unwrap();

        assert_eq!(value["model"], DEFAULT_OLLAMA_MODEL);
        assert_eq!(value["stream"], false);
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["messages"][0]["content"], "read it");
        assert_eq!(value["messages"][0]["images"][0], "aGVsbG8=");
        assert_eq!(engine.chat_url(), "http://ollama:11434/api/chat");
    }

    #[test]
    fn reply_content_defaults_to_empty() {
        let reply: ChatResponse =
            serde_json::from_str(r#"{"model":"m","message":{"role":"assistant"},"done":true}"#)
                .unwrap();
        assert!(reply.message.content.is_empty());
    }

    #[tokio::test]
    async fn undecodable_image_is_sent_as_raw_bytes() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("scan.png");
        std::fs::write(&path, b"not really a png").unwrap();

        let encoded = OllamaOcr::load_image(&path).await.unwrap();

        assert_eq!(
            encoded,
            base64::engine::general_purpose::STANDARD.encode(b"not really a png")
        );
    }

    #[tokio::test]
    async fn missing_image_fails_before_any_request() {
        let dir = tempfile::TempDir::new().unwrap();
        let engine = OllamaOcr::new(DEFAULT_OLLAMA_HOST, DEFAULT_OLLAMA_MODEL).unwrap();

        let err = engine
            .extract(&dir.path().join("absent.png"), "prompt")
            .await
            .unwrap_err();

        assert!(matches!(err, OcrError::Io { .. }));
        assert!(!err.is_engine_error());
    }
}
