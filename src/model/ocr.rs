//! 批量识别：对一批上传文件并发调用OCR引擎，结果保持上传顺序

use crate::model::upload::UploadedFile;
use crate::util::logging::standards::events;
use futures::future::try_join_all;
use ocr_conn::{OcrEngine, OcrError};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{error, info};

/// 单个文件的识别结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionResult {
    /// 在本次上传中的位置
    pub index: usize,
    pub source_name: String,
    pub text: String,
}

#[derive(Debug, Error)]
#[error("OCR failed for file #{index} ({file_name}): {source}")]
pub struct ExtractionError {
    pub index: usize,
    pub file_name: String,
    #[source]
    pub source: OcrError,
}

/// OCR调用器，在请求间共享
#[derive(Clone)]
pub struct OcrInvoker {
    engine: Arc<dyn OcrEngine>,
    prompt: Arc<str>,
}

impl OcrInvoker {
    pub fn new(engine: Arc<dyn OcrEngine>, prompt: impl Into<Arc<str>>) -> Self {
        Self {
            engine,
            prompt: prompt.into(),
        }
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    /// 并发识别全部文件
    ///
    /// 任一文件失败即整体失败，尚未完成的调用随之取消；
    /// 每个上传文件在其调用结束或取消时被删除。
    pub async fn extract_all(
        &self,
        files: Vec<UploadedFile>,
    ) -> Result<Vec<ExtractionResult>, ExtractionError> {
        let calls = files
            .into_iter()
            .enumerate()
            .map(|(index, file)| self.extract_one(index, file));

        try_join_all(calls).await
    }

    async fn extract_one(
        &self,
        index: usize,
        file: UploadedFile,
    ) -> Result<ExtractionResult, ExtractionError> {
        let started = Instant::now();
        info!(
            event = events::OCR_EXTRACT_START,
            index,
            file_name = file.original_name(),
            size = file.size(),
            engine = self.engine.name()
        );

        let outcome = self.engine.extract(file.path(), &self.prompt).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        let source_name = file.original_name().to_string();
        file.release().await;

        match outcome {
            Ok(text) => {
                info!(
                    event = events::OCR_EXTRACT_COMPLETE,
                    index,
                    file_name = %source_name,
                    chars = text.chars().count(),
                    elapsed_ms
                );
                Ok(ExtractionResult {
                    index,
                    source_name,
                    text,
                })
            }
            Err(source) => {
                error!(
                    event = events::OCR_EXTRACT_FAILED,
                    index,
                    file_name = %source_name,
                    engine_side = source.is_engine_error(),
                    elapsed_ms,
                    error = %source
                );
                Err(ExtractionError {
                    index,
                    file_name: source_name,
                    source,
                })
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use async_trait::async_trait;
    use ocr_conn::{OcrEngine, OcrError};
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;
    use std::time::Duration;

    /// 按文件内容返回文本的假引擎
    ///
    /// 文件内容即为“识别结果”；内容为 `FAIL` 时返回错误。
    /// 内容越短返回越慢，用于验证结果顺序不受完成顺序影响。
    #[derive(Default)]
    pub struct EchoEngine {
        pub seen: Mutex<Vec<PathBuf>>,
    }

    #[async_trait]
    impl OcrEngine for EchoEngine {
        fn name(&self) -> &str {
            "echo"
        }

        async fn extract(&self, image: &Path, _prompt: &str) -> Result<String, OcrError> {
            self.seen.lock().unwrap().push(image.to_path_buf());
            let content = tokio::fs::read_to_string(image)
                .await
                .map_err(|source| OcrError::Io {
                    path: image.to_path_buf(),
                    source,
                })?;

            let delay = 40u64.saturating_sub(content.len() as u64 * 5);
            tokio::time::sleep(Duration::from_millis(delay)).await;

            if content == "FAIL" {
                return Err(OcrError::Api {
                    status: 500,
                    body: "model crashed".to_string(),
                });
            }
            Ok(content)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::EchoEngine;
    use super::*;
    use crate::model::upload::{IncomingFile, UploadAcceptor};
    use crate::util::config::UploadConfig;
    use tempfile::TempDir;

    async fn upload(dir: &TempDir, contents: &[&str]) -> Vec<UploadedFile> {
        let acceptor = UploadAcceptor::new(&UploadConfig {
            file_limit: 10,
            max_file_bytes: 1024,
            upload_dir: dir.path().to_path_buf(),
        });
        let files = contents
            .iter()
            .enumerate()
            .map(|(i, content)| IncomingFile {
                field: "imageFiles".to_string(),
                file_name: format!("page-{i}.png"),
                content_type: Some("image/png".to_string()),
                bytes: content.as_bytes().to_vec(),
            })
            .collect();
        acceptor.accept_files(files).await.unwrap()
    }

    #[tokio::test]
    async fn results_follow_upload_order() {
        let dir = TempDir::new().unwrap();
        let files = upload(&dir, &["a", "longer text", "mid"]).await;
        let engine = Arc::new(EchoEngine::default());
        let invoker = OcrInvoker::new(engine.clone(), "prompt");

        let results = invoker.extract_all(files).await.unwrap();

        let texts: Vec<_> = results.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, ["a", "longer text", "mid"]);
        assert_eq!(results[1].index, 1);
        assert_eq!(results[2].source_name, "page-2.png");
        assert_eq!(engine.seen.lock().unwrap().len(), 3);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn one_failure_fails_the_batch_and_removes_every_upload() {
        let dir = TempDir::new().unwrap();
        let files = upload(&dir, &["first", "FAIL", "third"]).await;
        let invoker = OcrInvoker::new(Arc::new(EchoEngine::default()), "prompt");

        let err = invoker.extract_all(files).await.unwrap_err();

        assert_eq!(err.index, 1);
        assert_eq!(err.file_name, "page-1.png");
        assert!(err.source.is_engine_error());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn empty_text_is_a_valid_result() {
        let dir = TempDir::new().unwrap();
        let files = upload(&dir, &[""]).await;
        let invoker = OcrInvoker::new(Arc::new(EchoEngine::default()), "prompt");

        let results = invoker.extract_all(files).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].text.is_empty());
    }
}
