//! 单次请求的处理流水线：识别 → 生成文档

use crate::model::document::{DocumentAssembler, OutputDocument};
use crate::model::ocr::OcrInvoker;
use crate::model::upload::UploadedFile;
use crate::model::ProcessError;
use crate::util::logging::standards::events;
use crate::util::naming;
use std::time::Instant;
use tracing::{error, info, Instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStage {
    Extracting,
    Assembling,
}

impl BatchStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStage::Extracting => "extracting",
            BatchStage::Assembling => "assembling",
        }
    }
}

/// 处理一批已接收的文件，成功时返回生成的文档
pub async fn process_batch(
    invoker: &OcrInvoker,
    assembler: &DocumentAssembler,
    files: Vec<UploadedFile>,
) -> Result<OutputDocument, ProcessError> {
    let batch_id = naming::batch_id();
    let span = tracing::info_span!("batch", batch_id = %batch_id, files = files.len());
    run(invoker, assembler, files).instrument(span).await
}

async fn run(
    invoker: &OcrInvoker,
    assembler: &DocumentAssembler,
    files: Vec<UploadedFile>,
) -> Result<OutputDocument, ProcessError> {
    let started = Instant::now();

    stage(BatchStage::Extracting);
    let results = invoker
        .extract_all(files)
        .await
        .inspect_err(|e| failed(BatchStage::Extracting, e))?;

    stage(BatchStage::Assembling);
    let document = assembler
        .assemble(results)
        .await
        .inspect_err(|e| failed(BatchStage::Assembling, e))?;

    info!(
        event = events::PIPELINE_COMPLETE,
        file_name = %document.file_name,
        paragraphs = document.paragraph_count,
        elapsed_ms = started.elapsed().as_millis() as u64
    );
    Ok(document)
}

fn stage(stage: BatchStage) {
    info!(event = events::PIPELINE_STAGE, stage = stage.as_str());
}

fn failed(stage: BatchStage, err: &dyn std::error::Error) {
    error!(event = events::PIPELINE_ERROR, stage = stage.as_str(), error = %err);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::document::testing::document_xml;
    use crate::model::ocr::testing::EchoEngine;
    use crate::model::upload::{IncomingFile, UploadAcceptor};
    use crate::util::config::UploadConfig;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct Fixture {
        uploads: TempDir,
        downloads: TempDir,
        acceptor: UploadAcceptor,
        invoker: OcrInvoker,
        assembler: DocumentAssembler,
    }

    fn fixture() -> Fixture {
        let uploads = TempDir::new().unwrap();
        let downloads = TempDir::new().unwrap();
        let acceptor = UploadAcceptor::new(&UploadConfig {
            file_limit: 5,
            max_file_bytes: 1024,
            upload_dir: uploads.path().to_path_buf(),
        });
        Fixture {
            invoker: OcrInvoker::new(Arc::new(EchoEngine::default()), "prompt"),
            assembler: DocumentAssembler::new(downloads.path()),
            uploads,
            downloads,
            acceptor,
        }
    }

    fn png(name: &str, content: &str) -> IncomingFile {
        IncomingFile {
            field: "imageFiles".to_string(),
            file_name: name.to_string(),
            content_type: Some("image/png".to_string()),
            bytes: content.as_bytes().to_vec(),
        }
    }

    fn count(dir: &TempDir) -> usize {
        std::fs::read_dir(dir.path()).unwrap().count()
    }

    #[tokio::test]
    async fn two_images_become_two_paragraphs_in_upload_order() {
        let fx = fixture();
        let files = fx
            .acceptor
            .accept_files(vec![png("a.png", "Hello"), png("b.png", "World")])
            .await
            .unwrap();

        let doc = process_batch(&fx.invoker, &fx.assembler, files)
            .await
            .unwrap();

        assert_eq!(doc.paragraph_count, 2);
        let xml = document_xml(&doc.path);
        assert!(xml.find("Hello").unwrap() < xml.find("World").unwrap());
        assert_eq!(count(&fx.uploads), 0);
        assert_eq!(count(&fx.downloads), 1);
    }

    #[tokio::test]
    async fn ocr_failure_writes_no_document_and_removes_uploads() {
        let fx = fixture();
        let files = fx
            .acceptor
            .accept_files(vec![png("a.png", "Hello"), png("b.png", "FAIL")])
            .await
            .unwrap();

        let err = process_batch(&fx.invoker, &fx.assembler, files)
            .await
            .unwrap_err();

        assert!(matches!(err, ProcessError::ExtractionFailed(_)));
        assert_eq!(err.public_message(), "Error processing OCR");
        assert_eq!(count(&fx.uploads), 0);
        assert_eq!(count(&fx.downloads), 0);
    }

    #[tokio::test]
    async fn identical_batches_produce_distinct_documents() {
        let fx = fixture();
        let mut urls = Vec::new();
        for _ in 0..2 {
            let files = fx
                .acceptor
                .accept_files(vec![png("same.png", "same text")])
                .await
                .unwrap();
            let doc = process_batch(&fx.invoker, &fx.assembler, files)
                .await
                .unwrap();
            urls.push(doc.url());
        }

        assert_ne!(urls[0], urls[1]);
        assert_eq!(count(&fx.downloads), 2);
    }
}
