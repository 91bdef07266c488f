//! 上传接收：数量/类型/大小校验并落盘到上传目录
//!
//! 任一文件不合规即整批拒绝。已落盘的文件由 [`UploadedFile`] 持有的
//! [`TempPath`] 负责删除：正常流程中识别完成后显式释放，提前退出时随
//! drop 一起删除。

use crate::util::config::UploadConfig;
use crate::util::logging::standards::events;
use crate::util::naming;
use axum::extract::Multipart;
use axum::http::StatusCode;
use mime_guess::mime::Mime;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// 接受的文件字段名（多文件 / 单文件）
pub const FILE_FIELDS: &[&str] = &["imageFiles", "imageFile"];

const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];
const ALLOWED_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/jpg", "image/png"];

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("No files uploaded")]
    NoFiles,

    #[error("Too many files: at most {limit} files are allowed per request")]
    TooManyFiles { limit: usize },

    #[error("Unsupported file type: {file_name} (only JPG, JPEG and PNG images are accepted)")]
    UnsupportedFileType { file_name: String },

    #[error("File too large: {file_name} exceeds the {} limit", format_limit(.limit_bytes))]
    FileTooLarge { file_name: String, limit_bytes: u64 },

    #[error("Unexpected field: {field}")]
    UnexpectedField { field: String },

    #[error("Malformed upload: {message}")]
    Malformed { status: StatusCode, message: String },

    #[error("Failed to store uploaded file: {0}")]
    Io(#[from] std::io::Error),
}

impl UploadError {
    pub fn status(&self) -> StatusCode {
        match self {
            UploadError::Malformed { status, .. } => *status,
            UploadError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<axum::extract::multipart::MultipartError> for UploadError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        UploadError::Malformed {
            status: err.status(),
            message: err.body_text(),
        }
    }
}

/// 已落盘、等待识别的上传文件
#[derive(Debug)]
pub struct UploadedFile {
    path: TempPath,
    original_name: String,
    content_type: String,
    size: u64,
}

impl UploadedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// 删除临时文件；失败只记录日志
    pub async fn release(self) {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => debug!(path = %self.path.display(), "已删除上传临时文件"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(
                event = events::UPLOAD_CLEANUP_FAILED,
                path = %self.path.display(),
                error = %e
            ),
        }
        // 已处理过删除，避免 drop 时再删一次
        let _ = self.path.keep();
    }
}

/// 内存中的一个文件部件（不经过HTTP层时使用）
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub field: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// 已通过数量与类型检查、尚未写盘的文件
#[derive(Debug)]
pub struct Admission {
    original_name: String,
    extension: String,
    content_type: String,
}

/// 上传接收器
#[derive(Debug, Clone)]
pub struct UploadAcceptor {
    file_limit: usize,
    max_file_bytes: u64,
    upload_dir: PathBuf,
}

impl UploadAcceptor {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            file_limit: config.file_limit,
            max_file_bytes: config.max_file_bytes,
            upload_dir: config.upload_dir.clone(),
        }
    }

    pub fn file_limit(&self) -> usize {
        self.file_limit
    }

    /// 数量与类型检查
    pub fn admit(
        &self,
        already_accepted: usize,
        field: &str,
        file_name: &str,
        content_type: Option<&str>,
    ) -> Result<Admission, UploadError> {
        if !FILE_FIELDS.contains(&field) {
            return Err(UploadError::UnexpectedField {
                field: field.to_string(),
            });
        }

        if already_accepted >= self.file_limit {
            return Err(UploadError::TooManyFiles {
                limit: self.file_limit,
            });
        }

        let unsupported = || UploadError::UnsupportedFileType {
            file_name: file_name.to_string(),
        };

        let extension = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .filter(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
            .ok_or_else(unsupported)?;

        let declared = content_type
            .and_then(|ct| ct.parse::<Mime>().ok())
            .map(|mime| mime.essence_str().to_ascii_lowercase())
            .filter(|essence| ALLOWED_CONTENT_TYPES.contains(&essence.as_str()))
            .ok_or_else(unsupported)?;

        let guessed = mime_guess::from_ext(&extension)
            .first()
            .map(|mime| mime.essence_str().to_string());
        if guessed.as_deref() != Some(normalize_jpeg(&declared)) {
            warn!(
                event = events::UPLOAD_TYPE_MISMATCH,
                file_name,
                declared = %declared,
                guessed = guessed.as_deref().unwrap_or("unknown"),
                "声明类型与扩展名不一致"
            );
        }

        Ok(Admission {
            original_name: file_name.to_string(),
            extension,
            content_type: declared,
        })
    }

    /// 单文件大小检查
    pub fn check_size(&self, admission: &Admission, len: u64) -> Result<(), UploadError> {
        if len > self.max_file_bytes {
            return Err(UploadError::FileTooLarge {
                file_name: admission.original_name.clone(),
                limit_bytes: self.max_file_bytes,
            });
        }
        Ok(())
    }

    /// 以唯一文件名写入上传目录
    pub async fn store(
        &self,
        admission: Admission,
        bytes: &[u8],
    ) -> Result<UploadedFile, UploadError> {
        tokio::fs::create_dir_all(&self.upload_dir).await?;

        let path = self
            .upload_dir
            .join(naming::upload_file_name(&admission.extension));
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        // 文件创建成功后才接管删除责任，写入失败时随 guard 删除
        let guard = TempPath::try_from_path(&path)?;
        file.write_all(bytes).await?;
        file.flush().await?;

        Ok(UploadedFile {
            path: guard,
            original_name: admission.original_name,
            content_type: admission.content_type,
            size: bytes.len() as u64,
        })
    }

    /// 校验并保存一批内存中的文件
    pub async fn accept_files(
        &self,
        files: Vec<IncomingFile>,
    ) -> Result<Vec<UploadedFile>, UploadError> {
        let mut accepted = Vec::with_capacity(files.len().min(self.file_limit));

        for file in files {
            let admission = self
                .admit(
                    accepted.len(),
                    &file.field,
                    &file.file_name,
                    file.content_type.as_deref(),
                )
                .inspect_err(log_rejection)?;
            self.check_size(&admission, file.bytes.len() as u64)
                .inspect_err(log_rejection)?;
            accepted.push(self.store(admission, &file.bytes).await?);
        }

        self.finish(accepted)
    }

    /// 流式读取 multipart，边读边检查大小
    pub async fn accept_multipart(
        &self,
        multipart: &mut Multipart,
    ) -> Result<Vec<UploadedFile>, UploadError> {
        let mut accepted: Vec<UploadedFile> = Vec::new();

        while let Some(mut field) = multipart.next_field().await? {
            // 没有文件名的是普通表单字段
            let Some(file_name) = field.file_name().map(str::to_string) else {
                continue;
            };
            let field_name = field.name().unwrap_or_default().to_string();
            let content_type = field.content_type().map(str::to_string);

            let admission = self
                .admit(
                    accepted.len(),
                    &field_name,
                    &file_name,
                    content_type.as_deref(),
                )
                .inspect_err(log_rejection)?;

            let mut bytes = Vec::new();
            while let Some(chunk) = field.chunk().await? {
                bytes.extend_from_slice(&chunk);
                self.check_size(&admission, bytes.len() as u64)
                    .inspect_err(log_rejection)?;
            }

            accepted.push(self.store(admission, &bytes).await?);
        }

        self.finish(accepted)
    }

    fn finish(&self, accepted: Vec<UploadedFile>) -> Result<Vec<UploadedFile>, UploadError> {
        if accepted.is_empty() {
            let err = UploadError::NoFiles;
            log_rejection(&err);
            return Err(err);
        }

        info!(
            event = events::UPLOAD_ACCEPTED,
            count = accepted.len(),
            total_bytes = accepted.iter().map(UploadedFile::size).sum::<u64>()
        );
        Ok(accepted)
    }
}

fn normalize_jpeg(essence: &str) -> &str {
    if essence == "image/jpg" {
        "image/jpeg"
    } else {
        essence
    }
}

fn format_limit(bytes: &u64) -> String {
    const MIB: u64 = 1024 * 1024;
    let bytes = *bytes;
    if bytes < MIB {
        format!("{bytes} bytes")
    } else if bytes % MIB == 0 {
        format!("{} MiB", bytes / MIB)
    } else {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    }
}

fn log_rejection(err: &UploadError) {
    warn!(event = events::UPLOAD_REJECTED, reason = %err);
}
