//! 配置数据结构定义

use serde::Serialize;
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_MAX_FILE_SIZE_MB: u64 = 10;
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";
pub const DEFAULT_DOWNLOAD_DIR_NAME: &str = "downloads";
pub const DEFAULT_STATIC_DIR_NAME: &str = "public";
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 600;
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_LOG_DIR: &str = "logs";
pub const DEFAULT_LOG_RETENTION_DAYS: u32 = 7;

/// multipart 报文头与分隔符的额外余量
const MULTIPART_OVERHEAD_BYTES: u64 = 1024 * 1024;

/// 进程级配置，启动时构建一次，之后只读
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub upload: UploadConfig,
    pub download: DownloadConfig,
    pub ocr: OcrConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerConfig {
    pub port: u16,
    /// 前端静态资源目录
    pub static_dir: PathBuf,
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadConfig {
    /// 单次请求允许的文件数
    pub file_limit: usize,
    pub max_file_bytes: u64,
    pub upload_dir: PathBuf,
}

impl UploadConfig {
    /// 整个请求体的上限
    pub fn request_body_limit(&self) -> usize {
        let total = (self.file_limit as u64)
            .saturating_mul(self.max_file_bytes)
            .saturating_add(MULTIPART_OVERHEAD_BYTES);
        usize::try_from(total).unwrap_or(usize::MAX)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DownloadConfig {
    pub download_dir: PathBuf,
    /// 生成文档的保留时长（小时），None 表示永久保留
    pub retention_hours: Option<u64>,
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OcrConfig {
    pub ollama_host: String,
    pub model: String,
    pub request_timeout_secs: Option<u64>,
}

/// 日志配置
#[derive(Debug, Clone, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: LogFileConfig,
    /// 是否输出JSON结构化日志
    pub structured: bool,
}

/// 日志文件配置
#[derive(Debug, Clone, Serialize)]
pub struct LogFileConfig {
    pub enabled: bool,
    pub directory: String,
    pub retention_days: Option<u32>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            file: LogFileConfig {
                enabled: true,
                directory: DEFAULT_LOG_DIR.to_string(),
                retention_days: Some(DEFAULT_LOG_RETENTION_DAYS),
            },
            structured: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_limit_covers_every_file_plus_overhead() {
        let upload = UploadConfig {
            file_limit: 3,
            max_file_bytes: 10 * 1024 * 1024,
            upload_dir: PathBuf::from("uploads"),
        };
        assert_eq!(upload.request_body_limit(), 31 * 1024 * 1024);
    }
}
