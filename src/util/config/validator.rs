//! 配置验证模块

use super::types::*;

const FILE_LIMIT_WARN_THRESHOLD: usize = 100;

/// 配置验证器
pub struct ConfigValidator;

impl ConfigValidator {
    /// 全面验证配置
    pub fn validate_all(config: &Config) -> ValidationReport {
        let mut report = ValidationReport::new();

        Self::validate_server_config(&config.server, &mut report);
        Self::validate_upload_config(&config.upload, &mut report);
        Self::validate_download_config(config, &mut report);
        Self::validate_ocr_config(&config.ocr, &mut report);

        report
    }

    fn validate_server_config(server: &ServerConfig, report: &mut ValidationReport) {
        if server.port == 0 {
            report.add_error("server.port", "端口不能为0");
        } else if server.port < 1024 {
            report.add_warning("server.port", "使用了特权端口，可能需要管理员权限");
        }

        if !server.static_dir.exists() {
            report.add_info(
                "server.static_dir",
                &format!("静态资源目录不存在: {}", server.static_dir.display()),
            );
        }
    }

    fn validate_upload_config(upload: &UploadConfig, report: &mut ValidationReport) {
        if upload.file_limit == 0 {
            report.add_error("upload.file_limit", "单次上传文件数必须大于0");
        } else if upload.file_limit > FILE_LIMIT_WARN_THRESHOLD {
            report.add_warning(
                "upload.file_limit",
                &format!(
                    "单次上传文件数 {} 过大，单个请求会同时发起同样数量的OCR调用",
                    upload.file_limit
                ),
            );
        }

        if upload.max_file_bytes == 0 {
            report.add_error("upload.max_file_bytes", "单文件大小上限必须大于0");
        }
    }

    fn validate_download_config(config: &Config, report: &mut ValidationReport) {
        let download = &config.download;

        if download.retention_hours == Some(0) {
            report.add_error(
                "download.retention_hours",
                "保留时长至少为1小时，不需要清理时请不要设置",
            );
        }

        if download.retention_hours.is_some() && download.sweep_interval_secs == 0 {
            report.add_error("download.sweep_interval_secs", "清理间隔必须大于0");
        }

        if download.download_dir == config.upload.upload_dir {
            report.add_warning(
                "download.download_dir",
                "下载目录与上传目录相同，临时文件将可被公开访问",
            );
        }
    }

    fn validate_ocr_config(ocr: &OcrConfig, report: &mut ValidationReport) {
        if !ocr.ollama_host.starts_with("http://") && !ocr.ollama_host.starts_with("https://") {
            report.add_error(
                "ocr.ollama_host",
                &format!("无效的OCR服务地址: {}", ocr.ollama_host),
            );
        }

        if ocr.model.is_empty() {
            report.add_error("ocr.model", "OCR模型名称不能为空");
        }

        if ocr.request_timeout_secs == Some(0) {
            report.add_error("ocr.request_timeout_secs", "OCR超时必须大于0");
        }
    }
}

/// 验证报告
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    pub info: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, field: &str, message: &str) {
        self.errors.push(ValidationIssue::new(field, message));
    }

    pub fn add_warning(&mut self, field: &str, message: &str) {
        self.warnings.push(ValidationIssue::new(field, message));
    }

    pub fn add_info(&mut self, field: &str, message: &str) {
        self.info.push(ValidationIssue::new(field, message));
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }
}

/// 验证问题
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
}

impl ValidationIssue {
    fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn sample() -> Config {
        Config {
            server: ServerConfig {
                port: DEFAULT_PORT,
                static_dir: PathBuf::from("public"),
                cors_allowed_origins: Vec::new(),
            },
            upload: UploadConfig {
                file_limit: 5,
                max_file_bytes: 1024,
                upload_dir: PathBuf::from("uploads"),
            },
            download: DownloadConfig {
                download_dir: PathBuf::from("downloads"),
                retention_hours: None,
                sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            },
            ocr: OcrConfig {
                ollama_host: "http://localhost:11434".to_string(),
                model: "llama3.2-vision".to_string(),
                request_timeout_secs: None,
            },
            logging: LoggingConfig::default(),
        }
    }

    #[test]
    fn sample_config_has_no_errors() {
        assert!(!ConfigValidator::validate_all(&sample()).has_errors());
    }

    #[test]
    fn zero_retention_and_bad_host_are_errors() {
        let mut config = sample();
        config.download.retention_hours = Some(0);
        config.ocr.ollama_host = "localhost:11434".to_string();

        let report = ConfigValidator::validate_all(&config);
        let fields: Vec<_> = report.errors.iter().map(|i| i.field.as_str()).collect();
        assert_eq!(report.error_count(), 2);
        assert!(fields.contains(&"download.retention_hours"));
        assert!(fields.contains(&"ocr.ollama_host"));
    }

    #[test]
    fn privileged_port_and_shared_directories_only_warn() {
        let mut config = sample();
        config.server.port = 80;
        config.download.download_dir = config.upload.upload_dir.clone();

        let report = ConfigValidator::validate_all(&config);
        assert!(!report.has_errors());
        assert_eq!(report.warnings.len(), 2);
    }
}
