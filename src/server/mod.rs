//! 服务器模块
//!
//! - 配置管理 (config.rs)
//! - HTTP服务器设置 (http.rs)

pub mod config;
pub mod http;

pub use config::ConfigManager;
pub use http::{HttpServer, ServerManager};

use crate::build_info;
use crate::util::config::Config;
use crate::util::retention::spawn_download_sweeper;
use crate::AppState;
use anyhow::{Context, Result};
use ocr_conn::OllamaOcr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;

/// 服务器引导程序 - 统一的服务器启动入口
pub struct ServerBootstrap {
    config: Config,
    _log_guard: Option<WorkerGuard>,
}

impl ServerBootstrap {
    pub fn new() -> Result<Self> {
        let (config, validation_report) = ConfigManager::load_and_validate()?;
        if validation_report.has_errors() {
            return Err(anyhow::anyhow!(
                "配置验证失败: {} 个错误",
                validation_report.error_count()
            ));
        }

        let log_guard = ConfigManager::initialize_logging(&config)?;
        ConfigManager::log_validation_report(&validation_report);

        Ok(Self {
            config,
            _log_guard: log_guard,
        })
    }

    /// 启动服务器
    pub async fn start(self) -> Result<()> {
        info!("=== OCR DOCX 服务启动 ===");
        info!("版本信息: {}", build_info::summary());
        info!(
            port = self.config.server.port,
            file_limit = self.config.upload.file_limit,
            max_file_bytes = self.config.upload.max_file_bytes,
            upload_dir = %self.config.upload.upload_dir.display(),
            download_dir = %self.config.download.download_dir.display(),
            ollama_host = %self.config.ocr.ollama_host,
            model = %self.config.ocr.model,
            "服务配置"
        );

        for dir in [
            &self.config.upload.upload_dir,
            &self.config.download.download_dir,
        ] {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("无法创建目录: {}", dir.display()))?;
        }

        let engine = OllamaOcr::new(&self.config.ocr.ollama_host, &self.config.ocr.model)?
            .with_timeout(self.config.ocr.request_timeout_secs.map(Duration::from_secs));

        let port = self.config.server.port;
        let sweeper = spawn_download_sweeper(&self.config.download);
        let app_state = AppState::new(self.config, Arc::new(engine));

        let server = ServerManager::create_server(port, app_state).await?;
        let result = ServerManager::start_server(server).await;

        if let Some(handle) = sweeper {
            handle.abort();
        }
        result
    }
}

pub async fn start_server() -> Result<()> {
    let server = ServerBootstrap::new()?;
    server.start().await
}
