//! 配置管理模块
//! 负责环境变量配置的加载、验证与日志初始化

use crate::util::config::{Config, ConfigLoader, ConfigValidator, ValidationReport};
use crate::util::log::{cleanup_old_logs, log_init_with_config, resolve_log_dir};
use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;

/// 日志文件名前缀
pub const LOG_FILE_PREFIX: &str = "ocr-docx-server";

/// 配置管理器
pub struct ConfigManager;

impl ConfigManager {
    /// 加载和验证配置
    ///
    /// 此时日志系统尚未初始化，失败信息直接输出到 stderr。
    pub fn load_and_validate() -> Result<(Config, ValidationReport)> {
        let config = match ConfigLoader::from_env() {
            Ok(config) => config,
            Err(err) => {
                eprintln!("❌ FATAL: 配置加载失败");
                eprintln!("错误: {err}");
                eprintln!("请设置正确的环境变量后重新启动服务。");
                return Err(err).context("配置加载失败");
            }
        };

        let report = ConfigValidator::validate_all(&config);
        if report.has_errors() {
            eprintln!("❌ FATAL: 配置验证失败");
            for error in &report.errors {
                eprintln!("  - {}: {}", error.field, error.message);
            }
        }

        Ok((config, report))
    }

    /// 输出验证结果（需在日志初始化之后调用）
    pub fn log_validation_report(report: &ValidationReport) {
        for warning in &report.warnings {
            warn!(field = %warning.field, "配置警告: {}", warning.message);
        }
        for item in &report.info {
            info!(field = %item.field, "配置提示: {}", item.message);
        }
    }

    /// 初始化日志系统
    pub fn initialize_logging(config: &Config) -> Result<Option<WorkerGuard>> {
        let log_guard = log_init_with_config(LOG_FILE_PREFIX, &config.logging)?;

        // 执行日志清理（如果配置了保留天数）
        if let Some(retention_days) = config.logging.file.retention_days {
            if config.logging.file.enabled {
                let log_path = resolve_log_dir(&config.logging.file.directory);
                match cleanup_old_logs(&log_path, LOG_FILE_PREFIX, retention_days) {
                    Ok(_) => info!("[ok] 日志清理完成，保留 {} 天", retention_days),
                    Err(e) => warn!("日志清理失败: {}", e),
                }
            }
        }

        Ok(log_guard)
    }
}
