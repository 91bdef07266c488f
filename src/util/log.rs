use crate::util::config::LoggingConfig;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::{Duration, SystemTime};
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::daily;
use tracing_subscriber::fmt::layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{filter::EnvFilter, Layer, Registry};

/// 访问日志写入线程的 guard，随进程存活
static ACCESS_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// 访问日志使用的 target
pub const ACCESS_TARGET: &str = "http.server";

pub fn log_init_with_config(
    file_prefix: &str,
    config: &LoggingConfig,
) -> anyhow::Result<Option<WorkerGuard>> {
    let level_filter = parse_level(&config.level);
    let level = level_filter_to_str(level_filter);

    let stdout_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));

    if !config.file.enabled {
        if config.structured {
            let stdout_layer = layer()
                .json()
                .with_target(false)
                .with_writer(io::stdout)
                .with_filter(stdout_filter);
            Registry::default().with(stdout_layer).try_init()?;
        } else {
            let stdout_layer = layer()
                .with_target(false)
                .with_writer(io::stdout)
                .with_filter(stdout_filter);
            Registry::default().with(stdout_layer).try_init()?;
        }

        tracing::info!(event = "log.init", level, console = true, file = false, structured = config.structured);
        return Ok(None);
    }

    let log_dir = resolve_log_dir(&config.file.directory);
    std::fs::create_dir_all(&log_dir)?;

    // 访问日志单独成文件，主日志文件中关闭
    let file_filter = EnvFilter::try_new(format!("{level},{ACCESS_TARGET}=off"))
        .unwrap_or_else(|_| EnvFilter::new(level));
    let access_filter = EnvFilter::try_new(format!("{ACCESS_TARGET}={level}"))
        .unwrap_or_else(|_| EnvFilter::new(format!("{ACCESS_TARGET}=info")));

    let (main_writer, guard) = tracing_appender::non_blocking(daily(&log_dir, format!("{file_prefix}-info")));
    let (access_writer, access_guard) =
        tracing_appender::non_blocking(daily(&log_dir, format!("{file_prefix}-access")));
    let _ = ACCESS_GUARD.set(access_guard);

    if config.structured {
        let stdout_layer = layer()
            .json()
            .with_target(false)
            .with_writer(io::stdout)
            .with_filter(stdout_filter);
        let file_layer = layer()
            .json()
            .with_target(false)
            .with_ansi(false)
            .with_writer(main_writer)
            .with_filter(file_filter);
        let access_layer = layer()
            .json()
            .with_target(false)
            .with_ansi(false)
            .with_writer(access_writer)
            .with_filter(access_filter);

        Registry::default()
            .with(stdout_layer)
            .with(file_layer)
            .with(access_layer)
            .try_init()?;
    } else {
        let stdout_layer = layer()
            .with_target(false)
            .with_writer(io::stdout)
            .with_filter(stdout_filter);
        let file_layer = layer()
            .with_target(false)
            .with_ansi(false)
            .with_writer(main_writer)
            .with_filter(file_filter);
        let access_layer = layer()
            .with_target(false)
            .with_ansi(false)
            .with_writer(access_writer)
            .with_filter(access_filter);

        Registry::default()
            .with(stdout_layer)
            .with(file_layer)
            .with(access_layer)
            .try_init()?;
    }

    tracing::info!(
        event = "log.init",
        level,
        console = true,
        file = true,
        directory = %log_dir.display(),
        rotation = "daily",
        structured = config.structured,
        access_file = format!("{file_prefix}-access")
    );
    if let Some(retention) = config.file.retention_days {
        tracing::info!(event = "log.retention", days = retention);
    }

    Ok(Some(guard))
}

/// 相对路径基于当前目录；在 bin/ 下运行时基于上级目录
pub fn resolve_log_dir(directory: &str) -> PathBuf {
    let path = Path::new(directory);
    if path.is_absolute() {
        return path.to_path_buf();
    }
    crate::util::config::install_root().join(path)
}

/// 删除超过保留天数的日志文件，返回删除数量
pub fn cleanup_old_logs(log_dir: &Path, file_prefix: &str, retention_days: u32) -> io::Result<usize> {
    if !log_dir.exists() {
        tracing::debug!("日志目录不存在: {}", log_dir.display());
        return Ok(0);
    }

    let max_age = Duration::from_secs(u64::from(retention_days) * 24 * 60 * 60);
    let cutoff = SystemTime::now()
        .checked_sub(max_age)
        .unwrap_or(SystemTime::UNIX_EPOCH);

    let mut deleted = 0;
    for entry in std::fs::read_dir(log_dir)? {
        let entry = entry?;
        let path = entry.path();

        // 只处理本服务的日志文件
        let is_ours = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with(file_prefix));
        if !is_ours {
            continue;
        }

        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }

        let modified = metadata.modified().unwrap_or_else(|_| SystemTime::now());
        if modified < cutoff {
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    deleted += 1;
                    tracing::debug!("已删除过期日志: {}", path.display());
                }
                Err(e) => tracing::warn!("删除日志文件失败: {} - {}", path.display(), e),
            }
        }
    }

    if deleted > 0 {
        tracing::info!("已清理 {} 个过期日志文件", deleted);
    }
    Ok(deleted)
}

fn parse_level(level: &str) -> LevelFilter {
    match level.to_lowercase().as_str() {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "warn" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        _ => LevelFilter::INFO,
    }
}

fn level_filter_to_str(level: LevelFilter) -> &'static str {
    match level {
        LevelFilter::OFF => "off",
        LevelFilter::ERROR => "error",
        LevelFilter::WARN => "warn",
        LevelFilter::INFO => "info",
        LevelFilter::DEBUG => "debug",
        LevelFilter::TRACE => "trace",
    }
}
