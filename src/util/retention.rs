//! 下载目录保留期清理
//!
//! 生成的文档默认永久保留；配置了保留时长后由后台任务定期删除过期文档。
//! 只处理本服务生成的 `output-*.docx`，目录中的其他文件不受影响。

use crate::util::config::DownloadConfig;
use crate::util::logging::standards::events;
use crate::util::naming;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// 删除修改时间早于 `cutoff` 的文档，返回删除数量
pub async fn sweep_expired(dir: &Path, cutoff: SystemTime) -> io::Result<usize> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let mut deleted = 0;
    while let Some(entry) = entries.next_entry().await? {
        let is_output = entry
            .file_name()
            .to_str()
            .is_some_and(naming::is_output_file_name);
        if !is_output {
            continue;
        }

        let Ok(metadata) = entry.metadata().await else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }

        let modified = metadata.modified().unwrap_or_else(|_| SystemTime::now());
        if modified >= cutoff {
            continue;
        }

        let path = entry.path();
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                deleted += 1;
                debug!("已删除过期文档: {}", path.display());
            }
            Err(e) => warn!(
                event = events::RETENTION_SWEEP_FAILED,
                path = %path.display(),
                error = %e
            ),
        }
    }

    Ok(deleted)
}

/// 启动后台清理任务；未配置保留时长时返回 None
pub fn spawn_download_sweeper(config: &DownloadConfig) -> Option<JoinHandle<()>> {
    let retention_hours = config.retention_hours?;
    let max_age = Duration::from_secs(retention_hours.saturating_mul(60 * 60));
    let interval = Duration::from_secs(config.sweep_interval_secs.max(1));
    let dir: PathBuf = config.download_dir.clone();

    info!(
        event = events::RETENTION_SWEEP,
        directory = %dir.display(),
        retention_hours,
        interval_secs = interval.as_secs(),
        "文档保留期清理已启用"
    );

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let cutoff = SystemTime::now()
                .checked_sub(max_age)
                .unwrap_or(SystemTime::UNIX_EPOCH);
            match sweep_expired(&dir, cutoff).await {
                Ok(0) => {}
                Ok(deleted) => info!(event = events::RETENTION_SWEEP, deleted),
                Err(e) => warn!(
                    event = events::RETENTION_SWEEP_FAILED,
                    directory = %dir.display(),
                    error = %e
                ),
            }
        }
    }))
}
