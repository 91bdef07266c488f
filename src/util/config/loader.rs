//! 配置加载模块
//! 从环境变量构建 [`Config`]，缺省项使用默认值

use super::types::*;
use ocr_conn::ollama::{DEFAULT_OLLAMA_HOST, DEFAULT_OLLAMA_MODEL};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

pub const ENV_PORT: &str = "PORT";
pub const ENV_FILE_LIMIT: &str = "FILE_LIMIT";
pub const ENV_MAX_FILE_SIZE_MB: &str = "MAX_FILE_SIZE_MB";
pub const ENV_UPLOAD_DIR: &str = "UPLOAD_DIR";
pub const ENV_DOWNLOAD_DIR: &str = "DOWNLOAD_DIR";
pub const ENV_DOWNLOAD_RETENTION_HOURS: &str = "DOWNLOAD_RETENTION_HOURS";
pub const ENV_DOWNLOAD_SWEEP_INTERVAL_SECS: &str = "DOWNLOAD_SWEEP_INTERVAL_SECS";
pub const ENV_STATIC_DIR: &str = "STATIC_DIR";
pub const ENV_CORS_ALLOWED_ORIGINS: &str = "CORS_ALLOWED_ORIGINS";
pub const ENV_OLLAMA_HOST: &str = "OLLAMA_HOST";
pub const ENV_OCR_MODEL: &str = "OCR_MODEL";
pub const ENV_OCR_TIMEOUT_SECS: &str = "OCR_TIMEOUT_SECS";
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "LOG_DIR";
pub const ENV_LOG_FILE: &str = "LOG_FILE";
pub const ENV_LOG_JSON: &str = "LOG_JSON";
pub const ENV_LOG_RETENTION_DAYS: &str = "LOG_RETENTION_DAYS";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),

    #[error("environment variable {key}={value:?} is invalid: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// 配置加载器
pub struct ConfigLoader;

impl ConfigLoader {
    /// 从进程环境变量加载
    pub fn from_env() -> Result<Config, ConfigError> {
        Self::from_lookup(&install_root(), |key| std::env::var(key).ok())
    }

    /// 从任意键值来源加载（测试时注入）
    pub fn from_lookup<F>(root: &Path, lookup: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };

        let file_limit = env
            .parse::<usize>(ENV_FILE_LIMIT)?
            .ok_or(ConfigError::Missing(ENV_FILE_LIMIT))?;
        if file_limit == 0 {
            return Err(ConfigError::Invalid {
                key: ENV_FILE_LIMIT,
                value: "0".to_string(),
                reason: "must be a positive integer".to_string(),
            });
        }

        let max_file_mb = env
            .parse::<u64>(ENV_MAX_FILE_SIZE_MB)?
            .unwrap_or(DEFAULT_MAX_FILE_SIZE_MB);

        let server = ServerConfig {
            port: env.parse::<u16>(ENV_PORT)?.unwrap_or(DEFAULT_PORT),
            static_dir: env
                .path(ENV_STATIC_DIR)
                .unwrap_or_else(|| root.join(DEFAULT_STATIC_DIR_NAME)),
            cors_allowed_origins: env
                .string(ENV_CORS_ALLOWED_ORIGINS)
                .map(|origins| {
                    origins
                        .split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        };

        let upload = UploadConfig {
            file_limit,
            max_file_bytes: max_file_mb.saturating_mul(1024 * 1024),
            upload_dir: env
                .path(ENV_UPLOAD_DIR)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOAD_DIR)),
        };

        let download = DownloadConfig {
            download_dir: env
                .path(ENV_DOWNLOAD_DIR)
                .unwrap_or_else(|| root.join(DEFAULT_DOWNLOAD_DIR_NAME)),
            retention_hours: env.parse::<u64>(ENV_DOWNLOAD_RETENTION_HOURS)?,
            sweep_interval_secs: env
                .parse::<u64>(ENV_DOWNLOAD_SWEEP_INTERVAL_SECS)?
                .unwrap_or(DEFAULT_SWEEP_INTERVAL_SECS),
        };

        let ocr = OcrConfig {
            ollama_host: env
                .string(ENV_OLLAMA_HOST)
                .unwrap_or_else(|| DEFAULT_OLLAMA_HOST.to_string()),
            model: env
                .string(ENV_OCR_MODEL)
                .unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string()),
            request_timeout_secs: env.parse::<u64>(ENV_OCR_TIMEOUT_SECS)?,
        };

        let defaults = LoggingConfig::default();
        let logging = LoggingConfig {
            level: env.string(ENV_LOG_LEVEL).unwrap_or(defaults.level),
            file: LogFileConfig {
                enabled: env.flag(ENV_LOG_FILE)?.unwrap_or(defaults.file.enabled),
                directory: env.string(ENV_LOG_DIR).unwrap_or(defaults.file.directory),
                retention_days: env
                    .parse::<u32>(ENV_LOG_RETENTION_DAYS)?
                    .or(defaults.file.retention_days),
            },
            structured: env.flag(ENV_LOG_JSON)?.unwrap_or(defaults.structured),
        };

        Ok(Config {
            server,
            upload,
            download,
            ocr,
            logging,
        })
    }
}

/// 安装根目录：当前目录；若在 bin/ 下运行则取上级目录
pub fn install_root() -> PathBuf {
    let current_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    if current_dir.file_name() == Some(std::ffi::OsStr::new("bin")) {
        if let Some(parent) = current_dir.parent() {
            return parent.to_path_buf();
        }
    }
    current_dir
}

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// 空字符串视为未设置
    fn string(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn path(&self, key: &str) -> Option<PathBuf> {
        self.string(key).map(PathBuf::from)
    }

    fn parse<T>(&self, key: &'static str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.string(key) {
            None => Ok(None),
            Some(value) => value
                .parse::<T>()
                .map(Some)
                .map_err(|e| ConfigError::Invalid {
                    key,
                    reason: e.to_string(),
                    value,
                }),
        }
    }

    fn flag(&self, key: &'static str) -> Result<Option<bool>, ConfigError> {
        match self.string(key) {
            None => Ok(None),
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(Some(true)),
                "0" | "false" | "no" | "off" => Ok(Some(false)),
                _ => Err(ConfigError::Invalid {
                    key,
                    value,
                    reason: "expected a boolean".to_string(),
                }),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ConfigLoader::from_lookup(Path::new("/srv/app"), |key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_file_limit_is_set() {
        let config = load(&[(ENV_FILE_LIMIT, "7")]).unwrap();

        assert_eq!(config.upload.file_limit, 7);
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.upload.max_file_bytes, 10 * 1024 * 1024);
        assert_eq!(config.upload.upload_dir, PathBuf::from("uploads"));
        assert_eq!(
            config.download.download_dir,
            PathBuf::from("/srv/app/downloads")
        );
        assert_eq!(config.server.static_dir, PathBuf::from("/srv/app/public"));
        assert_eq!(config.download.retention_hours, None);
        assert_eq!(config.ocr.model, DEFAULT_OLLAMA_MODEL);
        assert_eq!(config.ocr.request_timeout_secs, None);
        assert!(config.server.cors_allowed_origins.is_empty());
    }

    #[test]
    fn missing_file_limit_is_fatal() {
        assert_eq!(load(&[]).unwrap_err(), ConfigError::Missing(ENV_FILE_LIMIT));
        assert_eq!(
            load(&[(ENV_FILE_LIMIT, "   ")]).unwrap_err(),
            ConfigError::Missing(ENV_FILE_LIMIT)
        );
    }

    #[test]
    fn non_positive_or_non_numeric_file_limit_is_fatal() {
        for value in ["abc", "0", "-3", "2.5"] {
            let err = load(&[(ENV_FILE_LIMIT, value)]).unwrap_err();
            assert!(
                matches!(err, ConfigError::Invalid { key: ENV_FILE_LIMIT, .. }),
                "{value} should be rejected, got {err:?}"
            );
        }
    }

    #[test]
    fn overrides_are_read_from_the_environment() {
        let config = load(&[
            (ENV_FILE_LIMIT, "3"),
            (ENV_PORT, "8080"),
            (ENV_MAX_FILE_SIZE_MB, "2"),
            (ENV_UPLOAD_DIR, "/tmp/up"),
            (ENV_DOWNLOAD_DIR, "/tmp/down"),
            (ENV_DOWNLOAD_RETENTION_HOURS, "48"),
            (ENV_CORS_ALLOWED_ORIGINS, "http://a.test, ,http://b.test"),
            (ENV_OCR_TIMEOUT_SECS, "90"),
            (ENV_LOG_JSON, "true"),
            (ENV_LOG_FILE, "off"),
        ])
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.upload.max_file_bytes, 2 * 1024 * 1024);
        assert_eq!(config.upload.upload_dir, PathBuf::from("/tmp/up"));
        assert_eq!(config.download.download_dir, PathBuf::from("/tmp/down"));
        assert_eq!(config.download.retention_hours, Some(48));
        assert_eq!(
            config.server.cors_allowed_origins,
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
        assert_eq!(config.ocr.request_timeout_secs, Some(90));
        assert!(config.logging.structured);
        assert!(!config.logging.file.enabled);
    }

    #[test]
    fn malformed_optional_values_are_fatal() {
        let err = load(&[(ENV_FILE_LIMIT, "1"), (ENV_PORT, "http")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: ENV_PORT, .. }));

        let err = load(&[(ENV_FILE_LIMIT, "1"), (ENV_LOG_JSON, "maybe")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: ENV_LOG_JSON, .. }));
    }
}
