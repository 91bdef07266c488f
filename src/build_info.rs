//! 编译期写入的版本信息

pub const BUILD_VERSION: &str = env!("APP_BUILD_VERSION");
pub const BUILD_COMMIT: &str = env!("APP_BUILD_COMMIT");
pub const BUILD_TIMESTAMP: &str = env!("APP_BUILD_TIMESTAMP");

/// 启动日志与 `/health` 使用的版本描述
pub fn summary() -> String {
    format!(
        "{} {} ({}, {})",
        env!("CARGO_PKG_NAME"),
        BUILD_VERSION,
        BUILD_COMMIT,
        BUILD_TIMESTAMP
    )
}
