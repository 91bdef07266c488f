//! 配置管理模块
//!
//! - types: 配置数据结构定义
//! - loader: 环境变量读取与默认值
//! - validator: 配置验证

pub mod loader;
pub mod types;
pub mod validator;

pub use loader::{install_root, ConfigError, ConfigLoader};
pub use types::*;
pub use validator::{ConfigValidator, ValidationIssue, ValidationReport};
