//! 磁盘文件名生成
//!
//! 上传与下载目录在并发请求间共享且不加锁，依靠文件名唯一避免冲突。

use chrono::Utc;
use nanoid::nanoid;

const RANDOM_ALPHABET: &[char] = &[
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'j',
    'k', 'm', 'n', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];
const RANDOM_LEN: usize = 8;

pub const OUTPUT_PREFIX: &str = "output-";
pub const OUTPUT_EXTENSION: &str = "docx";

/// `{毫秒时间戳}-{8位随机码}`
fn stamp() -> String {
    format!(
        "{}-{}",
        Utc::now().timestamp_millis(),
        nanoid!(RANDOM_LEN, RANDOM_ALPHABET)
    )
}

/// 上传临时文件名，扩展名需已小写化
pub fn upload_file_name(extension: &str) -> String {
    format!("{}.{}", stamp(), extension)
}

/// 生成文档文件名
pub fn output_file_name() -> String {
    format!("{}{}.{}", OUTPUT_PREFIX, stamp(), OUTPUT_EXTENSION)
}

/// 是否为本服务生成的文档（保留期清理只处理这些文件）
pub fn is_output_file_name(name: &str) -> bool {
    name.starts_with(OUTPUT_PREFIX)
        && name
            .rsplit_once('.')
            .is_some_and(|(_, ext)| ext == OUTPUT_EXTENSION)
}

/// 请求批次ID，仅用于日志关联
pub fn batch_id() -> String {
    nanoid!(12, RANDOM_ALPHABET)
}
