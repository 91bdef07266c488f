use std::sync::Arc;

use ocr_conn::{OcrEngine, DEFAULT_OCR_SYSTEM_PROMPT};

pub mod api;
pub mod build_info;
pub mod model;
pub mod server;
pub mod util;

use model::document::DocumentAssembler;
use model::ocr::OcrInvoker;
use model::upload::UploadAcceptor;
use util::config::Config;

/// 应用状态结构
///
/// 请求之间只共享只读配置与无状态组件，上传和下载目录的并发安全
/// 依赖于唯一文件名。
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub uploads: UploadAcceptor,
    pub invoker: OcrInvoker,
    pub assembler: DocumentAssembler,
}

impl AppState {
    pub fn new(config: Config, engine: Arc<dyn OcrEngine>) -> Self {
        Self {
            uploads: UploadAcceptor::new(&config.upload),
            invoker: OcrInvoker::new(engine, DEFAULT_OCR_SYSTEM_PROMPT),
            assembler: DocumentAssembler::new(config.download.download_dir.clone()),
            config: Arc::new(config),
        }
    }
}
