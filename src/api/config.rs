//! 前端配置与健康检查接口

use axum::{extract::State, Json};

use crate::model::{ConfigResponse, HealthResponse};
use crate::{build_info, AppState};

/// 获取前端配置（单次可上传的文件数）
pub async fn get_config(State(state): State<AppState>) -> Json<ConfigResponse> {
    Json(ConfigResponse {
        file_limit: state.config.upload.file_limit,
    })
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: build_info::summary(),
        ocr_engine: state.invoker.engine_name().to_string(),
    })
}
