//! 图片上传识别接口

use axum::extract::{Multipart, State};
use axum::{Extension, Json};
use tracing::Instrument;

use crate::model::pipeline::process_batch;
use crate::model::{ProcessError, ProcessResponse};
use crate::util::middleware::RequestId;
use crate::util::ApiError;
use crate::AppState;

/// 接收图片、识别并生成 DOCX，返回下载地址
pub async fn process_ocr(
    State(state): State<AppState>,
    request_id: Option<Extension<RequestId>>,
    mut multipart: Multipart,
) -> Result<Json<ProcessResponse>, ApiError> {
    let request_id = request_id.map(|Extension(RequestId(id))| id);
    let span = tracing::info_span!(
        "request",
        request_id = request_id.as_deref().unwrap_or("unknown")
    );

    let files = state
        .uploads
        .accept_multipart(&mut multipart)
        .instrument(span.clone())
        .await
        .map_err(ProcessError::from)?;

    let document = process_batch(&state.invoker, &state.assembler, files)
        .instrument(span)
        .await?;

    Ok(Json(ProcessResponse {
        file_url: document.url(),
    }))
}
