use crate::util::log::ACCESS_TARGET;
use crate::util::logging::standards::events;
use axum::{
    extract::Request,
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use uuid::Uuid;

/// 超过该耗时记录慢请求（OCR请求本身较慢，阈值放宽）
const SLOW_REQUEST_MS: u128 = 60_000;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// 本次请求的ID，由日志中间件写入请求扩展
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

fn extract_client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .or_else(|| headers.get("x-real-ip"))
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
}

fn extract_user_agent(headers: &HeaderMap) -> &str {
    headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

fn parse_content_length(headers: &HeaderMap) -> usize {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0)
}

fn is_quiet_path(path: &str) -> bool {
    const QUIET_EXACT: &[&str] = &["/health", "/config", "/favicon.ico"];
    QUIET_EXACT.contains(&path)
}

// 统一请求日志中间件
pub async fn request_logging_middleware(mut request: Request, next: Next) -> Response {
    let start_time = Instant::now();
    let request_id = Uuid::new_v4().to_string();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let headers = request.headers().clone();
    let user_agent = extract_user_agent(&headers);
    let client_ip = extract_client_ip(&headers);
    let request_size = parse_content_length(&headers);
    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    let quiet_path = is_quiet_path(uri.path());
    if !quiet_path {
        tracing::debug!(
            target: ACCESS_TARGET,
            event = events::REQUEST_START,
            request_id = %request_id,
            method = %method,
            path = %uri.path(),
            user_agent = %user_agent,
            client_ip = client_ip.as_deref().unwrap_or("unknown")
        );
    }

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    let duration = start_time.elapsed();
    let status = response.status();
    let response_size = parse_content_length(response.headers());

    if status.is_server_error() {
        tracing::error!(
            target: ACCESS_TARGET,
            event = events::REQUEST_ERROR,
            request_id = %request_id,
            method = %method,
            path = %uri.path(),
            status = status.as_u16(),
            duration_ms = duration.as_millis() as u64,
            request_bytes = request_size,
            response_bytes = response_size,
            client_ip = client_ip.as_deref().unwrap_or("unknown")
        );
    } else if status.is_client_error() && !quiet_path {
        tracing::warn!(
            target: ACCESS_TARGET,
            event = events::REQUEST_COMPLETE,
            request_id = %request_id,
            method = %method,
            path = %uri.path(),
            status = status.as_u16(),
            duration_ms = duration.as_millis() as u64,
            request_bytes = request_size,
            response_bytes = response_size,
            client_ip = client_ip.as_deref().unwrap_or("unknown")
        );
    } else if quiet_path {
        tracing::debug!(
            target: ACCESS_TARGET,
            event = events::REQUEST_COMPLETE,
            request_id = %request_id,
            method = %method,
            path = %uri.path(),
            status = status.as_u16(),
            duration_ms = duration.as_millis() as u64
        );
    } else {
        tracing::info!(
            target: ACCESS_TARGET,
            event = events::REQUEST_COMPLETE,
            request_id = %request_id,
            method = %method,
            path = %uri.path(),
            status = status.as_u16(),
            duration_ms = duration.as_millis() as u64,
            request_bytes = request_size,
            response_bytes = response_size,
            user_agent = %user_agent,
            client_ip = client_ip.as_deref().unwrap_or("unknown")
        );
    }

    if duration.as_millis() > SLOW_REQUEST_MS {
        tracing::warn!(
            target: ACCESS_TARGET,
            event = events::REQUEST_SLOW,
            request_id = %request_id,
            method = %method,
            path = %uri.path(),
            duration_ms = duration.as_millis() as u64,
            status = status.as_u16()
        );
    }

    response
}

/// 下载响应禁止缓存
pub async fn no_cache_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store, no-cache, must-revalidate"),
    );
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::EXPIRES, HeaderValue::from_static("0"));
    headers.remove(header::LAST_MODIFIED);
    headers.remove(header::ETAG);
    response
}
