mod config;
mod ocr;

use crate::model::document::DOWNLOAD_ROUTE;
use crate::util::middleware;
use crate::AppState;
use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::middleware::from_fn;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{info, warn};

/// 按配置的源列表创建CORS层；未配置时不启用
fn create_cors_layer(allowed_origins: &[String]) -> Option<CorsLayer> {
    if allowed_origins.is_empty() {
        return None;
    }

    info!("CORS配置 - 允许的源: {}", allowed_origins.join(","));

    let origins = allowed_origins
        .iter()
        .filter_map(|s| match s.parse::<HeaderValue>() {
            Ok(origin) => Some(origin),
            Err(e) => {
                warn!("无效的CORS源: {} - {}", s, e);
                None
            }
        })
        .collect::<Vec<_>>();

    Some(
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::ACCEPT]),
    )
}

pub fn routes(app_state: AppState) -> Router {
    let server = &app_state.config.server;
    let body_limit = app_state.config.upload.request_body_limit();

    let downloads = Router::new()
        .nest_service(
            DOWNLOAD_ROUTE,
            ServeDir::new(app_state.assembler.download_dir()),
        )
        .layer(from_fn(middleware::no_cache_middleware));

    let router = Router::new()
        .route("/config", get(config::get_config))
        .route("/health", get(config::health))
        .route(
            "/process-ocr",
            post(ocr::process_ocr).layer(DefaultBodyLimit::max(body_limit)),
        )
        .merge(downloads)
        .fallback_service(ServeDir::new(&server.static_dir))
        .with_state(app_state.clone())
        .layer(from_fn(middleware::request_logging_middleware));

    match create_cors_layer(&server.cors_allowed_origins) {
        Some(cors) => router.layer(cors),
        None => router,
    }
}
