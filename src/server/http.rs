//! HTTP服务器设置模块
//! 负责创建和配置HTTP服务器

use crate::api::routes;
use crate::util::logging::standards::events;
use crate::AppState;
use anyhow::Result;
use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::signal::ctrl_c;
use tracing::{info, warn};

/// 已绑定端口、待启动的服务器
pub struct HttpServer {
    listener: TcpListener,
    app_routes: Router,
    local_addr: SocketAddr,
}

/// HTTP服务器管理器
pub struct ServerManager;

impl ServerManager {
    /// 创建HTTP服务器
    pub async fn create_server(port: u16, app_state: AppState) -> Result<HttpServer> {
        let listener = Self::bind_listener(port).await?;
        let local_addr = listener.local_addr()?;
        let app_routes = routes(app_state);

        Ok(HttpServer {
            listener,
            app_routes,
            local_addr,
        })
    }

    /// 绑定监听端口
    async fn bind_listener(port: u16) -> Result<TcpListener> {
        // 优先尝试IPv6通配（双栈环境下 localhost 可能解析为 ::1），失败再降级IPv4
        let v6_addr = format!("[::]:{}", port);
        match TcpListener::bind(&v6_addr).await {
            Ok(listener) => {
                info!(
                    target: "server.http",
                    event = "http.server.bound",
                    protocol = "ipv6",
                    address = %v6_addr
                );
                Ok(listener)
            }
            Err(e6) => {
                warn!("IPv6绑定失败: {}，尝试IPv4", e6);
                let v4_addr = format!("0.0.0.0:{}", port);
                let listener = TcpListener::bind(&v4_addr).await.map_err(|e4| {
                    anyhow::anyhow!(
                        "端口 {} 绑定失败 (IPv4): {}；之前IPv6错误: {}",
                        port,
                        e4,
                        e6
                    )
                })?;
                info!(
                    target: "server.http",
                    event = "http.server.bound",
                    protocol = "ipv4",
                    address = %v4_addr
                );
                Ok(listener)
            }
        }
    }

    /// 启动服务器，阻塞直到收到关闭信号
    pub async fn start_server(server: HttpServer) -> Result<()> {
        info!(
            event = events::SERVER_LISTENING,
            address = %server.local_addr,
            "Server is running on port {}",
            server.local_addr.port()
        );

        axum::serve(server.listener, server.app_routes)
            .with_graceful_shutdown(Self::shutdown_signal())
            .await?;

        info!(event = events::SERVER_SHUTDOWN, "HTTP服务器已关闭");
        Ok(())
    }

    async fn shutdown_signal() {
        tokio::select! {
            _ = ctrl_c() => {
                info!(target: "server.http", event = "http.server.signal", signal = "SIGINT");
            }
            _ = Self::wait_for_sigterm() => {
                info!(target: "server.http", event = "http.server.signal", signal = "SIGTERM");
            }
        }
    }

    /// 等待 SIGTERM 信号
    async fn wait_for_sigterm() -> std::io::Result<()> {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut term_signal = signal(SignalKind::terminate())?;
            term_signal.recv().await;
            Ok(())
        }
        #[cfg(not(unix))]
        {
            std::future::pending::<()>().await;
            Ok(())
        }
    }
}
