use crate::{router::AppRouter, services::Services};
use anyhow::Context;
use axum::serve;
use database::Database;
use std::{net::SocketAddr, sync::Arc};
use tokio::signal;
use tracing::{error, info, warn};
use utils::AppConfig;

pub struct ApplicationServer;

impl ApplicationServer {
    /// 基于 MongoDB 启动服务
    pub async fn serve(config: Arc<AppConfig>) -> anyhow::Result<()> {
        let db = Database::new(config.clone())
            .await
            .context("🔴 Failed to connect to MongoDB")?;
        db.init_indexes().await.context("🔴 Failed to create indexes")?;

        let services = Services::new(db, config.clone()).context("🔴 Failed to build services")?;
        Self::run(config, services).await
    }

    /// 基于内存存储启动服务(数据不落盘)
    #[cfg(feature = "memory")]
    pub async fn serve_in_memory(config: Arc<AppConfig>) -> anyhow::Result<()> {
        warn!("⚠️ 使用内存存储，重启后数据丢失");
        let store = Arc::new(database::memory::MemoryDatabase::new());
        let services = Services::from_store(store, config.clone()).context("🔴 Failed to build services")?;
        Self::run(config, services).await
    }

    async fn run(config: Arc<AppConfig>, services: Services) -> anyhow::Result<()> {
        let address = format!("{}:{}", config.app_host, config.app_port);
        let tcp_listener = tokio::net::TcpListener::bind(address)
            .await
            .context("🔴 Failed to bind TCP listener")?;

        let local_addr = tcp_listener.local_addr().context("🔴 Failed to get local address")?;

        let router = AppRouter::new(services);

        info!("🟢 server:affiliate has launched on {local_addr} 🚀");

        serve(tcp_listener, router.into_make_service_with_connect_info::<SocketAddr>())
            .with_graceful_shutdown(Self::shutdown_signal())
            .await
            .context("🔴 Failed to start server")?;

        Ok(())
    }

    async fn shutdown_signal() {
        let ctrl_c = async {
            if let Err(e) = signal::ctrl_c().await {
                error!("🔴 Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                }
                Err(e) => {
                    error!("🔴 Failed to install signal handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }

        warn!("❌ Signal received, starting graceful shutdown...");
    }
}
