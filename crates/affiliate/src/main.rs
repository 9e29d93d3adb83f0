use anyhow::{Context, Result};
use clap::Parser;
use server::app::ApplicationServer;
use std::sync::Arc;
use tracing::info;
use utils::{AppConfig, Logger};

#[tokio::main]
async fn main() -> Result<()> {
    // 根据 CARGO_ENV 加载对应的环境配置文件
    utils::EnvLoader::load_env_file().ok();

    let config = Arc::new(AppConfig::parse());
    let _guard = Logger::new(&config);

    info!(
        "🚀 affiliate backend starting ({:?}, db: {}, 佣金层级: {})",
        config.cargo_env, config.mongo_db, config.max_commission_levels
    );

    #[cfg(feature = "memory")]
    {
        if config.mongo_uri == "memory" {
            return ApplicationServer::serve_in_memory(config)
                .await
                .context("🔴 Failed to start server");
        }
    }

    ApplicationServer::serve(config)
        .await
        .context("🔴 Failed to start server")?;

    Ok(())
}
