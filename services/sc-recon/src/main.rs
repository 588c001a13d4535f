//! sc-recon 启动入口
//!
//! 加载配置、初始化遥测、建立连接池并执行迁移后完成服务装配

use recon_config::AppConfig;
use sc_recon::bootstrap::{Infrastructure, init_observability};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());
    let config = AppConfig::load(&config_dir)?;
    init_observability(&config.telemetry)?;

    info!(app = %config.app_name, env = %config.app_env, "Starting");

    let infra = Infrastructure::from_config(config).await?;
    infra.migrate().await?;
    let _service = infra.recon_service()?;

    let health = infra.health().await;
    if !health.is_healthy() {
        for check in health.failing() {
            error!(check = %check.name, message = ?check.message, "Health check failed");
        }
        return Err("startup health check failed".into());
    }

    info!(
        production = infra.config().is_production(),
        "Reconciliation service ready"
    );
    Ok(())
}
