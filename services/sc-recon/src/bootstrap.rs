//! 基础设施资源管理
//!
//! 连接池、迁移、遥测与服务装配

use std::sync::Arc;
use std::time::Duration;

use recon_adapter_postgres::{
    MigrationManager, MigrationResult, PostgresConfig, check_connection, create_pool,
};
use recon_common::{RetryConfig, with_retry};
use recon_config::{AppConfig, TelemetryConfig};
use recon_errors::{AppError, AppResult};
use recon_telemetry::{
    HealthStatus, TelemetryError, init_metrics_exporter, init_tracing, init_tracing_json,
};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::application::{LifecycleSettings, ReconService};
use crate::infrastructure::persistence::{PostgresUnitOfWorkFactory, schema};
use crate::infrastructure::shipment::HttpShipmentGateway;

/// 按配置初始化日志，配置了端口时同时开启 Prometheus 导出
pub fn init_observability(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    if config.json {
        init_tracing_json(&config.log_level)?;
    } else {
        init_tracing(&config.log_level)?;
    }

    if let Some(port) = config.metrics_port {
        init_metrics_exporter(port)?;
        info!(port, "Prometheus exporter listening");
    }
    Ok(())
}

/// 基础设施资源容器
pub struct Infrastructure {
    config: AppConfig,
    pool: PgPool,
}

impl Infrastructure {
    /// 从配置创建基础设施资源（带重试）
    pub async fn from_config(config: AppConfig) -> AppResult<Self> {
        let retry_config = RetryConfig::default();

        let pg_config = PostgresConfig::new(config.database.url.expose_secret())
            .with_application_name(config.app_name.clone())
            .with_max_connections(config.database.max_connections)
            .with_acquire_timeout(Duration::from_secs(config.database.connect_timeout_secs))
            .with_lock_timeout(Duration::from_millis(config.database.lock_timeout_ms));
        let pool = with_retry(&retry_config, "PostgreSQL connection", || {
            let cfg = pg_config.clone();
            async move { create_pool(&cfg).await }
        })
        .await?;
        info!(
            "PostgreSQL connection pool created (max_connections: {})",
            config.database.max_connections
        );

        Ok(Self { config, pool })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn pool(&self) -> PgPool {
        self.pool.clone()
    }

    /// 执行全部未应用的迁移，任一失败即返回错误
    pub async fn migrate(&self) -> AppResult<MigrationResult> {
        let manager = MigrationManager::new(self.pool.clone());
        let result = manager.migrate(&schema::migrations()).await?;

        for failure in &result.errors {
            warn!(
                version = failure.version,
                name = %failure.name,
                error = %failure.error,
                "Migration failed"
            );
        }
        if !result.is_success() {
            return Err(AppError::internal(format!(
                "{} migration(s) failed",
                result.errors.len()
            )));
        }

        info!(
            applied = result.applied_count(),
            skipped = result.skipped.len(),
            "Migrations complete"
        );
        Ok(result)
    }

    /// 装配对账服务
    pub fn recon_service(&self) -> AppResult<ReconService> {
        let uow_factory = Arc::new(PostgresUnitOfWorkFactory::new(self.pool.clone()));
        let gateway = Arc::new(HttpShipmentGateway::new(&self.config.shipment)?);
        let settings = LifecycleSettings::from(&self.config.shipment);

        Ok(ReconService::new(uow_factory, gateway, settings))
    }

    /// 启动自检
    pub async fn health(&self) -> HealthStatus {
        let mut status = HealthStatus::new();
        match check_connection(&self.pool).await {
            Ok(latency) => status.add_check(
                "postgres",
                true,
                Some(format!("round trip {} ms", latency.as_millis())),
            ),
            Err(e) => status.add_check("postgres", false, Some(e.to_string())),
        }
        status
    }
}
