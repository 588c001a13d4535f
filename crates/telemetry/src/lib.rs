//! recon-telemetry - 日志与指标初始化

use std::net::{Ipv4Addr, SocketAddr};

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use thiserror::Error;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Failed to install tracing subscriber: {0}")]
    Tracing(String),

    #[error("Failed to install Prometheus recorder: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),
}

fn env_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level))
}

/// 初始化 tracing（人类可读格式）
pub fn init_tracing(log_level: &str) -> Result<(), TelemetryError> {
    tracing_subscriber::registry()
        .with(env_filter(log_level))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| TelemetryError::Tracing(e.to_string()))
}

/// 初始化 JSON 格式的 tracing（生产环境）
pub fn init_tracing_json(log_level: &str) -> Result<(), TelemetryError> {
    tracing_subscriber::registry()
        .with(env_filter(log_level))
        .with(tracing_subscriber::fmt::layer().json())
        .try_init()
        .map_err(|e| TelemetryError::Tracing(e.to_string()))
}

/// 安装 Prometheus recorder，仅返回句柄由调用方渲染
pub fn init_metrics() -> Result<PrometheusHandle, TelemetryError> {
    Ok(PrometheusBuilder::new().install_recorder()?)
}

/// 安装 Prometheus recorder 并在 `port` 上开放抓取端点
///
/// 需在 tokio 运行时内调用
pub fn init_metrics_exporter(port: u16) -> Result<(), TelemetryError> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    Ok(())
}

/// 启动自检结果
#[derive(Debug, Clone, Default)]
pub struct HealthStatus {
    pub checks: Vec<HealthCheck>,
}

#[derive(Debug, Clone)]
pub struct HealthCheck {
    pub name: String,
    pub healthy: bool,
    pub message: Option<String>,
}

impl HealthStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_check(&mut self, name: impl Into<String>, healthy: bool, message: Option<String>) {
        self.checks.push(HealthCheck {
            name: name.into(),
            healthy,
            message,
        });
    }

    pub fn is_healthy(&self) -> bool {
        self.checks.iter().all(|c| c.healthy)
    }

    pub fn failing(&self) -> impl Iterator<Item = &HealthCheck> {
        self.checks.iter().filter(|c| !c.healthy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_status_aggregates_checks() {
        let mut status = HealthStatus::new();
        assert!(status.is_healthy());

        status.add_check("postgres", true, None);
        status.add_check("migrations", false, Some("checksum mismatch".into()));

        assert!(!status.is_healthy());
        let failing: Vec<_> = status.failing().map(|c| c.name.as_str()).collect();
        assert_eq!(failing, vec!["migrations"]);
    }
}
