//! recon-config - 配置加载库
//!
//! 加载顺序：`default.toml` → `{APP_ENV}.toml` → `RECON_` 前缀环境变量（`__` 分隔层级）

use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;
use thiserror::Error;

use secrecy::Secret;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Load(Box::new(err))
    }
}

/// 数据库配置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// 会话级行锁等待上限（毫秒），0 表示不限制
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

fn default_max_connections() -> u32 {
    10
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_lock_timeout_ms() -> u64 {
    5_000
}

/// 遥测配置
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// 以 JSON 行输出日志
    #[serde(default)]
    pub json: bool,
    /// Prometheus 抓取端口，未配置则不开启指标导出
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json: false,
            metrics_port: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// 外部出货登记系统
#[derive(Debug, Clone, Deserialize)]
pub struct ShipmentConfig {
    pub base_url: String,
    #[serde(default = "default_confirm_path")]
    pub confirm_path: String,
    #[serde(default = "default_cancel_path")]
    pub cancel_path: String,
    #[serde(default = "default_shipment_timeout_secs")]
    pub timeout_secs: u64,
    /// SKU 主数据缺少尺码时上报的默认值
    #[serde(default = "default_size")]
    pub default_size: String,
}

impl ShipmentConfig {
    pub fn confirm_url(&self) -> String {
        join_url(&self.base_url, &self.confirm_path)
    }

    pub fn cancel_url(&self) -> String {
        join_url(&self.base_url, &self.cancel_path)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn default_confirm_path() -> String {
    "/shipments/confirm".to_string()
}

fn default_cancel_path() -> String {
    "/shipments/cancel".to_string()
}

fn default_shipment_timeout_secs() -> u64 {
    30
}

fn default_size() -> String {
    "M".to_string()
}

/// 应用配置
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app_name: String,
    #[serde(default = "default_app_env")]
    pub app_env: String,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    pub shipment: ShipmentConfig,
}

fn default_app_env() -> String {
    "development".to_string()
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| default_app_env());

        let figment = Figment::new()
            .merge(Toml::file(format!("{}/default.toml", config_dir)))
            .merge(Toml::file(format!("{}/{}.toml", config_dir, env)))
            .merge(Env::prefixed("RECON_").split("__"));

        Self::from_figment(figment)
    }

    /// 从任意 provider 组合提取并校验
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.shipment.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("shipment.base_url must not be empty".into()));
        }
        if self.shipment.timeout_secs == 0 {
            return Err(ConfigError::Invalid("shipment.timeout_secs must be positive".into()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid("database.max_connections must be positive".into()));
        }
        Ok(())
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.app_env == "production"
    }
}
